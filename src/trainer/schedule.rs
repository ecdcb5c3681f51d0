use super::TrainerSettings;

/// Learning rate policy of the training loop.
///
/// Alpha decays whenever a check shows no relative improvement in either the
/// mean or the max error, and restarts at the start value once it reaches the
/// floor. Each restart is a "bottom hit".
#[derive(Clone, Debug)]
pub struct AlphaSchedule {
    alpha: f32,
    start: f32,
    low: f32,
    min_dec: f32,
    improve_factor: f32,
    bottoms: usize,
    prev: (f32, f32),
}

impl AlphaSchedule {
    pub fn new(settings: &TrainerSettings) -> Self {
        Self {
            alpha: settings.alpha_start,
            start: settings.alpha_start,
            low: settings.alpha_low,
            min_dec: settings.min_dec,
            improve_factor: settings.improve_factor,
            bottoms: 0,
            prev: (100.0, 100.0),
        }
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn bottoms(&self) -> usize {
        self.bottoms
    }

    /// Still on the undecayed start value.
    pub fn at_start(&self) -> bool {
        self.alpha == self.start
    }

    pub fn set_alpha(&mut self, alpha: f32) {
        self.alpha = alpha;
    }

    pub fn set_low(&mut self, low: f32) {
        self.low = low;
    }

    fn improved(&self, mean: f32, max: f32) -> bool {
        mean < self.improve_factor * self.prev.0 || max < self.improve_factor * self.prev.1
    }

    /// Record the errors of a check, decaying alpha when they stalled.
    /// Returns true when the mean error went up, so the visitation order
    /// should be regenerated.
    pub fn after_check(&mut self, mean: f32, max: f32) -> bool {
        if !self.improved(mean, max) {
            let dec = (self.alpha * 0.1).max(self.min_dec);
            self.alpha = (self.alpha - dec).max(self.low);
        }

        let worse = mean > self.prev.0;
        self.prev = (mean, max);
        worse
    }

    /// Restart from the start value after a pass at the floor. Returns true
    /// on a bottom hit.
    pub fn after_pass(&mut self) -> bool {
        if self.alpha > self.low {
            return false;
        }

        self.alpha = self.start;
        self.bottoms += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule() -> AlphaSchedule {
        AlphaSchedule::new(&TrainerSettings::default())
    }

    #[test]
    fn improvement_keeps_alpha() {
        let mut s = schedule();
        assert!(!s.after_check(0.05, 0.5));
        assert_eq!(s.alpha(), 20.0);

        // max improves enough on its own
        assert!(s.after_check(0.0501, 0.49));
        assert_eq!(s.alpha(), 20.0);
    }

    #[test]
    fn stall_decays_by_tenth_or_minimum() {
        let mut s = schedule();
        s.after_check(0.05, 0.5);

        s.after_check(0.0499, 0.499);
        assert_eq!(s.alpha(), 18.0);

        s.set_alpha(3.0);
        s.after_check(0.0499, 0.499);
        assert_eq!(s.alpha(), 2.5);
    }

    #[test]
    fn floor_counts_as_bottom() {
        let mut s = schedule();
        s.after_check(0.05, 0.5);

        s.set_alpha(0.3);
        s.after_check(0.05, 0.5);
        assert_eq!(s.alpha(), 0.1);
        assert!(!s.at_start());

        assert!(s.after_pass());
        assert_eq!(s.bottoms(), 1);
        assert!(s.at_start());
        assert!(!s.after_pass());
    }

    #[test]
    fn worse_mean_asks_for_new_order() {
        let mut s = schedule();
        s.after_check(0.05, 0.5);
        assert!(s.after_check(0.06, 0.4));
        assert!(!s.after_check(0.06, 0.4));
    }
}
