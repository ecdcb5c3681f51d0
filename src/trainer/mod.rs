//! Error-driven training loop.

pub mod checkpoint;
pub mod console;
pub mod schedule;

pub use checkpoint::ParetoCheckpoint;
pub use console::{Command, CommandSource, NoCommands, StdinCommands};
pub use schedule::AlphaSchedule;

use std::{
    error::Error,
    fmt,
    path::Path,
    time::{Duration, Instant},
};

use log::{info, warn};

use crate::{
    data::TrainingExample,
    engine::{DataTrainer, Engine, EngineError},
    logger::{ansi, report_bottom, report_check, report_pass, report_saved},
    util::{random_permutation, rng_from},
};

#[derive(Clone, Debug)]
pub struct TrainerSettings {
    pub alpha_start: f32,
    pub alpha_low: f32,
    /// Relative improvement below which a check counts as stalled.
    pub improve_factor: f32,
    /// Smallest alpha decrement.
    pub min_dec: f32,
    /// Number of bottom hits that ends training.
    pub max_bottom: usize,
    /// Bottom hits required before the time budget may end training.
    pub min_bottom: usize,
    pub cycle_time: Duration,
    /// Measure errors without the backgammon outputs.
    pub ignore_bg: bool,
    /// Never regenerate the visitation order.
    pub keep_order: bool,
    pub seed: Option<u64>,
}

impl Default for TrainerSettings {
    fn default() -> Self {
        Self {
            alpha_start: 20.0,
            alpha_low: 0.1,
            improve_factor: 0.995,
            min_dec: 0.5,
            max_bottom: 20,
            min_bottom: 3,
            cycle_time: Duration::from_secs(30 * 60),
            ignore_bg: false,
            keep_order: false,
            seed: None,
        }
    }
}

impl TrainerSettings {
    pub fn display(&self) {
        println!("Alpha                  : {}", ansi(format!("{} -> {}", self.alpha_start, self.alpha_low), 31));
        println!("Improve Factor         : {}", ansi(self.improve_factor, 31));
        println!("Bottom Hits            : {}", ansi(format!("{}..{}", self.min_bottom, self.max_bottom), 31));
        println!("Cycle Time             : {}", ansi(format!("{}s", self.cycle_time.as_secs()), 31));
        println!("Ignore Backgammons     : {}", ansi(self.ignore_bg, 31));
    }
}

#[derive(Debug)]
pub enum TrainerError {
    Engine(EngineError),
    NoData,
}

impl From<EngineError> for TrainerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

impl fmt::Display for TrainerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Engine(e) => write!(f, "engine: {e}"),
            Self::NoData => write!(f, "no training examples"),
        }
    }
}

impl Error for TrainerError {}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TrainingReport {
    pub checks: usize,
    pub passes: usize,
    pub bottoms: usize,
    pub saves: usize,
    pub stopped: bool,
    /// Errors of the network left in the checkpoint file and returned in
    /// `net`.
    pub saved: Option<(f32, f32)>,
    /// Lowest mean error on the save frontier, with its max error.
    pub lowest_mean: Option<(f32, f32)>,
}

/// Train `net` over `examples` until enough bottom hits, or until the time
/// budget runs out once alpha is back at its start value.
///
/// Every error pair not dominated by an earlier one is saved to
/// `checkpoint`; on return `net` holds the last saved network.
pub fn train<E: Engine, C: CommandSource>(
    engine: &E,
    net: &mut E::Net,
    examples: &[TrainingExample],
    checkpoint: &Path,
    settings: &TrainerSettings,
    commands: &mut C,
) -> Result<TrainingReport, TrainerError> {
    if examples.is_empty() {
        return Err(TrainerError::NoData);
    }

    let mut trainer = engine.trainer(examples, settings.ignore_bg)?;
    let n = trainer.len();

    let mut rng = rng_from(settings.seed);
    let mut order = random_permutation(n, &mut rng);
    let mut schedule = AlphaSchedule::new(settings);
    let mut best = ParetoCheckpoint::new(checkpoint);
    let mut report = TrainingReport::default();

    let started = Instant::now();

    while schedule.bottoms() < settings.max_bottom {
        if let Some(line) = commands.next_line() {
            match line.parse::<Command>() {
                Ok(Command::Alpha(alpha)) => schedule.set_alpha(alpha),
                Ok(Command::Low(low)) => schedule.set_low(low),
                Ok(Command::Order) => order = random_permutation(n, &mut rng),
                Ok(Command::Stop) => {
                    info!("training stopped by operator");
                    report.stopped = true;
                    break;
                }
                Err(e) => warn!("failed to eval '{line}': {e}"),
            }
        }

        let timer = Instant::now();
        let (mean, max) = trainer.errors(net)?.select(settings.ignore_bg);
        report_check(report.checks, mean, max, timer.elapsed().as_secs_f64(), n);
        report.checks += 1;

        if best.accepts(mean, max) {
            engine.save_net(net, best.path())?;
            report_saved(best.path().display(), mean, max);
        }

        if schedule.at_start() && schedule.bottoms() >= settings.min_bottom && started.elapsed() >= settings.cycle_time {
            break;
        }

        if schedule.after_check(mean, max) && !settings.keep_order {
            info!("** new order");
            order = random_permutation(n, &mut rng);
        }

        let timer = Instant::now();
        let alpha = schedule.alpha();
        trainer.train(net, alpha, &order)?;
        report.passes += 1;
        report_pass(report.passes, alpha, n, timer.elapsed().as_secs_f64());

        if schedule.after_pass() {
            report_bottom(schedule.bottoms(), started.elapsed().as_secs_f64());
        }
    }

    report.bottoms = schedule.bottoms();
    report.saves = best.saves();
    report.saved = best.saved();
    report.lowest_mean = best.lowest_mean();

    if best.saves() > 0 {
        *net = engine.load_net(checkpoint)?;
    }

    Ok(report)
}
