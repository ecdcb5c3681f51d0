use std::path::{Path, PathBuf};

/// Keeps a network file for every (mean, max) error pair that no earlier
/// pair dominates. Saves overwrite a single file.
#[derive(Clone, Debug)]
pub struct ParetoCheckpoint {
    path: PathBuf,
    frontier: Vec<(f32, f32)>,
    saved: Option<(f32, f32)>,
    saves: usize,
}

fn dominates(a: (f32, f32), b: (f32, f32)) -> bool {
    a.0 <= b.0 && a.1 <= b.1 && (a.0 < b.0 || a.1 < b.1)
}

impl ParetoCheckpoint {
    pub fn new(path: &Path) -> Self {
        Self { path: path.to_path_buf(), frontier: Vec::new(), saved: None, saves: 0 }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn saves(&self) -> usize {
        self.saves
    }

    /// Errors of the network currently in the checkpoint file.
    pub fn saved(&self) -> Option<(f32, f32)> {
        self.saved
    }

    /// Lowest mean error on the frontier, with its max error.
    pub fn lowest_mean(&self) -> Option<(f32, f32)> {
        self.frontier.iter().copied().min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)))
    }

    /// Whether a network with errors `(mean, max)` should be saved.
    pub fn accepts(&mut self, mean: f32, max: f32) -> bool {
        let pair = (mean, max);

        if self.frontier.iter().any(|&p| dominates(p, pair)) {
            return false;
        }

        self.frontier.retain(|&p| !dominates(pair, p));
        self.frontier.push(pair);
        self.saved = Some(pair);
        self.saves += 1;
        true
    }
}
