//! Find training examples whose stored label has drifted from what the engine
//! now evaluates.

use std::{fmt, io::BufRead};

use log::warn;

use crate::{
    benchmark::BenchmarkError,
    data::{DataError, TrainingExample},
    engine::{Engine, Evaluation},
    position::{Board, Probs},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuditMode {
    /// Equity error between the stored label and the evaluation at `ply`.
    Label { ply: u8 },
    /// Equity difference between 0-ply and 1-ply evaluations.
    PlyGap,
}

#[derive(Clone, Debug)]
pub struct AuditEntry {
    pub mode: AuditMode,
    pub example: TrainingExample,
    pub board: Board,
    pub error: f32,
    /// Stored label, or the 0-ply evaluation for a ply gap.
    pub first: Probs,
    /// Evaluation at the audited ply, or the 1-ply evaluation.
    pub second: Probs,
}

impl fmt::Display for AuditEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# err {:.5}, pos = {{{}}}", self.error, self.board)?;

        match self.mode {
            AuditMode::Label { ply } => {
                writeln!(f, "# probs = {}", self.first.formatted(5, 1.0))?;
                writeln!(f, "# ply{ply}  = {}", self.second.formatted(5, 1.0))?;
            }
            AuditMode::PlyGap => {
                writeln!(f, "# probs(0) = {}", self.first.formatted(5, 1.0))?;
                writeln!(f, "# probs(1) = {}", self.second.formatted(5, 1.0))?;
            }
        }

        write!(f, "{}", self.example.to_line())
    }
}

/// Entries of a data file whose error under `mode` is at least `threshold`.
/// Malformed lines and keys the engine cannot decode are reported and skipped.
pub fn audit<E: Engine, R: BufRead>(
    engine: &E,
    net: &E::Net,
    reader: R,
    mode: AuditMode,
    threshold: f32,
) -> Result<Vec<AuditEntry>, BenchmarkError> {
    let mut entries = Vec::new();

    for (n, line) in reader.lines().enumerate() {
        let line = line.map_err(DataError::from)?;

        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }

        let example = match TrainingExample::parse(&line) {
            Ok(example) => example,
            Err(e) => {
                warn!("line {}: {e}: {line}", n + 1);
                continue;
            }
        };

        let board = match engine.board_from_key(&example.key) {
            Ok(board) => board,
            Err(e) => {
                warn!("line {}: {e}, skipped", n + 1);
                continue;
            }
        };

        let (error, first, second) = match mode {
            AuditMode::Label { ply } => {
                let p = engine.probs(net, &board, Evaluation::Ply(ply))?;
                (p.eq_error(&example.probs), example.probs, p)
            }
            AuditMode::PlyGap => {
                let p0 = engine.probs(net, &board, Evaluation::Ply(0))?;
                let p1 = engine.probs(net, &board, Evaluation::Ply(1))?;
                ((p0.equity() - p1.equity()).abs(), p0, p1)
            }
        };

        if error >= threshold {
            entries.push(AuditEntry { mode, example, board, error, first, second });
        }
    }

    Ok(entries)
}
