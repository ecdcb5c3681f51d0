//! Breakdown of a network's benchmark errors: move errors at several plies,
//! split by position category, and cube errors at every score of the battery.

use std::{collections::HashMap, io::BufRead, str::FromStr};

use log::{debug, warn};

use super::{for_each_record, move_loss, BenchmarkError, BenchmarkRecord};
use crate::{
    cube::{action_error, proportional_error, score_battery},
    data::DataError,
    engine::{Engine, Evaluation, PositionClass, PositionKey, Score},
    logger::ansi,
    position::Board,
};

/// Built-in position categories for splitting move errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Category {
    /// A side holds a point deep in the opponent's home board.
    Holding,
    /// A side on the bar faces a closed board.
    Closed,
    /// Eight or more checkers of one side still on its back half.
    BackContact,
    /// Classified as a back game or containment position.
    BackContain,
    /// More than four opponent checkers out against a crashed side.
    Forward,
}

impl Category {
    pub fn name(self) -> &'static str {
        match self {
            Self::Holding => "holding",
            Self::Closed => "closed",
            Self::BackContact => "backc",
            Self::BackContain => "backco",
            Self::Forward => "forw",
        }
    }

    pub fn contains<E: Engine>(self, engine: &E, board: &Board) -> bool {
        match self {
            Self::Holding => holding(board),
            Self::Closed => closed(board),
            Self::BackContact => back_contact(board),
            Self::BackContain => engine.classify(board) == PositionClass::BackContain,
            Self::Forward => forward(board),
        }
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "holding" => Ok(Self::Holding),
            "closed" => Ok(Self::Closed),
            "backc" => Ok(Self::BackContact),
            "backco" => Ok(Self::BackContain),
            "forw" => Ok(Self::Forward),
            _ => Err(format!("unknown category '{s}'")),
        }
    }
}

fn holding(board: &Board) -> bool {
    let p = &board.0;
    p[3..=7].iter().any(|&c| c > 1) || p[18..=22].iter().any(|&c| c < -1)
}

fn closed(board: &Board) -> bool {
    let p = &board.0;

    if p[0] > 0 && p[1..=6].iter().all(|&c| c < -1) {
        return true;
    }

    p[25] < 0 && p[19..25].iter().all(|&c| c > 1)
}

fn back_contact(board: &Board) -> bool {
    let p = &board.0;
    let back: i32 = p[..13].iter().filter(|&&c| c > 0).sum();
    let opp_back: i32 = p[13..].iter().filter(|&&c| c < 0).sum();
    back >= 8 || -opp_back >= 8
}

/// Side on roll has at most six checkers off its two deepest points.
fn crashed(board: &Board) -> bool {
    const N: i32 = 6;

    let p = &board.0;
    let total: i32 = p.iter().filter(|&&c| c > 0).sum();

    if total <= N {
        return true;
    }

    let ace = p[24].max(0);
    let deuce = p[23].max(0);

    if ace > 1 {
        total - ace <= N || (deuce > 1 && 1 + total - (ace + deuce) <= N)
    } else {
        total - (deuce - 1) <= N
    }
}

fn forward(board: &Board) -> bool {
    let b = if crashed(board) { *board } else { board.swap_sides() };
    let out: i32 = b.0[13..].iter().filter(|&&c| c < 0).sum();
    -out > 4
}

/// How move records are assigned to categories.
#[derive(Clone, Debug)]
pub enum Categorizer {
    /// `<name>` or `non<name>` for a built-in category.
    Builtin(Category),
    /// Category per position key, read from `<key> <category>` lines.
    Table(HashMap<PositionKey, String>),
}

impl Categorizer {
    pub fn load<R: BufRead>(reader: R) -> Result<Self, DataError> {
        let mut table = HashMap::new();

        for (n, line) in reader.lines().enumerate() {
            let line = line?;

            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }

            match line.split_whitespace().collect::<Vec<_>>()[..] {
                [key, category] => {
                    table.insert(PositionKey::from(key), category.to_string());
                }
                _ => {
                    return Err(DataError::Parse { line: n + 1, message: format!("expected '<key> <category>': {line}") })
                }
            }
        }

        Ok(Self::Table(table))
    }

    fn category<E: Engine>(&self, engine: &E, key: &PositionKey, board: &Board) -> Option<String> {
        match self {
            Self::Builtin(c) if c.contains(engine, board) => Some(c.name().to_string()),
            Self::Builtin(c) => Some(format!("non{}", c.name())),
            Self::Table(table) => table.get(key).cloned(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ReportSettings {
    /// Plies at which move choices are judged.
    pub plies: Vec<u8>,
    pub moves: bool,
    pub cubes: bool,
    /// Evaluation the cube decisions are made from.
    pub cube_evaluation: Evaluation,
    /// Split move errors of the first ply by category.
    pub categories: Option<Categorizer>,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self { plies: vec![0], moves: true, cubes: true, cube_evaluation: Evaluation::Ply(0), categories: None }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PlyErrors {
    pub ply: u8,
    /// Move choices losing equity.
    pub wrong: usize,
    /// Move choices missing from the record, charged the worst listed loss.
    pub unlisted: usize,
    pub total: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoreErrors {
    pub score: Score,
    pub wrong: usize,
    /// Sum of proportional errors at this score.
    pub total: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CategoryErrors {
    pub name: String,
    pub moves: usize,
    pub total: f64,
}

/// Cube errors over the whole score battery.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CubeBatteryReport {
    pub records: usize,
    /// Records wrong at one score or more.
    pub records_wrong: usize,
    /// Mean proportional error per record and score.
    pub proportional: f32,
    /// Mean equity error per record and score.
    pub equity: f32,
    pub per_score: Vec<ScoreErrors>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BenchmarkReport {
    pub moves: usize,
    pub plies: Vec<PlyErrors>,
    /// In order of first appearance.
    pub categories: Vec<CategoryErrors>,
    pub cube: CubeBatteryReport,
}

impl BenchmarkReport {
    fn add_to_category(&mut self, name: String, loss: f32) {
        let i = match self.categories.iter().position(|c| c.name == name) {
            Some(i) => i,
            None => {
                self.categories.push(CategoryErrors { name, ..Default::default() });
                self.categories.len() - 1
            }
        };

        self.categories[i].moves += 1;
        self.categories[i].total += f64::from(loss);
    }

    pub fn display(&self, per_score: bool) {
        if self.moves > 0 {
            let n = self.moves as f64;

            for p in &self.plies {
                println!(
                    "{}p errors {} of {} | avg {} | unlisted {} ({})",
                    p.ply,
                    ansi(p.wrong, 31),
                    self.moves,
                    ansi(format!("{:.6}", p.total / n), 36),
                    p.unlisted,
                    ansi(format!("{:.2}%", 100.0 * p.unlisted as f64 / n), 36),
                );
            }

            for c in &self.categories {
                println!(
                    "{:>10} ({} {:.2}%) {}",
                    c.name,
                    c.moves,
                    100.0 * c.moves as f64 / n,
                    ansi(format!("{:.6}", c.total / c.moves as f64), 36),
                );
            }
        }

        let cube = &self.cube;

        if cube.records > 0 {
            println!(
                "cube errors {} of {} | me {} | eq {}",
                ansi(cube.records_wrong, 31),
                cube.records,
                ansi(format!("{:.6}", cube.proportional), 36),
                ansi(format!("{:.6}", cube.equity), 36),
            );

            if per_score {
                let n = cube.records as f64;

                for s in &cube.per_score {
                    println!(
                        "score {:>5} : {} ({:.1}%) errors, average {:.6}",
                        s.score,
                        s.wrong,
                        100.0 * s.wrong as f64 / n,
                        s.total / n,
                    );
                }
            }
        }
    }
}

fn decode<E: Engine>(engine: &E, key: &PositionKey, line: usize) -> Option<Board> {
    match engine.board_from_key(key) {
        Ok(board) => Some(board),
        Err(e) => {
            warn!("benchmark line {line}: {e}, skipped");
            None
        }
    }
}

/// Judge every move record at each ply of `settings`, and every cube record
/// at each score of the battery.
pub fn benchmark_report<E: Engine, R: BufRead>(
    engine: &E,
    net: &E::Net,
    reader: R,
    settings: &ReportSettings,
) -> Result<BenchmarkReport, BenchmarkError> {
    let scores = score_battery();

    let mut report = BenchmarkReport {
        plies: settings.plies.iter().map(|&ply| PlyErrors { ply, ..Default::default() }).collect(),
        cube: CubeBatteryReport {
            per_score: scores.iter().map(|&score| ScoreErrors { score, wrong: 0, total: 0.0 }).collect(),
            ..Default::default()
        },
        ..Default::default()
    };

    let mut proportional = 0.0f64;
    let mut equity = 0.0f64;

    for_each_record(reader, |n, record| {
        match record {
            BenchmarkRecord::Cube { key, probs } if settings.cubes => {
                let Some(board) = decode(engine, &key, n) else {
                    return Ok(());
                };

                report.cube.records += 1;

                let eval_probs = engine.probs(net, &board, settings.cube_evaluation)?;
                let mut wrong = false;

                for (i, &score) in scores.iter().enumerate() {
                    let di = engine.cube_decision(net, &board, score, Some(&eval_probs))?;
                    let rdi = engine.cube_decision(net, &board, score, Some(&probs))?;

                    if di.action == rdi.action {
                        continue;
                    }

                    wrong = true;

                    let err = proportional_error(engine, net, &board, score, &eval_probs, &probs, &rdi.action)?;
                    let eq_err = action_error(&rdi, &di.action);

                    debug!("{key} ({score}) {} vs {}: err {err:.5} eq {eq_err:.5}", di.action, rdi.action);

                    proportional += f64::from(err);
                    equity += f64::from(eq_err);
                    report.cube.per_score[i].wrong += 1;
                    report.cube.per_score[i].total += f64::from(err);
                }

                report.cube.records_wrong += usize::from(wrong);
            }
            BenchmarkRecord::Move { key, dice, moves } if settings.moves => {
                let Some(board) = decode(engine, &key, n) else {
                    return Ok(());
                };

                let mut losses = Vec::with_capacity(settings.plies.len());

                for &ply in &settings.plies {
                    let chosen = engine.best_move(net, &board, dice, ply, Score::Money)?;
                    let listed = moves.iter().any(|(k, _)| *k == chosen);
                    losses.push((move_loss(&moves, &chosen), listed));
                }

                if let Some((loss, _)) = losses.iter().find(|(loss, _)| *loss < 0.0) {
                    warn!("benchmark line {n}: negative loss {loss}, skipped");
                    return Ok(());
                }

                report.moves += 1;

                for (errors, &(loss, listed)) in report.plies.iter_mut().zip(&losses) {
                    errors.total += f64::from(loss);
                    errors.wrong += usize::from(loss != 0.0);
                    errors.unlisted += usize::from(!listed);
                }

                if let (Some(categorizer), Some(&(loss, _))) = (&settings.categories, losses.first()) {
                    match categorizer.category(engine, &key, &board) {
                        Some(name) => report.add_to_category(name, loss),
                        None => warn!("benchmark line {n}: no category for {key}"),
                    }
                }
            }
            _ => {}
        }

        Ok(())
    })?;

    if report.cube.records > 0 {
        let total = (report.cube.records * scores.len()) as f64;
        report.cube.proportional = (proportional / total) as f32;
        report.cube.equity = (equity / total) as f32;
    }

    Ok(report)
}

/// Cube part of [`benchmark_report`], with positions evaluated by `evaluation`.
pub fn cube_battery_report<E: Engine, R: BufRead>(
    engine: &E,
    net: &E::Net,
    reader: R,
    evaluation: Evaluation,
) -> Result<CubeBatteryReport, BenchmarkError> {
    let settings = ReportSettings { moves: false, cube_evaluation: evaluation, ..Default::default() };
    Ok(benchmark_report(engine, net, reader, &settings)?.cube)
}
