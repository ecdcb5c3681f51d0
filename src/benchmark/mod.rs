//! Benchmark files and the error of a network against them.
//!
//! Record kinds, by leading character:
//! - `o <key> <p0..p4>`: cube decision with rollout probabilities
//! - `m <key> <d0> <d1> <move> <loss> ...`: checker play, best move first with
//!   its equity, then each alternative with its loss
//! - `r <seed>`, `s <version text>`
//! - `#` comments, including `#R` combine records and `#E` evaluation records

pub mod combine;
pub mod report;

pub use combine::{combine, read_updates, CombineReport, MoveUpdate};
pub use report::{
    benchmark_report, cube_battery_report, BenchmarkReport, Categorizer, Category, CategoryErrors, CubeBatteryReport,
    PlyErrors, ReportSettings, ScoreErrors,
};

use std::io::BufRead;

use log::warn;

use crate::{
    cube::action_error,
    data::DataError,
    engine::{Dice, Engine, EngineError, PositionKey, Score},
    position::Probs,
};

#[derive(Clone, Debug, PartialEq)]
pub enum BenchmarkRecord {
    Cube { key: PositionKey, probs: Probs },
    Move { key: PositionKey, dice: Dice, moves: Vec<(PositionKey, f32)> },
    Seed(String),
    Version(String),
    Combine(Vec<String>),
    CachedEval { ply: u8, key: PositionKey, probs: Probs },
    Comment,
}

/// Reasons a benchmark line is not usable.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordError {
    /// Known record kind with bad fields. The record is skipped.
    Malformed(String),
    /// Not a benchmark line at all.
    UnknownKind(char),
}

fn parse_die(s: &str) -> Result<u8, RecordError> {
    match s.parse::<u8>() {
        Ok(d) if (1..=6).contains(&d) => Ok(d),
        _ => Err(RecordError::Malformed(format!("bad die '{s}'"))),
    }
}

impl BenchmarkRecord {
    /// `None` for blank lines.
    pub fn parse(line: &str) -> Result<Option<Self>, RecordError> {
        let Some(kind) = line.chars().next() else {
            return Ok(None);
        };

        if line.trim().is_empty() {
            return Ok(None);
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        let malformed = |what: &str| RecordError::Malformed(format!("{what}: '{}'", line.trim_end()));

        let record = match kind {
            'o' => {
                if fields.len() < 7 {
                    return Err(malformed("short cube record"));
                }
                let probs = Probs::from_fields(&fields[2..7]).map_err(|e| malformed(&e))?;
                Self::Cube { key: fields[1].into(), probs }
            }
            'm' => {
                if fields.len() < 6 || fields.len() % 2 != 0 {
                    return Err(malformed("bad move record"));
                }

                let dice = Dice(parse_die(fields[2])?, parse_die(fields[3])?);

                let moves = fields[4..]
                    .chunks(2)
                    .map(|pair| {
                        let loss = pair[1].parse::<f32>().map_err(|_| malformed("bad loss"))?;
                        Ok((PositionKey::from(pair[0]), loss))
                    })
                    .collect::<Result<Vec<_>, RecordError>>()?;

                Self::Move { key: fields[1].into(), dice, moves }
            }
            'r' => Self::Seed(line[1..].trim().to_string()),
            's' => Self::Version(line[1..].trim().to_string()),
            '#' => {
                if let Some(rest) = line.strip_prefix("#R") {
                    Self::Combine(rest.split_whitespace().map(str::to_string).collect())
                } else if line.starts_with("#E") && fields.len() == 8 {
                    let ply = fields[1].parse::<u8>().map_err(|_| malformed("bad ply"))?;
                    let probs = Probs::from_fields(&fields[3..8]).map_err(|e| malformed(&e))?;
                    Self::CachedEval { ply, key: fields[2].into(), probs }
                } else {
                    Self::Comment
                }
            }
            other => return Err(RecordError::UnknownKind(other)),
        };

        Ok(Some(record))
    }

    /// Engine version announced by an `s` record.
    pub fn version(&self) -> Option<&str> {
        match self {
            Self::Version(text) => {
                let (_, rest) = text.split_once("version ")?;
                rest.split_whitespace().next()
            }
            _ => None,
        }
    }
}

/// Iterates the usable records of a benchmark, logging and skipping malformed
/// lines and lines that are not records at all.
pub fn for_each_record<R, F>(reader: R, f: F) -> Result<(), BenchmarkError>
where
    R: BufRead,
    F: FnMut(usize, BenchmarkRecord) -> Result<(), BenchmarkError>,
{
    read_records(reader, false, f)
}

/// As [`for_each_record`], but a line of unknown kind is an error.
pub fn for_each_record_strict<R, F>(reader: R, f: F) -> Result<(), BenchmarkError>
where
    R: BufRead,
    F: FnMut(usize, BenchmarkRecord) -> Result<(), BenchmarkError>,
{
    read_records(reader, true, f)
}

fn read_records<R, F>(reader: R, strict: bool, mut f: F) -> Result<(), BenchmarkError>
where
    R: BufRead,
    F: FnMut(usize, BenchmarkRecord) -> Result<(), BenchmarkError>,
{
    for (n, line) in reader.lines().enumerate() {
        let line = line.map_err(DataError::from)?;

        match BenchmarkRecord::parse(&line) {
            Ok(Some(record)) => f(n + 1, record)?,
            Ok(None) => {}
            Err(RecordError::Malformed(message)) => warn!("benchmark line {}: {message}, skipped", n + 1),
            Err(RecordError::UnknownKind(kind)) if strict => {
                return Err(DataError::Parse { line: n + 1, message: format!("unknown record kind '{kind}'") }.into())
            }
            Err(RecordError::UnknownKind(kind)) => {
                warn!("benchmark line {}: unknown record kind '{kind}', skipped", n + 1)
            }
        }
    }

    Ok(())
}

#[derive(Debug)]
pub enum BenchmarkError {
    Data(DataError),
    Engine(EngineError),
}

impl From<DataError> for BenchmarkError {
    fn from(value: DataError) -> Self {
        Self::Data(value)
    }
}

impl From<std::io::Error> for BenchmarkError {
    fn from(value: std::io::Error) -> Self {
        Self::Data(DataError::Io(value))
    }
}

impl From<EngineError> for BenchmarkError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

impl std::fmt::Display for BenchmarkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Data(e) => write!(f, "benchmark file: {e}"),
            Self::Engine(e) => write!(f, "engine: {e}"),
        }
    }
}

impl std::error::Error for BenchmarkError {}

/// Average errors of a network over a benchmark.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BenchmarkErrors {
    /// Mean equity lost per move decision.
    pub moves: f32,
    /// Mean equity lost per cube decision to wrong doubling.
    pub double: f32,
    /// Mean equity lost per cube decision to wrong taking.
    pub take: f32,
    pub move_records: usize,
    pub cube_records: usize,
}

impl BenchmarkErrors {
    pub fn as_line(&self) -> String {
        format!("{} {} {}", self.moves, self.double, self.take)
    }

    pub fn parse_line(line: &str) -> Option<Self> {
        let v: Vec<f32> = line.split_whitespace().map(str::parse).collect::<Result<_, _>>().ok()?;
        match v[..] {
            [moves, double, take] => Some(Self { moves, double, take, ..Default::default() }),
            _ => None,
        }
    }
}

/// Loss of playing `chosen` in a move record: zero for the recorded best,
/// the recorded loss of a listed alternative, otherwise the last (worst)
/// recorded loss.
pub fn move_loss(moves: &[(PositionKey, f32)], chosen: &PositionKey) -> f32 {
    match moves.iter().position(|(key, _)| key == chosen) {
        Some(0) => 0.0,
        Some(i) => moves[i].1,
        None => moves.last().map_or(0.0, |m| m.1),
    }
}

/// Error of `net` over a benchmark. Cube decisions are judged at the money
/// equivalent score, checker play at 0-ply.
pub fn benchmark_error<E: Engine, R: BufRead>(
    engine: &E,
    net: &E::Net,
    reader: R,
) -> Result<BenchmarkErrors, BenchmarkError> {
    let mut move_err = 0.0f64;
    let mut double_err = 0.0f64;
    let mut take_err = 0.0f64;
    let mut n_moves = 0usize;
    let mut n_cubes = 0usize;

    for_each_record(reader, |n, record| {
        match record {
            BenchmarkRecord::Cube { key, probs } => {
                let board = match engine.board_from_key(&key) {
                    Ok(board) => board,
                    Err(e) => {
                        warn!("benchmark line {n}: {e}, skipped");
                        return Ok(());
                    }
                };

                n_cubes += 1;

                let score = Score::MONEY_EQUIVALENT;
                let di = engine.cube_decision(net, &board, score, None)?;
                let rdi = engine.cube_decision(net, &board, score, Some(&probs))?;

                if di.action != rdi.action {
                    let err = f64::from(action_error(&rdi, &di.action));

                    if di.action.double != rdi.action.double {
                        double_err += err;
                    }

                    if di.action.take != rdi.action.take {
                        take_err += err;
                    }
                }
            }
            BenchmarkRecord::Move { key, dice, moves } => {
                let board = match engine.board_from_key(&key) {
                    Ok(board) => board,
                    Err(e) => {
                        warn!("benchmark line {n}: {e}, skipped");
                        return Ok(());
                    }
                };

                let chosen = engine.best_move(net, &board, dice, 0, Score::Money)?;
                let loss = move_loss(&moves, &chosen);

                if loss < 0.0 {
                    warn!("benchmark line {n}: negative loss {loss} for {chosen}, skipped");
                    return Ok(());
                }

                n_moves += 1;
                move_err += f64::from(loss);
            }
            _ => {}
        }

        Ok(())
    })?;

    let mean = |total: f64, n: usize| if n == 0 { 0.0 } else { (total / n as f64) as f32 };

    Ok(BenchmarkErrors {
        moves: mean(move_err, n_moves),
        double: mean(double_err, n_cubes),
        take: mean(take_err, n_cubes),
        move_records: n_moves,
        cube_records: n_cubes,
    })
}
