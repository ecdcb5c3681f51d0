//! Contract with the backgammon engine.
//!
//! Move generation, position classification, network evaluation, cube
//! analysis and the training step are all provided by the engine. Nothing in
//! this crate assumes hidden engine state: the network and the match score an
//! operation depends on are always passed in.

use std::{error::Error, fmt, path::Path, str::FromStr};

use crate::{
    data::TrainingExample,
    position::{Board, Probs},
};

/// Opaque engine encoding of a board position.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PositionKey(String);

impl PositionKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PositionKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Dice(pub u8, pub u8);

impl Dice {
    /// Larger die first.
    pub fn ordered(self) -> Self {
        if self.0 < self.1 {
            Self(self.1, self.0)
        } else {
            self
        }
    }

    pub fn is_double(self) -> bool {
        self.0 == self.1
    }

    /// The 21 distinct rolls, smaller die first.
    pub fn all_rolls() -> impl Iterator<Item = Self> {
        (1..=6).flat_map(|d0| (d0..=6).map(move |d1| Self(d0, d1)))
    }
}

impl fmt::Display for Dice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.0, self.1)
    }
}

/// Match score context for cube and checker play decisions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Score {
    Money,
    /// Points each side still needs: (side on roll, opponent).
    Away(u8, u8),
}

impl Score {
    /// 7-away/7-away, used as the money-equivalent score for benchmarks.
    pub const MONEY_EQUIVALENT: Self = Self::Away(7, 7);
    /// Double match point.
    pub const DMP: Self = Self::Away(1, 1);
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Money => write!(f, "money"),
            Self::Away(x, o) => write!(f, "{x} {o}"),
        }
    }
}

/// How the engine should produce outcome probabilities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Evaluation {
    /// Network evaluation with an n-ply lookahead; 0 is the raw network.
    Ply(u8),
    /// Cheap estimator used to prune candidate moves.
    Prune,
    /// One-sided rollout with the given number of trials.
    OneSidedRollout { trials: u32 },
    /// One-sided bearoff database.
    OneSidedBearoff,
    /// One-sided race database. May be unavailable for long races.
    OneSidedRace,
}

/// Structural game phase. Declared in the order self-play moves through them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PositionClass {
    Contact,
    Crashed,
    BackContain,
    Race,
    Bearoff,
    Over,
}

impl FromStr for PositionClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "contact" => Ok(Self::Contact),
            "crashed" => Ok(Self::Crashed),
            "backcontain" => Ok(Self::BackContain),
            "race" => Ok(Self::Race),
            "bearoff" => Ok(Self::Bearoff),
            "over" => Ok(Self::Over),
            _ => Err(format!("unknown position class '{s}'")),
        }
    }
}

impl fmt::Display for PositionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Contact => "contact",
            Self::Crashed => "crashed",
            Self::BackContain => "backcontain",
            Self::Race => "race",
            Self::Bearoff => "bearoff",
            Self::Over => "over",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CubeAction {
    pub double: bool,
    pub take: bool,
    pub too_good: bool,
}

impl fmt::Display for CubeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let desc = match (self.too_good, self.double, self.take) {
            (true, _, _) => "too-good/pass",
            (false, false, true) => "no-double/take",
            (false, true, false) => "double/pass",
            (false, true, true) => "double/take",
            (false, false, false) => "??",
        };
        f.write_str(desc)
    }
}

/// Result of a cube analysis, with the cubeful equity of each outcome.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CubeDecision {
    pub action: CubeAction,
    pub no_double: f32,
    pub double_take: f32,
    pub double_pass: f32,
}

/// Errors of a network over a loaded dataset. The `no_bg` pair ignores
/// the backgammon outputs, whose error stems from imperfect labels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TrainingErrors {
    pub mean: f32,
    pub max: f32,
    pub mean_no_bg: f32,
    pub max_no_bg: f32,
}

impl TrainingErrors {
    /// (mean, max) pair used for training decisions.
    pub fn select(&self, ignore_bg: bool) -> (f32, f32) {
        if ignore_bg {
            (self.mean_no_bg, self.max_no_bg)
        } else {
            (self.mean, self.max)
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineErrorKind {
    UnknownKey,
    NetLoad,
    NetSave,
    Unavailable,
    Evaluation,
    Training,
}

#[derive(Clone, Debug)]
pub struct EngineError {
    pub kind: EngineErrorKind,
    pub message: String,
}

impl EngineError {
    pub fn new(kind: EngineErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for EngineError {}

pub type EngineResult<T> = Result<T, EngineError>;

/// Gradient training over a dataset loaded into the engine.
pub trait DataTrainer<N> {
    /// Number of loaded examples.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn errors(&self, net: &N) -> EngineResult<TrainingErrors>;

    /// One pass over the examples in `order`, updating `net` in place.
    fn train(&mut self, net: &mut N, alpha: f32, order: &[usize]) -> EngineResult<()>;
}

pub trait Engine {
    type Net;
    type Trainer: DataTrainer<Self::Net>;

    fn key_of_board(&self, board: &Board) -> EngineResult<PositionKey>;

    fn board_from_key(&self, key: &PositionKey) -> EngineResult<Board>;

    /// Legal moves, as positions seen by the side that moved.
    fn moves(&self, board: &Board, dice: Dice) -> EngineResult<Vec<PositionKey>>;

    /// Best move of `net` at `ply`, as the resulting position with the
    /// opponent on roll.
    fn best_move(&self, net: &Self::Net, board: &Board, dice: Dice, ply: u8, score: Score)
        -> EngineResult<PositionKey>;

    fn classify(&self, board: &Board) -> PositionClass;

    fn probs(&self, net: &Self::Net, board: &Board, evaluation: Evaluation) -> EngineResult<Probs>;

    /// Cube analysis at `score`, from `probs` when given, otherwise from the
    /// 0-ply evaluation of `net`.
    fn cube_decision(&self, net: &Self::Net, board: &Board, score: Score, probs: Option<&Probs>)
        -> EngineResult<CubeDecision>;

    fn roll(&mut self) -> Dice;

    fn set_seed(&mut self, seed: u64);

    fn load_net(&self, path: &Path) -> EngineResult<Self::Net>;

    fn save_net(&self, net: &Self::Net, path: &Path) -> EngineResult<()>;

    fn trainer(&self, examples: &[TrainingExample], ignore_bg: bool) -> EngineResult<Self::Trainer>;
}
