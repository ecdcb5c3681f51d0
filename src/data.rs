//! Training data files.
//!
//! Each data line is `<position-key> <p0> <p1> <p2> <p3> <p4>`. Lines starting
//! with `#` are comments; `# Positions added in cycle N` marks where a curation
//! cycle started appending, and is what a restarted run resumes from.

use std::{
    collections::HashSet,
    error::Error,
    fmt,
    fs::{File, OpenOptions},
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use crate::{engine::PositionKey, position::Probs};

pub const CYCLE_MARKER: &str = "# Positions added in cycle";

#[derive(Debug)]
pub enum DataError {
    Io(io::Error),
    Parse { line: usize, message: String },
}

impl From<io::Error> for DataError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl fmt::Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "{e}"),
            Self::Parse { line, message } => write!(f, "line {line}: {message}"),
        }
    }
}

impl Error for DataError {}

#[derive(Clone, Debug, PartialEq)]
pub struct TrainingExample {
    pub key: PositionKey,
    pub probs: Probs,
}

impl TrainingExample {
    pub fn new(key: PositionKey, probs: Probs) -> Self {
        Self { key, probs }
    }

    pub fn parse(line: &str) -> Result<Self, String> {
        let fields: Vec<&str> = line.split_whitespace().collect();

        match fields.split_first() {
            Some((key, probs)) => Ok(Self { key: PositionKey::from(*key), probs: Probs::from_fields(probs)? }),
            None => Err("empty line".to_string()),
        }
    }

    pub fn to_line(&self) -> String {
        format!("{} {}", self.key, self.probs.formatted(5, 1.0))
    }
}

/// Cycle number of a cycle marker line.
pub fn cycle_marker(line: &str) -> Option<usize> {
    line.strip_prefix(CYCLE_MARKER)?.split_whitespace().next()?.parse().ok()
}

fn is_data(line: &str) -> bool {
    !line.trim().is_empty() && !line.starts_with('#')
}

/// All examples of a data file, in file order.
pub fn read_examples<R: BufRead>(reader: R) -> Result<Vec<TrainingExample>, DataError> {
    let mut examples = Vec::new();

    for (n, line) in reader.lines().enumerate() {
        let line = line?;

        if !is_data(&line) {
            continue;
        }

        let example = TrainingExample::parse(&line).map_err(|message| DataError::Parse { line: n + 1, message })?;
        examples.push(example);
    }

    Ok(examples)
}

pub fn read_examples_from(path: &Path) -> Result<Vec<TrainingExample>, DataError> {
    read_examples(BufReader::new(File::open(path)?))
}

/// Number of positions to add in each curation cycle.
#[derive(Clone, Debug)]
pub struct AddSchedule {
    /// Quotas of the first cycles.
    pub initial: Vec<usize>,
    /// Quota of every later cycle.
    pub per_cycle: usize,
    /// Never add positions, only train.
    pub train_only: bool,
}

impl Default for AddSchedule {
    fn default() -> Self {
        Self { initial: vec![1000, 2000, 2000], per_cycle: 5000, train_only: false }
    }
}

impl AddSchedule {
    pub fn positions_to_add(&self, cycle: usize) -> usize {
        if self.train_only {
            return 0;
        }

        self.initial.get(cycle).copied().unwrap_or(self.per_cycle)
    }
}

/// Progress of curation, rebuilt from the data file on restart.
#[derive(Clone, Debug, Default)]
pub struct CurationState {
    pub cycle: usize,
    pub to_add: usize,
    pub seen: HashSet<PositionKey>,
}

impl CurationState {
    pub fn new(schedule: &AddSchedule) -> Self {
        Self { cycle: 0, to_add: schedule.positions_to_add(0), seen: HashSet::new() }
    }

    /// Scan a data file once: the last cycle marker gives the cycle number,
    /// data lines after it count against that cycle's quota, and every key
    /// is remembered.
    pub fn resume<R: BufRead>(reader: R, schedule: &AddSchedule) -> Result<Self, DataError> {
        let mut state = Self::new(schedule);

        for (n, line) in reader.lines().enumerate() {
            let line = line?;

            if line.trim().is_empty() {
                continue;
            }

            if let Some(cycle) = cycle_marker(&line) {
                state.cycle = cycle;
                state.to_add = schedule.positions_to_add(cycle);
                continue;
            }

            if line.starts_with('#') {
                continue;
            }

            let key = line
                .split_whitespace()
                .next()
                .ok_or_else(|| DataError::Parse { line: n + 1, message: "missing key".to_string() })?;

            state.seen.insert(PositionKey::from(key));
            state.to_add = state.to_add.saturating_sub(1);
        }

        Ok(state)
    }

    /// Fresh state when the file does not exist yet.
    pub fn resume_file(path: &Path, schedule: &AddSchedule) -> Result<Self, DataError> {
        if !path.exists() {
            return Ok(Self::new(schedule));
        }

        Self::resume(BufReader::new(File::open(path)?), schedule)
    }

    /// True when this cycle has not added anything yet.
    pub fn cycle_fresh(&self, schedule: &AddSchedule) -> bool {
        self.to_add == schedule.positions_to_add(self.cycle)
    }
}

/// Appends examples to a data file.
pub struct DataSink<W: Write> {
    writer: W,
    written: usize,
}

impl DataSink<BufWriter<File>> {
    pub fn open_append(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> DataSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    pub fn mark_cycle(&mut self, cycle: usize) -> io::Result<()> {
        writeln!(self.writer, "{CYCLE_MARKER} {cycle}")
    }

    pub fn append(&mut self, example: &TrainingExample) -> io::Result<()> {
        writeln!(self.writer, "{}", example.to_line())?;
        self.written += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
