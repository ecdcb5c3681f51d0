//! The outer curriculum: alternate curation and training cycles, tracking the
//! candidate network's benchmark errors between them.

use std::{
    error::Error,
    fmt,
    fs::{self, File},
    io::BufReader,
    path::{Path, PathBuf},
};

use log::{info, warn};

use crate::{
    benchmark::{benchmark_error, BenchmarkError, BenchmarkErrors},
    curator::{CurationError, CurationMethod, CurationSettings, Curator},
    data::{read_examples_from, CurationState, DataError, DataSink},
    engine::{Engine, EngineError, PositionClass},
    logger::{ansi, report_benchmark},
    trainer::{train, CommandSource, TrainerError, TrainerSettings},
};

#[derive(Clone, Debug)]
pub struct PipelineSettings {
    pub reference: PathBuf,
    pub data: PathBuf,
    pub benchmark: PathBuf,
    /// Directory holding candidate networks and cached error files.
    pub output_dir: PathBuf,
    /// Candidate networks are `<base>.<NN>` for cycle `NN`.
    pub candidate_base: String,
    pub max_cycle: usize,
    /// Training passes per cycle when the move error does not improve.
    pub max_passes: usize,
    /// First pass of the first cycle, when resuming an interrupted run.
    pub pass_start: usize,
    /// A pass is accepted when the move error drops below this fraction of
    /// the previous one.
    pub move_improvement: f32,
    /// Curation threshold as a multiple of the move error.
    pub threshold_factor: f32,
    pub default_threshold: f32,
    pub curation: CurationSettings,
    pub trainer: TrainerSettings,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            reference: PathBuf::new(),
            data: PathBuf::new(),
            benchmark: PathBuf::new(),
            output_dir: PathBuf::from("."),
            candidate_base: "gnubg.weights.best".to_string(),
            max_cycle: 200,
            max_passes: 2,
            pass_start: 0,
            move_improvement: 0.95,
            threshold_factor: 2.0,
            default_threshold: 0.01,
            curation: CurationSettings::default(),
            trainer: TrainerSettings::default(),
        }
    }
}

impl PipelineSettings {
    pub fn display(&self) {
        println!("Reference Net          : {}", ansi(self.reference.display(), "32;1"));
        println!("Data File              : {}", ansi(self.data.display(), "32;1"));
        println!("Benchmark File         : {}", ansi(self.benchmark.display(), "32;1"));
        println!("Max Cycle              : {}", ansi(self.max_cycle, 31));
        println!("Passes / Cycle         : {}", ansi(self.max_passes, 31));
        self.curation.display();
        self.trainer.display();
    }

    pub fn candidate_path(&self, cycle: usize) -> PathBuf {
        self.output_dir.join(format!("{}.{cycle:02}", self.candidate_base))
    }

    /// Cached benchmark errors of the network at `net` over this data file.
    pub fn error_path(&self, net: &Path) -> PathBuf {
        let name = |p: &Path| p.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        self.output_dir.join(format!("error-{}-{}", name(net), name(&self.data)))
    }

    /// Curation threshold for a move error.
    pub fn threshold(&self, move_error: f32) -> f32 {
        let th = if self.curation.method == CurationMethod::ProbeOnePly {
            self.default_threshold
        } else {
            self.threshold_factor * move_error
        };

        if th == 0.0 {
            0.01
        } else {
            th
        }
    }
}

#[derive(Debug)]
pub enum PipelineError {
    Engine(EngineError),
    Data(DataError),
    Benchmark(BenchmarkError),
    Curation(CurationError),
    Trainer(TrainerError),
    Io(std::io::Error),
    ErrorFile(PathBuf),
}

impl From<EngineError> for PipelineError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

impl From<DataError> for PipelineError {
    fn from(value: DataError) -> Self {
        Self::Data(value)
    }
}

impl From<BenchmarkError> for PipelineError {
    fn from(value: BenchmarkError) -> Self {
        Self::Benchmark(value)
    }
}

impl From<CurationError> for PipelineError {
    fn from(value: CurationError) -> Self {
        Self::Curation(value)
    }
}

impl From<TrainerError> for PipelineError {
    fn from(value: TrainerError) -> Self {
        Self::Trainer(value)
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Engine(e) => write!(f, "engine: {e}"),
            Self::Data(e) => write!(f, "data file: {e}"),
            Self::Benchmark(e) => write!(f, "benchmark: {e}"),
            Self::Curation(e) => write!(f, "curation: {e}"),
            Self::Trainer(e) => write!(f, "training: {e}"),
            Self::Io(e) => write!(f, "{e}"),
            Self::ErrorFile(p) => write!(f, "malformed error file {}", p.display()),
        }
    }
}

impl Error for PipelineError {}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CycleReport {
    pub cycle: usize,
    pub added: usize,
    pub passes: usize,
    pub errors: BenchmarkErrors,
}

/// A curation run over one data file, resumable from that file.
pub struct Pipeline<E: Engine> {
    engine: E,
    settings: PipelineSettings,
    reference: E::Net,
    candidate: E::Net,
    state: CurationState,
    errors: BenchmarkErrors,
    threshold: f32,
}

impl<E: Engine> Pipeline<E> {
    /// Resume curation state from the data file, load both networks and their
    /// benchmark errors.
    pub fn open(mut engine: E, mut settings: PipelineSettings) -> Result<Self, PipelineError> {
        if settings.curation.target == PositionClass::Race {
            settings.trainer.ignore_bg = true;
        }

        if let Some(seed) = settings.curation.seed {
            engine.set_seed(seed);
        }

        let state = CurationState::resume_file(&settings.data, &settings.curation.schedule)?;
        info!("continue cycle {}, {} positions to go", state.cycle, state.to_add);

        let reference = engine.load_net(&settings.reference)?;
        let candidate_path = settings.candidate_path(state.cycle);
        let candidate = engine.load_net(&candidate_path)?;

        let ref_errors = cached_errors(&engine, &reference, &settings.reference, &settings)?;
        report_benchmark(settings.reference.display(), ref_errors.moves, ref_errors.double, ref_errors.take);

        let errors = cached_errors(&engine, &candidate, &candidate_path, &settings)?;
        report_benchmark(candidate_path.display(), errors.moves, errors.double, errors.take);

        let threshold = settings.threshold(errors.moves);
        info!("error threshold set to {threshold:.5}");

        Ok(Self { engine, settings, reference, candidate, state, errors, threshold })
    }

    pub fn state(&self) -> &CurationState {
        &self.state
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn errors(&self) -> BenchmarkErrors {
        self.errors
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn candidate(&self) -> &E::Net {
        &self.candidate
    }

    /// Run cycles until `max_cycle`.
    pub fn run<C: CommandSource>(&mut self, commands: &mut C) -> Result<(), PipelineError> {
        self.settings.display();

        while self.state.cycle <= self.settings.max_cycle {
            self.cycle(commands)?;
        }

        Ok(())
    }

    /// Add this cycle's positions, then train the candidate of the next cycle.
    pub fn cycle<C: CommandSource>(&mut self, commands: &mut C) -> Result<CycleReport, PipelineError> {
        let schedule = &self.settings.curation.schedule;

        if self.state.cycle_fresh(schedule) {
            info!("start cycle {}", self.state.cycle);
        }

        let mut report = CycleReport::default();

        if self.state.to_add > 0 {
            info!("searching for {} positions to add", self.state.to_add);

            let mut sink = DataSink::open_append(&self.settings.data)?;
            let mut curator = Curator::new(
                &mut self.engine,
                &self.reference,
                &self.candidate,
                &self.settings.curation,
                self.threshold,
            );

            report.added = curator.add_positions(&mut self.state, &mut sink)?.added;
        }

        self.state.cycle += 1;
        report.cycle = self.state.cycle;

        let examples = read_examples_from(&self.settings.data)?;
        let save = self.settings.candidate_path(self.state.cycle);

        for pass in self.settings.pass_start..self.settings.max_passes {
            // left behind by an interrupted pass
            if save.exists() {
                info!("loading {}", save.display());
                self.candidate = self.engine.load_net(&save)?;
            }

            println!("training for cycle {}", ansi(self.state.cycle, 36));
            train(&self.engine, &mut self.candidate, &examples, &save, &self.settings.trainer, commands)?;
            report.passes += 1;

            let errors = checked_errors(&self.engine, &self.candidate, &self.settings.benchmark)?;
            report_benchmark(save.display(), errors.moves, errors.double, errors.take);

            if errors.moves >= self.settings.move_improvement * self.errors.moves && pass + 1 < self.settings.max_passes {
                warn!("move error {} did not improve on {}", errors.moves, self.errors.moves);
                continue;
            }

            fs::write(self.settings.error_path(&save), errors.as_line())?;

            self.errors = errors;
            self.threshold = self.settings.threshold(errors.moves);
            info!("error threshold set to {:.5}", self.threshold);
            break;
        }

        self.settings.pass_start = 0;
        self.state.to_add = self.settings.curation.schedule.positions_to_add(self.state.cycle);

        report.errors = self.errors;
        Ok(report)
    }
}

fn checked_errors<E: Engine>(engine: &E, net: &E::Net, benchmark: &Path) -> Result<BenchmarkErrors, PipelineError> {
    let reader = BufReader::new(File::open(benchmark)?);
    Ok(benchmark_error(engine, net, reader)?)
}

/// Benchmark errors of the network stored at `net_path`, computed once and
/// cached next to the candidates.
fn cached_errors<E: Engine>(
    engine: &E,
    net: &E::Net,
    net_path: &Path,
    settings: &PipelineSettings,
) -> Result<BenchmarkErrors, PipelineError> {
    let path = settings.error_path(net_path);

    if path.exists() {
        let text = fs::read_to_string(&path)?;
        let line = text.lines().next().unwrap_or_default();
        return BenchmarkErrors::parse_line(line).ok_or(PipelineError::ErrorFile(path));
    }

    info!("calculating error for {}", net_path.display());
    let errors = checked_errors(engine, net, &settings.benchmark)?;
    fs::write(&path, errors.as_line())?;

    Ok(errors)
}
