//! Self-play search for positions the candidate network gets wrong.
//!
//! Games are played by the candidate. Every position of the target class is
//! checked against the reference: positions where the two disagree on the
//! cube action or on the best move are labelled with reference probabilities
//! and appended to the data file straight away.

use std::{error::Error, fmt, io::Write};

use log::{debug, info};
use rand::{rngs::StdRng, seq::SliceRandom};

use crate::{
    cube::{find_disagreement, score_battery},
    data::{AddSchedule, CurationState, DataSink, TrainingExample},
    engine::{Dice, Engine, EngineError, EngineResult, Evaluation, PositionClass, PositionKey, Score},
    logger::{ansi, report_added},
    moves::{game_on, stop_game},
    position::{Board, Probs, START_POSITION},
    util::rng_from,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CurationMethod {
    /// Cube and checker play disagreements between candidate and reference.
    Disagreement,
    /// Positions whose candidate 0-ply and 1-ply equities differ.
    ProbeOnePly,
    /// Candidate 1-ply against reference 0-ply best moves, probing replies.
    OnePlyOnly,
}

#[derive(Clone, Debug)]
pub struct CurationSettings {
    pub target: PositionClass,
    pub method: CurationMethod,
    pub schedule: AddSchedule,
    /// Compare cube actions over the full score battery.
    pub cube_battery: bool,
    pub moves_only: bool,
    /// Also compare the candidate's 1-ply move and probe the replies.
    pub probe_one_ply: bool,
    /// Ply of the reference move choice.
    pub ref_moves_ply: u8,
    /// Ply self-play uses in target class positions.
    pub play_ply: u8,
    /// Play every cycle at double match point, not just odd ones.
    pub all_dmp: bool,
    /// Ply of reference labels outside the database classes.
    pub label_ply: u8,
    pub rollout_trials: u32,
    /// Minimum equity gap between candidate and reference cube probabilities.
    pub min_equity_gap: f32,
    /// Minimum proportional cube error.
    pub min_cube_error: f32,
    /// Threshold multiplier for probed replies.
    pub probe_factor: f32,
    pub start_positions: Vec<Board>,
    pub max_games: usize,
    /// Stop after this many consecutive games without a new example.
    pub max_barren_games: usize,
    pub seed: Option<u64>,
}

impl Default for CurationSettings {
    fn default() -> Self {
        Self {
            target: PositionClass::Contact,
            method: CurationMethod::Disagreement,
            schedule: AddSchedule::default(),
            cube_battery: true,
            moves_only: false,
            probe_one_ply: true,
            ref_moves_ply: 2,
            play_ply: 0,
            all_dmp: false,
            label_ply: 2,
            rollout_trials: 1296,
            min_equity_gap: 0.005,
            min_cube_error: 0.002,
            probe_factor: 72.0,
            start_positions: Vec::new(),
            max_games: 1_000_000,
            max_barren_games: 10_000,
            seed: None,
        }
    }
}

impl CurationSettings {
    /// Move choices are compared at 0-ply when hunting bearoff positions.
    pub fn moves_ply(&self) -> u8 {
        if self.target == PositionClass::Bearoff {
            0
        } else {
            self.ref_moves_ply
        }
    }

    pub fn display(&self) {
        println!("Target Class           : {}", ansi(self.target, "32;1"));
        println!("Method                 : {}", ansi(format!("{:?}", self.method), 31));
        println!("Cube Battery           : {}", ansi(self.cube_battery, 31));
        println!("Moves Only             : {}", ansi(self.moves_only, 31));
        println!("Probe 1-ply            : {}", ansi(self.probe_one_ply, 31));
        println!("Reference Moves Ply    : {}", ansi(self.moves_ply(), 31));
        println!("Start Positions        : {}", ansi(self.start_positions.len().max(1), 31));
    }
}

#[derive(Debug)]
pub enum CurationError {
    Engine(EngineError),
    Io(std::io::Error),
}

impl From<EngineError> for CurationError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

impl From<std::io::Error> for CurationError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl fmt::Display for CurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Engine(e) => write!(f, "engine: {e}"),
            Self::Io(e) => write!(f, "data file: {e}"),
        }
    }
}

impl Error for CurationError {}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CurationReport {
    pub games: usize,
    pub added: usize,
}

pub struct Curator<'a, E: Engine> {
    engine: &'a mut E,
    reference: &'a E::Net,
    candidate: &'a E::Net,
    settings: &'a CurationSettings,
    threshold: f32,
    scores: Vec<Score>,
    rng: StdRng,
}

impl<'a, E: Engine> Curator<'a, E> {
    /// `threshold` is the equity error above which a move disagreement counts.
    pub fn new(
        engine: &'a mut E,
        reference: &'a E::Net,
        candidate: &'a E::Net,
        settings: &'a CurationSettings,
        threshold: f32,
    ) -> Self {
        let scores = if settings.cube_battery { score_battery() } else { vec![Score::MONEY_EQUIVALENT] };

        Self { engine, reference, candidate, settings, threshold, scores, rng: rng_from(settings.seed) }
    }

    /// Play games until the cycle's quota is met or self-play stops finding
    /// new positions.
    pub fn add_positions<W: Write>(
        &mut self,
        state: &mut CurationState,
        sink: &mut DataSink<W>,
    ) -> Result<CurationReport, CurationError> {
        let mut report = CurationReport::default();

        if state.to_add == 0 {
            return Ok(report);
        }

        if state.cycle_fresh(&self.settings.schedule) {
            sink.mark_cycle(state.cycle)?;
        }

        let dmp = state.cycle % 2 == 1 || self.settings.all_dmp;
        if dmp {
            info!("playing at double match point");
        }

        let mut barren = 0;

        while state.to_add > 0 && report.games < self.settings.max_games && barren < self.settings.max_barren_games {
            let added = self.play_game(state, sink, dmp)?;

            report.games += 1;
            report.added += added;
            barren = if added == 0 { barren + 1 } else { 0 };
        }

        sink.flush()?;
        report_added(report.added, state.to_add, report.games);

        Ok(report)
    }

    fn start_position(&mut self) -> Board {
        *self.settings.start_positions.choose(&mut self.rng).unwrap_or(&START_POSITION)
    }

    fn play_game<W: Write>(
        &mut self,
        state: &mut CurationState,
        sink: &mut DataSink<W>,
        dmp: bool,
    ) -> Result<usize, CurationError> {
        let target = self.settings.target;
        let mut board = self.start_position();

        if board != START_POSITION {
            debug!("starting from {board}");
        }

        let mut dice = loop {
            let dice = self.engine.roll();
            if !dice.is_double() {
                break dice;
            }
        };

        let mut added = 0;

        while game_on(&*self.engine, &board) && !stop_game(&*self.engine, &board, target) {
            let dice_now = dice.ordered();
            let in_target = self.engine.classify(&board) == target;

            if in_target {
                added += match self.settings.method {
                    CurationMethod::Disagreement => self.disagreement(state, sink, &board, dice_now)?,
                    CurationMethod::ProbeOnePly => self.one_ply_gap(state, sink, &board)?,
                    CurationMethod::OnePlyOnly => self.one_ply_only(state, sink, &board, dice_now)?,
                };

                sink.flush()?;

                if state.to_add == 0 {
                    break;
                }
            }

            let score = if dmp { Score::DMP } else { Score::Money };
            let ply = if in_target { self.settings.play_ply } else { 0 };

            let next = self.engine.best_move(self.candidate, &board, dice_now, ply, score)?;
            board = self.engine.board_from_key(&next)?;
            dice = self.engine.roll();
        }

        Ok(added)
    }

    /// Reference probabilities used as a training label.
    fn label(&self, board: &Board) -> EngineResult<Probs> {
        let engine = &*self.engine;
        let net = self.reference;

        match self.settings.target {
            PositionClass::Bearoff => engine.probs(net, board, Evaluation::OneSidedBearoff),
            PositionClass::Race => match engine.probs(net, board, Evaluation::OneSidedRace) {
                Ok(probs) => Ok(probs),
                Err(e) => {
                    debug!("race database failed ({e}), evaluating {board} instead");

                    if board.long_race() {
                        engine.probs(net, board, Evaluation::OneSidedRollout { trials: self.settings.rollout_trials })
                    } else {
                        engine.probs(net, board, Evaluation::Ply(self.settings.label_ply))
                    }
                }
            },
            _ => engine.probs(net, board, Evaluation::Ply(self.settings.label_ply)),
        }
    }

    fn record<W: Write>(
        &self,
        state: &mut CurationState,
        sink: &mut DataSink<W>,
        key: &PositionKey,
        probs: Probs,
    ) -> Result<bool, CurationError> {
        if state.to_add == 0 || state.seen.contains(key) {
            return Ok(false);
        }

        sink.append(&TrainingExample::new(key.clone(), probs))?;
        state.seen.insert(key.clone());
        state.to_add -= 1;

        debug!("added {key} {}, {} to go", probs.formatted_equity(), state.to_add);

        Ok(true)
    }

    /// Whether candidate and reference probabilities lead to materially
    /// different cube actions.
    fn cube_disagrees(&self, board: &Board, net_probs: &Probs, ref_probs: &Probs) -> EngineResult<bool> {
        let found = find_disagreement(
            &*self.engine,
            self.reference,
            board,
            &self.scores,
            net_probs,
            ref_probs,
            self.settings.min_cube_error,
        )?;

        if let Some(d) = &found {
            debug!(
                "cube at ({}): new {} ref {} (err {:.5}) {board}",
                d.score, d.net.action, d.reference.action, d.proportional_error
            );
        }

        Ok(found.is_some())
    }

    fn disagreement<W: Write>(
        &self,
        state: &mut CurationState,
        sink: &mut DataSink<W>,
        board: &Board,
        dice: Dice,
    ) -> Result<usize, CurationError> {
        let engine = &*self.engine;
        let settings = self.settings;
        let target = settings.target;
        let mut added = 0;

        let key = engine.key_of_board(board)?;
        let moves = engine.moves(board, dice)?;

        let mut use_moves = false;
        if moves.len() > 1 {
            for m in &moves {
                if engine.classify(&engine.board_from_key(m)?) == target {
                    use_moves = true;
                    break;
                }
            }
        }

        let use_cube = *board != START_POSITION && !settings.moves_only && !state.seen.contains(&key);

        if use_cube {
            debug!("testing cube ({dice}) {board}");

            let label = if settings.cube_battery {
                let net_probs = engine.probs(self.candidate, board, Evaluation::Ply(0))?;
                let ref_probs = self.label(board)?;

                let gap = (ref_probs.equity() - net_probs.equity()).abs();
                let wanted = gap >= settings.min_equity_gap && self.cube_disagrees(board, &net_probs, &ref_probs)?;
                wanted.then_some(ref_probs)
            } else {
                let score = Score::MONEY_EQUIVALENT;
                let net_probs = engine.probs(self.candidate, board, Evaluation::Ply(0))?;
                let net_cube = engine.cube_decision(self.candidate, board, score, None)?;
                let ref_probs = engine.probs(self.reference, board, Evaluation::Ply(settings.label_ply))?;
                let ref_cube = engine.cube_decision(self.reference, board, score, Some(&ref_probs))?;

                let gap = (ref_probs.equity() - net_probs.equity()).abs();
                let wanted = net_cube.action != ref_cube.action && gap >= settings.min_cube_error;

                if wanted {
                    debug!("cube new 0p {} ref {}", net_cube.action, ref_cube.action);
                }

                wanted.then_some(ref_probs)
            };

            if let Some(probs) = label {
                added += usize::from(self.record(state, sink, &key, probs)?);
            }
        }

        if !use_moves || state.to_add == 0 {
            return Ok(added);
        }

        let ref_ply = settings.moves_ply();
        let m0 = engine.best_move(self.candidate, board, dice, 0, Score::Money)?;
        let m2 = engine.best_move(self.reference, board, dice, ref_ply, Score::Money)?;

        if m0 != m2 {
            let b0 = engine.board_from_key(&m0)?;
            let b2 = engine.board_from_key(&m2)?;
            let p0 = engine.probs(self.reference, &b0, Evaluation::Ply(ref_ply))?;
            let p2 = engine.probs(self.reference, &b2, Evaluation::Ply(ref_ply))?;

            let err = (p0.equity() - p2.equity()).abs();
            debug!(" 0ply error {err:.6} ({dice}) {board}");

            if err >= self.threshold {
                for (k, b, p) in [(&m0, &b0, p0), (&m2, &b2, p2)] {
                    if engine.classify(b) == target {
                        added += usize::from(self.record(state, sink, k, p)?);
                    }
                }
            }
        }

        if settings.probe_one_ply {
            let m1 = engine.best_move(self.candidate, board, dice, 1, Score::Money)?;

            if m1 != m2 {
                let b1 = engine.board_from_key(&m1)?;
                let b2 = engine.board_from_key(&m2)?;
                let p1 = self.label(&b1)?;
                let p2 = self.label(&b2)?;

                if (p1.equity() - p2.equity()).abs() > self.threshold {
                    debug!(" 1p {} {b1}", p1.formatted_equity());
                    debug!(" 2p {} {b2}", p2.formatted_equity());
                    added += self.probe_replies(state, sink, &[b2, b1])?;
                }
            }
        }

        Ok(added)
    }

    /// Candidate positions reached from `boards` by any roll whose 0-ply
    /// evaluation is far off the reference label.
    fn probe_replies<W: Write>(
        &self,
        state: &mut CurationState,
        sink: &mut DataSink<W>,
        boards: &[Board],
    ) -> Result<usize, CurationError> {
        let engine = &*self.engine;
        let threshold = self.threshold * self.settings.probe_factor;
        let mut added = 0;

        for from in boards {
            for dice in Dice::all_rolls() {
                if state.to_add == 0 {
                    return Ok(added);
                }

                let reply = engine.best_move(self.candidate, from, dice, 0, Score::Money)?;
                let board = engine.board_from_key(&reply)?;

                if engine.classify(&board) != self.settings.target || state.seen.contains(&reply) {
                    continue;
                }

                let p0 = engine.probs(self.candidate, &board, Evaluation::Ply(0))?;
                let label = self.label(&board)?;
                let err = (p0.equity() - label.equity()).abs();

                if err >= threshold {
                    added += usize::from(self.record(state, sink, &reply, label)?);
                }
            }
        }

        Ok(added)
    }

    fn one_ply_gap<W: Write>(
        &self,
        state: &mut CurationState,
        sink: &mut DataSink<W>,
        board: &Board,
    ) -> Result<usize, CurationError> {
        let engine = &*self.engine;
        let key = engine.key_of_board(board)?;

        if state.seen.contains(&key) {
            return Ok(0);
        }

        let p0 = engine.probs(self.candidate, board, Evaluation::Ply(0))?;
        let p1 = engine.probs(self.candidate, board, Evaluation::Ply(1))?;
        let err = (p0.equity() - p1.equity()).abs();

        if err < self.threshold {
            return Ok(0);
        }

        let label = self.label(board)?;
        let gap = (label.equity() - p0.equity()).abs();

        if gap >= self.settings.min_equity_gap && self.cube_disagrees(board, &p0, &label)? {
            debug!("({err:.5} {gap:.5}) {board}");
            return Ok(usize::from(self.record(state, sink, &key, label)?));
        }

        Ok(0)
    }

    fn one_ply_only<W: Write>(
        &self,
        state: &mut CurationState,
        sink: &mut DataSink<W>,
        board: &Board,
        dice: Dice,
    ) -> Result<usize, CurationError> {
        let engine = &*self.engine;

        let m1 = engine.best_move(self.candidate, board, dice, 1, Score::Money)?;
        let m0 = engine.best_move(self.reference, board, dice, 0, Score::Money)?;

        if m1 == m0 {
            return Ok(0);
        }

        let b1 = engine.board_from_key(&m1)?;
        let b0 = engine.board_from_key(&m0)?;
        let p1 = self.label(&b1)?;
        let p0 = self.label(&b0)?;

        let err = (p1.equity() - p0.equity()).abs();
        if err <= self.threshold {
            return Ok(0);
        }

        debug!(" err {err:.4} ({dice}) {board}");
        self.probe_replies(state, sink, &[b0, b1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{board_with, ScriptedEngine, ScriptedNet};

    fn sink_text(sink: DataSink<Vec<u8>>) -> String {
        String::from_utf8(sink.into_inner()).unwrap()
    }

    fn settings() -> CurationSettings {
        CurationSettings { max_barren_games: 3, seed: Some(5), ..Default::default() }
    }

    fn state(to_add: usize) -> CurationState {
        CurationState { cycle: 4, to_add, ..Default::default() }
    }

    #[test]
    fn cube_disagreement_is_recorded_once() {
        let mut engine = ScriptedEngine::default();
        let mut reference = ScriptedNet::new("ref");
        let mut candidate = ScriptedNet::new("new");

        let a = board_with(7, 3);
        let a_key = engine.key_of_board(&a).unwrap();
        candidate.set_best(&START_POSITION, a_key.clone());
        candidate.set(&a, Probs([0.6, 0.0, 0.0, 0.0, 0.0]));
        reference.set(&a, Probs([0.75, 0.0, 0.0, 0.0, 0.0]));

        let settings = CurationSettings { schedule: AddSchedule { initial: vec![], per_cycle: 5, train_only: false }, ..settings() };
        let mut state = state(5);
        let mut sink = DataSink::new(Vec::new());

        let report = Curator::new(&mut engine, &reference, &candidate, &settings, 0.01)
            .add_positions(&mut state, &mut sink)
            .unwrap();

        assert_eq!(report.added, 1);
        assert_eq!(report.games, 4);
        assert_eq!(state.to_add, 4);
        assert!(state.seen.contains(&a_key));

        let text = sink_text(sink);
        assert_eq!(text, format!("# Positions added in cycle 4\n{a_key} 0.75000 0.00000 0.00000 0.00000 0.00000\n"));

        // every reachable key is already known
        let mut sink = DataSink::new(Vec::new());
        let report = Curator::new(&mut engine, &reference, &candidate, &settings, 0.01)
            .add_positions(&mut state, &mut sink)
            .unwrap();

        assert_eq!(report.added, 0);
        assert_eq!(report.games, 3);
        assert_eq!(state.to_add, 4);
        assert_eq!(sink.written(), 0);
    }

    #[test]
    fn move_disagreement_records_both_moves() {
        let mut engine = ScriptedEngine::default();
        let mut reference = ScriptedNet::new("ref");
        let mut candidate = ScriptedNet::new("new");
        let dice = Dice(3, 1);
        engine.queue_rolls(&[dice]);

        let x1 = engine.name("X1", board_with(1, 2));
        let x2 = engine.name("X2", board_with(2, 2));
        engine.set_moves(&START_POSITION, dice, vec![x1, x2]);

        let m0 = engine.name("M0", board_with(3, 2));
        let m2 = engine.name("M2", board_with(4, 2));
        candidate.set_best(&START_POSITION, m0.clone());
        reference.set_best(&START_POSITION, m2.clone());
        reference.set(&board_with(3, 2), Probs([0.5, 0.0, 0.0, 0.0, 0.0]));
        reference.set(&board_with(4, 2), Probs([0.65, 0.0, 0.0, 0.0, 0.0]));

        let settings = CurationSettings { probe_one_ply: false, ..settings() };
        let mut state = state(2);
        let mut sink = DataSink::new(Vec::new());

        let report = Curator::new(&mut engine, &reference, &candidate, &settings, 0.01)
            .add_positions(&mut state, &mut sink)
            .unwrap();

        assert_eq!(report.added, 2);
        assert_eq!(report.games, 1);
        assert_eq!(state.to_add, 0);

        let text = sink_text(sink);
        assert!(text.contains("M0 0.50000"));
        assert!(text.contains("M2 0.65000"));
        // not fresh: quota was already partly used
        assert!(!text.contains("# Positions"));
    }

    #[test]
    fn small_move_errors_are_ignored() {
        let mut engine = ScriptedEngine::default();
        let mut reference = ScriptedNet::new("ref");
        let mut candidate = ScriptedNet::new("new");
        let dice = Dice(4, 2);
        engine.queue_rolls(&[dice]);

        let x1 = engine.name("X1", board_with(1, 2));
        let x2 = engine.name("X2", board_with(2, 2));
        engine.set_moves(&START_POSITION, dice, vec![x1, x2]);

        let m0 = engine.name("M0", board_with(3, 2));
        let m2 = engine.name("M2", board_with(4, 2));
        candidate.set_best(&START_POSITION, m0);
        reference.set_best(&START_POSITION, m2);
        reference.set(&board_with(3, 2), Probs([0.5, 0.0, 0.0, 0.0, 0.0]));
        reference.set(&board_with(4, 2), Probs([0.502, 0.0, 0.0, 0.0, 0.0]));

        let settings = CurationSettings { probe_one_ply: false, ..settings() };
        let mut state = state(2);
        let mut sink = DataSink::new(Vec::new());

        let report = Curator::new(&mut engine, &reference, &candidate, &settings, 0.01)
            .add_positions(&mut state, &mut sink)
            .unwrap();

        assert_eq!(report.added, 0);
        assert_eq!(report.games, 3);
    }

    #[test]
    fn one_ply_only_probes_replies() {
        let mut engine = ScriptedEngine::default();
        let mut reference = ScriptedNet::new("ref");
        let mut candidate = ScriptedNet::new("new");

        let b0 = board_with(3, 2);
        let b1 = board_with(4, 2);
        let m0 = engine.name("M0", b0);
        let m1 = engine.name("M1", b1);
        candidate.set_best_at(&START_POSITION, 1, m1);
        reference.set_best(&START_POSITION, m0);
        reference.set(&b0, Probs([0.5, 0.0, 0.0, 0.0, 0.0]));
        reference.set(&b1, Probs([0.6, 0.0, 0.0, 0.0, 0.0]));

        let r0 = board_with(5, 2);
        let r1 = board_with(6, 2);
        let r0_key = engine.name("R0", r0);
        let r1_key = engine.name("R1", r1);
        candidate.set_best(&b0, r0_key.clone());
        candidate.set_best(&b1, r1_key.clone());
        candidate.set(&r0, Probs([0.6, 0.0, 0.0, 0.0, 0.0]));
        candidate.set(&r1, Probs([0.6, 0.0, 0.0, 0.0, 0.0]));
        reference.set(&r0, Probs([0.75, 0.0, 0.0, 0.0, 0.0]));
        reference.set(&r1, Probs([0.61, 0.0, 0.0, 0.0, 0.0]));

        let settings = CurationSettings { method: CurationMethod::OnePlyOnly, ..settings() };
        let mut state = state(10);
        let mut sink = DataSink::new(Vec::new());

        let report = Curator::new(&mut engine, &reference, &candidate, &settings, 0.001)
            .add_positions(&mut state, &mut sink)
            .unwrap();

        // r1 is within 72 * threshold of the reference
        assert_eq!(report.added, 1);
        assert!(state.seen.contains(&r0_key));
        assert!(!state.seen.contains(&r1_key));
    }

    #[test]
    fn race_labels_fall_back() {
        let mut engine = ScriptedEngine::default();
        engine.make_unavailable(Evaluation::OneSidedRace);

        let mut reference = ScriptedNet::new("ref");
        let candidate = ScriptedNet::new("new");

        let long = board_with(1, 2);
        let mut short = [0; crate::position::BOARD_SIZE];
        short[20] = 1;
        short[3] = -1;
        let short = Board(short);

        let rollout = Probs([0.7, 0.0, 0.0, 0.0, 0.0]);
        let two_ply = Probs([0.3, 0.0, 0.0, 0.0, 0.0]);
        for b in [&long, &short] {
            reference.set_eval(b, Evaluation::OneSidedRollout { trials: 1296 }, rollout);
            reference.set_eval(b, Evaluation::Ply(2), two_ply);
        }

        let settings = CurationSettings { target: PositionClass::Race, ..settings() };
        let curator = Curator::new(&mut engine, &reference, &candidate, &settings, 0.01);

        assert_eq!(curator.label(&long).unwrap(), rollout);
        assert_eq!(curator.label(&short).unwrap(), two_ply);
    }

    #[test]
    fn quota_of_zero_does_nothing() {
        let mut engine = ScriptedEngine::default();
        let reference = ScriptedNet::new("ref");
        let candidate = ScriptedNet::new("new");
        let settings = settings();
        let mut state = state(0);
        let mut sink = DataSink::new(Vec::new());

        let report = Curator::new(&mut engine, &reference, &candidate, &settings, 0.01)
            .add_positions(&mut state, &mut sink)
            .unwrap();

        assert_eq!(report, CurationReport::default());
        assert!(sink_text(sink).is_empty());
    }
}
