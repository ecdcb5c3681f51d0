//! Table-driven engine for exercising the control loops in tests.

use std::{
    cell::RefCell,
    collections::{HashMap, HashSet, VecDeque},
    fs,
    path::{Path, PathBuf},
    rc::Rc,
};

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    data::TrainingExample,
    engine::{
        CubeAction, CubeDecision, DataTrainer, Dice, Engine, EngineError, EngineErrorKind, EngineResult, Evaluation,
        PositionClass, PositionKey, Score, TrainingErrors,
    },
    position::{Board, Probs, BOARD_SIZE},
};

/// A valid board distinguished by `n`, with `checkers` on the side on roll.
pub fn board_with(n: usize, checkers: i32) -> Board {
    let mut b = [0; BOARD_SIZE];
    b[1 + n % 23] = checkers;
    b[24 - (n / 23) % 5] = -1;
    b[25] = -((n / 115) as i32 % 14);
    Board(b)
}

/// Fresh scratch directory for tests touching the filesystem.
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("bgnet-test-{name}-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[derive(Clone, Debug, Default)]
pub struct ScriptedNet {
    pub name: String,
    pub default: Probs,
    probs: HashMap<Board, Probs>,
    evals: HashMap<(Board, Evaluation), Probs>,
    best: HashMap<Board, PositionKey>,
    best_at_ply: HashMap<(Board, u8), PositionKey>,
}

impl ScriptedNet {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string(), default: Probs([0.5, 0.1, 0.0, 0.1, 0.0]), ..Default::default() }
    }

    pub fn set(&mut self, board: &Board, probs: Probs) {
        self.probs.insert(*board, probs);
    }

    pub fn set_eval(&mut self, board: &Board, evaluation: Evaluation, probs: Probs) {
        self.evals.insert((*board, evaluation), probs);
    }

    pub fn set_best(&mut self, board: &Board, to: PositionKey) {
        self.best.insert(*board, to);
    }

    pub fn set_best_at(&mut self, board: &Board, ply: u8, to: PositionKey) {
        self.best_at_ply.insert((*board, ply), to);
    }

    fn lookup(&self, board: &Board, evaluation: Evaluation) -> Probs {
        self.evals
            .get(&(*board, evaluation))
            .or_else(|| self.probs.get(board))
            .copied()
            .unwrap_or(self.default)
    }
}

pub struct ScriptedEngine {
    classes: HashMap<Board, PositionClass>,
    named: HashMap<PositionKey, Board>,
    names: HashMap<Board, PositionKey>,
    moves: HashMap<(Board, Dice), Vec<PositionKey>>,
    unavailable: HashSet<std::mem::Discriminant<Evaluation>>,
    rolls: VecDeque<Dice>,
    rng: StdRng,
    saved: RefCell<HashMap<PathBuf, ScriptedNet>>,
    pub saves: RefCell<usize>,
    /// Score of every move choice, in call order.
    pub scores: Rc<RefCell<Vec<Score>>>,
    /// Visitation order of every training pass.
    pub orders: Rc<RefCell<Vec<Vec<usize>>>>,
}

impl Default for ScriptedEngine {
    fn default() -> Self {
        Self {
            classes: HashMap::new(),
            named: HashMap::new(),
            names: HashMap::new(),
            moves: HashMap::new(),
            unavailable: HashSet::new(),
            rolls: VecDeque::new(),
            rng: StdRng::seed_from_u64(7),
            saved: RefCell::new(HashMap::new()),
            saves: RefCell::new(0),
            scores: Rc::default(),
            orders: Rc::default(),
        }
    }
}

/// Board with no checkers left, classified as over.
pub const FINISHED: Board = Board([0; BOARD_SIZE]);

impl ScriptedEngine {
    pub fn name(&mut self, key: &str, board: Board) -> PositionKey {
        let key = PositionKey::from(key);
        self.named.insert(key.clone(), board);
        self.names.insert(board, key.clone());
        key
    }

    pub fn set_class(&mut self, board: &Board, class: PositionClass) {
        self.classes.insert(*board, class);
    }

    pub fn set_moves(&mut self, board: &Board, dice: Dice, moves: Vec<PositionKey>) {
        self.moves.insert((*board, dice.ordered()), moves);
    }

    pub fn make_unavailable(&mut self, evaluation: Evaluation) {
        self.unavailable.insert(std::mem::discriminant(&evaluation));
    }

    pub fn queue_rolls(&mut self, rolls: &[Dice]) {
        self.rolls.extend(rolls);
    }

    pub fn store(&self, path: &Path, net: ScriptedNet) {
        self.saved.borrow_mut().insert(path.to_path_buf(), net);
    }

    pub fn stored(&self, path: &Path) -> Option<ScriptedNet> {
        self.saved.borrow().get(path).cloned()
    }

    fn key(&self, board: &Board) -> PositionKey {
        if let Some(key) = self.names.get(board) {
            return key.clone();
        }
        PositionKey::new(format!("P{}", board.0.map(|c| c.to_string()).join(",")))
    }

    /// Cube action from the equity of `probs`; the doubling point moves with
    /// the score so that different scores can disagree.
    fn cube(&self, probs: &Probs, score: Score) -> CubeDecision {
        let e = probs.equity();
        let shift = match score {
            Score::Money => 0.0,
            Score::Away(x, o) => 0.01 * (f32::from(x) - f32::from(o)),
        };

        let too_good = e > 0.9;
        let action = CubeAction { double: !too_good && e >= 0.3 + shift, take: !too_good && e <= 0.5, too_good };

        CubeDecision { action, no_double: e, double_take: 2.0 * e - 0.3, double_pass: 1.0 }
    }
}

impl Engine for ScriptedEngine {
    type Net = ScriptedNet;
    type Trainer = ScriptedTrainer;

    fn key_of_board(&self, board: &Board) -> EngineResult<PositionKey> {
        Ok(self.key(board))
    }

    fn board_from_key(&self, key: &PositionKey) -> EngineResult<Board> {
        if let Some(board) = self.named.get(key) {
            return Ok(*board);
        }

        key.as_str()
            .strip_prefix('P')
            .and_then(|s| s.replace(',', " ").parse::<Board>().ok())
            .ok_or_else(|| EngineError::new(EngineErrorKind::UnknownKey, key.as_str()))
    }

    fn moves(&self, board: &Board, dice: Dice) -> EngineResult<Vec<PositionKey>> {
        Ok(self.moves.get(&(*board, dice.ordered())).cloned().unwrap_or_default())
    }

    fn best_move(
        &self,
        net: &ScriptedNet,
        board: &Board,
        _: Dice,
        ply: u8,
        score: Score,
    ) -> EngineResult<PositionKey> {
        self.scores.borrow_mut().push(score);
        let to = net.best_at_ply.get(&(*board, ply)).or_else(|| net.best.get(board));
        Ok(to.cloned().unwrap_or_else(|| self.key(&FINISHED)))
    }

    fn classify(&self, board: &Board) -> PositionClass {
        if let Some(class) = self.classes.get(board) {
            return *class;
        }

        let (x, o) = board.checkers();
        if x == 0 || o == 0 {
            PositionClass::Over
        } else {
            PositionClass::Contact
        }
    }

    fn probs(&self, net: &ScriptedNet, board: &Board, evaluation: Evaluation) -> EngineResult<Probs> {
        if self.unavailable.contains(&std::mem::discriminant(&evaluation)) {
            return Err(EngineError::new(EngineErrorKind::Unavailable, format!("{evaluation:?}")));
        }
        Ok(net.lookup(board, evaluation))
    }

    fn cube_decision(
        &self,
        net: &ScriptedNet,
        board: &Board,
        score: Score,
        probs: Option<&Probs>,
    ) -> EngineResult<CubeDecision> {
        let p = probs.copied().unwrap_or_else(|| net.lookup(board, Evaluation::Ply(0)));
        Ok(self.cube(&p, score))
    }

    fn roll(&mut self) -> Dice {
        self.rolls.pop_front().unwrap_or_else(|| Dice(self.rng.gen_range(1..=6), self.rng.gen_range(1..=6)))
    }

    fn set_seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    fn load_net(&self, path: &Path) -> EngineResult<ScriptedNet> {
        self.stored(path).ok_or_else(|| EngineError::new(EngineErrorKind::NetLoad, path.display().to_string()))
    }

    fn save_net(&self, net: &ScriptedNet, path: &Path) -> EngineResult<()> {
        fs::write(path, &net.name).map_err(|e| EngineError::new(EngineErrorKind::NetSave, e.to_string()))?;
        *self.saves.borrow_mut() += 1;
        self.store(path, net.clone());
        Ok(())
    }

    fn trainer(&self, examples: &[TrainingExample], _: bool) -> EngineResult<ScriptedTrainer> {
        let examples = examples
            .iter()
            .map(|ex| Ok((self.board_from_key(&ex.key)?, ex.probs)))
            .collect::<EngineResult<Vec<_>>>()?;

        Ok(ScriptedTrainer { examples, orders: Rc::clone(&self.orders) })
    }
}

/// Moves the network's 0-ply output towards each label by a fraction
/// proportional to alpha. Errors are reported with and without the
/// backgammon outputs; the loop picks one.
pub struct ScriptedTrainer {
    examples: Vec<(Board, Probs)>,
    orders: Rc<RefCell<Vec<Vec<usize>>>>,
}

impl DataTrainer<ScriptedNet> for ScriptedTrainer {
    fn len(&self) -> usize {
        self.examples.len()
    }

    fn errors(&self, net: &ScriptedNet) -> EngineResult<TrainingErrors> {
        let mut errors = TrainingErrors::default();

        for (board, label) in &self.examples {
            let p = net.lookup(board, Evaluation::Ply(0));
            let e = p.eq_error(label);

            let mut no_bg = *label;
            no_bg.0[2] = p.0[2];
            no_bg.0[4] = p.0[4];
            let e_no_bg = p.eq_error(&no_bg);

            errors.mean += e;
            errors.mean_no_bg += e_no_bg;
            errors.max = errors.max.max(e);
            errors.max_no_bg = errors.max_no_bg.max(e_no_bg);
        }

        if !self.examples.is_empty() {
            errors.mean /= self.examples.len() as f32;
            errors.mean_no_bg /= self.examples.len() as f32;
        }

        Ok(errors)
    }

    fn train(&mut self, net: &mut ScriptedNet, alpha: f32, order: &[usize]) -> EngineResult<()> {
        let rate = (alpha * 0.01).min(1.0);

        for &i in order {
            let (board, label) = self.examples[i];
            let p = net.lookup(&board, Evaluation::Ply(0));
            net.evals.remove(&(board, Evaluation::Ply(0)));
            net.set(&board, Probs(std::array::from_fn(|k| p.0[k] + rate * (label.0[k] - p.0[k]))));
        }

        self.orders.borrow_mut().push(order.to_vec());
        Ok(())
    }
}
