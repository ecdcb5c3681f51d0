use crate::{
    engine::{Dice, Engine, EngineResult, Evaluation, PositionClass, PositionKey},
    position::Board,
};

/// Key of the same position with the other side on roll.
pub fn swap_sides_key<E: Engine>(engine: &E, key: &PositionKey) -> EngineResult<PositionKey> {
    let board = engine.board_from_key(key)?;
    engine.key_of_board(&board.swap_sides())
}

pub fn game_on<E: Engine>(engine: &E, board: &Board) -> bool {
    engine.classify(board) != PositionClass::Over
}

/// Legal moves for `dice`, each as the position with the opponent on roll.
/// When there are more than `n` of them only the best `n` under the prune
/// evaluator are kept, best (lowest opponent equity) first.
pub fn prune_best_moves<E: Engine>(
    engine: &E,
    net: &E::Net,
    board: &Board,
    dice: Dice,
    n: usize,
) -> EngineResult<Vec<PositionKey>> {
    let moves = engine.moves(board, dice)?;

    if moves.len() <= n {
        return moves.iter().map(|m| swap_sides_key(engine, m)).collect();
    }

    let mut scored = Vec::with_capacity(moves.len());

    for m in &moves {
        let after = engine.board_from_key(m)?.swap_sides();
        let equity = engine.probs(net, &after, Evaluation::Prune)?.equity();
        scored.push((engine.key_of_board(&after)?, equity));
    }

    // stable, so earlier moves win ties
    scored.sort_by(|a, b| a.1.total_cmp(&b.1));
    scored.truncate(n);

    Ok(scored.into_iter().map(|(key, _)| key).collect())
}

/// When hunting positions of `target` class, whether self-play from `board`
/// can stop: the game has moved past the target class.
pub fn stop_game<E: Engine>(engine: &E, board: &Board, target: PositionClass) -> bool {
    engine.classify(board) > target
}
