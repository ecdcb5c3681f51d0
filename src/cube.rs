use crate::{
    engine::{CubeAction, CubeDecision, Engine, EngineResult, Score},
    position::{Board, Probs},
};

/// Number of bisection steps of the proportional cube error search.
pub const PROPORTIONAL_ITERATIONS: usize = 3;

const BATTERY_BASE: [(u8, u8); 18] = [
    (7, 7),
    (3, 3),
    (5, 5),
    (9, 9),
    (25, 25),
    (2, 3),
    (2, 4),
    (2, 5),
    (2, 6),
    (2, 7),
    (3, 4),
    (3, 5),
    (3, 6),
    (3, 7),
    (4, 5),
    (4, 6),
    (4, 7),
    (5, 7),
];

/// Match scores a cube decision is checked at: the symmetric scores and both
/// orientations of each asymmetric one.
pub fn score_battery() -> Vec<Score> {
    let mut scores = Vec::with_capacity(2 * BATTERY_BASE.len());

    for (x, o) in BATTERY_BASE {
        scores.push(Score::Away(x, o));
        if x != o {
            scores.push(Score::Away(o, x));
        }
    }

    scores
}

/// Equity of taking `action` in the position analysed by `info`.
pub fn match_equity(info: &CubeDecision, action: &CubeAction) -> f32 {
    if !action.double {
        info.no_double
    } else if action.take {
        info.double_take
    } else {
        info.double_pass
    }
}

/// Equity lost by playing the cube action `wrong` where `right` analyses the
/// position with the correct probabilities.
pub fn action_error(right: &CubeDecision, wrong: &CubeAction) -> f32 {
    (match_equity(right, &right.action) - match_equity(right, wrong)).abs()
}

/// Equity gap between `net_probs` and `ref_probs`, scaled by how far towards
/// `ref_probs` one has to move before the cube action agrees with
/// `ref_action`. The blend factor is refined by a fixed number of halvings.
pub fn proportional_error<E: Engine>(
    engine: &E,
    net: &E::Net,
    board: &Board,
    score: Score,
    net_probs: &Probs,
    ref_probs: &Probs,
    ref_action: &CubeAction,
) -> EngineResult<f32> {
    let err = (ref_probs.equity() - net_probs.equity()).abs();

    let mut a_net = 0.0;
    let mut a_ref = 1.0;

    for _ in 0..PROPORTIONAL_ITERATIONS {
        let a = (a_net + a_ref) / 2.0;
        let blended = net_probs.blend(ref_probs, a);

        let decision = engine.cube_decision(net, board, score, Some(&blended))?;

        if decision.action == *ref_action {
            a_ref = a;
        } else {
            a_net = a;
        }
    }

    Ok(err * a_ref)
}

/// A score at which the two probability vectors lead to different cube
/// actions.
#[derive(Clone, Copy, Debug)]
pub struct CubeDisagreement {
    pub score: Score,
    pub net: CubeDecision,
    pub reference: CubeDecision,
    pub proportional_error: f32,
}

/// First score of `scores` whose disagreement is at least `min_error` after
/// the proportional search.
pub fn find_disagreement<E: Engine>(
    engine: &E,
    net: &E::Net,
    board: &Board,
    scores: &[Score],
    net_probs: &Probs,
    ref_probs: &Probs,
    min_error: f32,
) -> EngineResult<Option<CubeDisagreement>> {
    for &score in scores {
        let di = engine.cube_decision(net, board, score, Some(net_probs))?;
        let rdi = engine.cube_decision(net, board, score, Some(ref_probs))?;

        if di.action == rdi.action {
            continue;
        }

        let proportional_error = proportional_error(engine, net, board, score, net_probs, ref_probs, &rdi.action)?;

        if proportional_error >= min_error {
            return Ok(Some(CubeDisagreement { score, net: di, reference: rdi, proportional_error }));
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{board_with, ScriptedEngine, ScriptedNet};

    #[test]
    fn battery_has_both_orientations() {
        let scores = score_battery();
        assert_eq!(scores.len(), 5 + 2 * 13);
        assert_eq!(scores[0], Score::MONEY_EQUIVALENT);
        assert!(scores.contains(&Score::Away(4, 7)));
        assert!(scores.contains(&Score::Away(7, 4)));
    }

    #[test]
    fn match_equity_follows_action() {
        let info = CubeDecision { action: CubeAction::default(), no_double: 0.1, double_take: 0.2, double_pass: 1.0 };

        let nd = CubeAction { double: false, take: true, too_good: false };
        let dt = CubeAction { double: true, take: true, too_good: false };
        let dp = CubeAction { double: true, take: false, too_good: false };

        assert_eq!(match_equity(&info, &nd), 0.1);
        assert_eq!(match_equity(&info, &dt), 0.2);
        assert_eq!(match_equity(&info, &dp), 1.0);
    }

    #[test]
    fn proportional_search_three_halvings() {
        let engine = ScriptedEngine::default();
        let net = ScriptedNet::new("n");
        let board = board_with(3, 2);

        // equities 0.2 and 0.44; the scripted doubling point is 0.3 at money
        let p_net = Probs([0.6, 0.0, 0.0, 0.0, 0.0]);
        let p_ref = Probs([0.72, 0.0, 0.0, 0.0, 0.0]);

        let rdi = engine.cube_decision(&net, &board, Score::Money, Some(&p_ref)).unwrap();
        let err = proportional_error(&engine, &net, &board, Score::Money, &p_net, &p_ref, &rdi.action).unwrap();

        // a = 0.5 agrees, 0.25 and 0.375 do not
        assert!((err - 0.24 * 0.5).abs() < 1e-5);
    }

    #[test]
    fn agreement_everywhere_is_no_disagreement() {
        let engine = ScriptedEngine::default();
        let net = ScriptedNet::new("n");
        let board = board_with(3, 2);
        let p = Probs([0.6, 0.05, 0.0, 0.05, 0.0]);

        let found = find_disagreement(&engine, &net, &board, &score_battery(), &p, &p, 0.0).unwrap();
        assert!(found.is_none());

        let q = Probs([0.75, 0.05, 0.0, 0.05, 0.0]);
        let found = find_disagreement(&engine, &net, &board, &score_battery(), &p, &q, 0.001).unwrap();
        assert!(found.is_some());
    }
}
