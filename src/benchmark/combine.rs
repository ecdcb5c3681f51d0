//! Merge moves found by a later analysis into an existing benchmark.
//!
//! An update benchmark holds an `o <move> <probs>` record after each
//! `r <seed>` line: a move and its probabilities as seen by the opponent. A
//! move record of the main benchmark that follows the same seed gains that
//! move when it is legal there and not listed yet. The merged record is
//! preceded by a `#R` line holding the update.

use std::{
    collections::HashMap,
    io::{BufRead, Write},
};

use log::warn;

use super::{for_each_record_strict, BenchmarkError, BenchmarkRecord};
use crate::{
    data::DataError,
    engine::{Dice, Engine, PositionKey},
    moves::swap_sides_key,
    position::Probs,
};

#[derive(Clone, Debug, PartialEq)]
pub struct MoveUpdate {
    pub key: PositionKey,
    pub probs: Probs,
}

impl MoveUpdate {
    fn to_line(&self) -> String {
        let probs: Vec<String> = self.probs.0.iter().map(f32::to_string).collect();
        format!("#R {} {}", self.key, probs.join(" "))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CombineReport {
    pub move_records: usize,
    pub combined: usize,
}

fn parse_error(line: usize, message: impl Into<String>) -> BenchmarkError {
    DataError::Parse { line, message: message.into() }.into()
}

/// Move updates of an update benchmark, keyed by seed.
pub fn read_updates<R: BufRead>(reader: R) -> Result<HashMap<String, MoveUpdate>, BenchmarkError> {
    let mut updates = HashMap::new();
    let mut seed = None;

    for_each_record_strict(reader, |n, record| {
        match record {
            BenchmarkRecord::Seed(s) => seed = Some(s),
            BenchmarkRecord::Cube { key, probs } => {
                let Some(s) = seed.clone() else {
                    return Err(parse_error(n, "update before any seed"));
                };

                if updates.contains_key(&s) {
                    return Err(parse_error(n, format!("second update for seed {s}")));
                }

                updates.insert(s, MoveUpdate { key, probs });
            }
            BenchmarkRecord::Move { .. } => return Err(parse_error(n, "move record in an update benchmark")),
            _ => {}
        }

        Ok(())
    })?;

    Ok(updates)
}

/// Copy `main` to `out`, folding in the updates of matching seeds.
pub fn combine<E: Engine, R: BufRead, W: Write>(
    engine: &E,
    main: R,
    updates: &HashMap<String, MoveUpdate>,
    mut out: W,
) -> Result<CombineReport, BenchmarkError> {
    let mut report = CombineReport::default();
    let mut pending = None;

    for (n, line) in main.lines().enumerate() {
        let line = line?;

        match BenchmarkRecord::parse(&line) {
            Ok(Some(BenchmarkRecord::Seed(seed))) => pending = updates.get(&seed),
            Ok(Some(BenchmarkRecord::Move { key, dice, moves })) => {
                report.move_records += 1;

                if let Some(update) = pending {
                    if let Some(merged) = merge(engine, n + 1, &key, dice, &moves, update)? {
                        writeln!(out, "{}", update.to_line())?;
                        writeln!(out, "{merged}")?;
                        report.combined += 1;
                        continue;
                    }
                }
            }
            _ => {}
        }

        let line = line.trim();
        if !line.is_empty() {
            writeln!(out, "{line}")?;
        }
    }

    out.flush()?;

    Ok(report)
}

/// Move record line with `update` ranked among the listed moves, or `None`
/// when the update is already listed or is not a legal move here.
fn merge<E: Engine>(
    engine: &E,
    line: usize,
    key: &PositionKey,
    dice: Dice,
    moves: &[(PositionKey, f32)],
    update: &MoveUpdate,
) -> Result<Option<String>, BenchmarkError> {
    let Some((first, rest)) = moves.split_first() else {
        return Ok(None);
    };

    if moves.iter().any(|(k, _)| *k == update.key) {
        return Ok(None);
    }

    let board = match engine.board_from_key(key) {
        Ok(board) => board,
        Err(e) => {
            warn!("benchmark line {line}: {e}, not combined");
            return Ok(None);
        }
    };

    let mut legal = false;
    for m in engine.moves(&board, dice)? {
        if swap_sides_key(engine, &m)? == update.key {
            legal = true;
            break;
        }
    }

    if !legal {
        return Ok(None);
    }

    // best move carries its equity, the others their loss against it
    let best = first.1;
    let mut ranked = vec![first.clone()];
    ranked.extend(rest.iter().map(|(k, loss)| (k.clone(), best - loss)));
    ranked.push((update.key.clone(), -update.probs.equity()));
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    let (top, top_equity) = &ranked[0];
    let mut merged = format!("m {key} {} {} {top} {top_equity:.7}", dice.0, dice.1);

    for (k, equity) in &ranked[1..] {
        merged.push_str(&format!(" {k} {:.7}", top_equity - equity));
    }

    Ok(Some(merged))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::testing::{board_with, ScriptedEngine};

    const UPDATES: &str = "s gnubg version 1.0\nr 17\no NEW 0.35 0.1 0.0 0.1 0.0\n# ply 2\nr 19\no ALT 0.5 0.1 0.0 0.1 0.0\n";

    fn engine() -> ScriptedEngine {
        let mut engine = ScriptedEngine::default();
        let from = board_with(1, 2);
        engine.name("POSA", from);

        let new = board_with(3, 2);
        let old = board_with(4, 2);
        engine.name("NEW", new.swap_sides());
        engine.name("OLD", old.swap_sides());

        let played = vec![engine.key_of_board(&new).unwrap(), engine.key_of_board(&old).unwrap()];
        engine.set_moves(&from, Dice(3, 1), played);
        engine
    }

    #[test]
    fn updates_keyed_by_seed() {
        let updates = read_updates(Cursor::new(UPDATES)).unwrap();

        assert_eq!(updates.len(), 2);
        assert_eq!(updates["17"].key.as_str(), "NEW");
        assert_eq!(updates["19"].probs, Probs([0.5, 0.1, 0.0, 0.1, 0.0]));
    }

    #[test]
    fn malformed_update_files() {
        assert!(read_updates(Cursor::new("o NEW 0.35 0.1 0.0 0.1 0.0\n")).is_err());
        assert!(read_updates(Cursor::new("r 1\no A 0.5 0 0 0 0\no B 0.5 0 0 0 0\n")).is_err());
        assert!(read_updates(Cursor::new("r 1\nm POS 3 1 A 0.1 B 0.2\n")).is_err());
    }

    #[test]
    fn legal_new_moves_are_ranked_in() {
        let engine = engine();
        let updates = read_updates(Cursor::new(UPDATES)).unwrap();

        let main = "s gnubg version 1.0\n\
                    r 17\n\
                    m POSA 3 1 OLD 0.2 ALT 0.05\n\
                    r 18\n\
                    m POSA 3 1 OLD 0.2 ALT 0.05\n\
                    r 19\n\
                    m POSA 3 1 OLD 0.2 ALT 0.05\n";

        let mut out = Vec::new();
        let report = combine(&engine, Cursor::new(main), &updates, &mut out).unwrap();
        assert_eq!(report, CombineReport { move_records: 3, combined: 1 });

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 8);
        assert_eq!(lines[2], "#R NEW 0.35 0.1 0 0.1 0");

        let BenchmarkRecord::Move { moves, .. } = BenchmarkRecord::parse(lines[3]).unwrap().unwrap() else {
            panic!("expected a move record: {}", lines[3]);
        };

        let names: Vec<&str> = moves.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, ["NEW", "OLD", "ALT"]);
        assert!((moves[0].1 - 0.3).abs() < 1e-5);
        assert!((moves[1].1 - 0.1).abs() < 1e-5);
        assert!((moves[2].1 - 0.15).abs() < 1e-5);

        // no update for seed 18, and seed 19's move is already listed
        assert_eq!(lines[5], "m POSA 3 1 OLD 0.2 ALT 0.05");
        assert_eq!(lines[7], "m POSA 3 1 OLD 0.2 ALT 0.05");
    }

    #[test]
    fn illegal_update_is_left_out() {
        let engine = engine();
        let updates = read_updates(Cursor::new("r 5\no ELSEWHERE 0.9 0.1 0.0 0.1 0.0\n")).unwrap();

        let main = "r 5\nm POSA 3 1 OLD 0.2 ALT 0.05\n";
        let mut out = Vec::new();
        let report = combine(&engine, Cursor::new(main), &updates, &mut out).unwrap();

        assert_eq!(report.combined, 0);
        assert_eq!(String::from_utf8(out).unwrap(), main);
    }
}
