use std::fmt::Display;

use crate::util::format_time;

pub fn ansi<T: Display, U: Display>(x: T, y: U) -> String {
    format!("\x1b[{y}m{x}\x1b[0m")
}

const NUM_CS: u8 = 36;

pub fn report_check(cycle: usize, mean: f32, max: f32, seconds: f64, positions: usize) {
    let rate = positions as f64 / seconds.max(0.00001);

    println!(
        "cycle {} | eqerr {} | max {} | {} ({} pos/sec)",
        ansi(cycle, NUM_CS),
        ansi(format!("{mean:.5}"), NUM_CS),
        ansi(format!("{max:.5}"), NUM_CS),
        ansi(format_time(seconds), NUM_CS),
        ansi(format!("{rate:.0}"), NUM_CS),
    );
}

pub fn report_pass(cycle: usize, alpha: f32, positions: usize, seconds: f64) {
    println!(
        "cycle {} | training ({}) | {} positions in {}",
        ansi(cycle, NUM_CS),
        ansi(format!("{alpha:.3}"), 35),
        ansi(positions, NUM_CS),
        ansi(format_time(seconds), NUM_CS),
    );
}

pub fn report_saved(path: impl Display, mean: f32, max: f32) {
    println!(
        "saving net as best: {} (eqerr {}, max {})",
        ansi(path, "32;1"),
        ansi(format!("{mean:.5}"), NUM_CS),
        ansi(format!("{max:.5}"), NUM_CS),
    );
}

pub fn report_bottom(count: usize, seconds: f64) {
    println!("  Hit bottom {} after {}", ansi(count, 31), ansi(format_time(seconds), NUM_CS));
}

pub fn report_added(added: usize, to_go: usize, games: usize) {
    println!(
        "added {} positions in {} games, {} to go",
        ansi(added, "32;1"),
        ansi(games, NUM_CS),
        ansi(to_go, NUM_CS),
    );
}

pub fn report_benchmark(name: impl Display, moves: f32, double: f32, take: f32) {
    println!(
        "{} | move {} | cube {} {}",
        ansi(name, "34;1"),
        ansi(format!("{moves:.6}"), NUM_CS),
        ansi(format!("{double:.6}"), NUM_CS),
        ansi(format!("{take:.6}"), NUM_CS),
    );
}
