use std::{fs::File, io::BufReader, path::PathBuf};

use anyhow::Context;
use bgnet::benchmark::{for_each_record_strict, BenchmarkRecord};
use structopt::StructOpt;

#[derive(StructOpt)]
pub struct ValidateBenchmarkOptions {
    #[structopt(required = true)]
    pub input: PathBuf,
}

#[derive(Default)]
struct Counts {
    cube: usize,
    moves: usize,
    alternatives: usize,
    cached: usize,
    other: usize,
}

impl ValidateBenchmarkOptions {
    pub fn run(&self) -> anyhow::Result<()> {
        let file = File::open(&self.input).with_context(|| format!("Failed to open {}", self.input.display()))?;

        let mut counts = Counts::default();
        let mut version = None;

        for_each_record_strict(BufReader::new(file), |_, record| {
            match &record {
                BenchmarkRecord::Cube { .. } => counts.cube += 1,
                BenchmarkRecord::Move { moves, .. } => {
                    counts.moves += 1;
                    counts.alternatives += moves.len();
                }
                BenchmarkRecord::CachedEval { .. } => counts.cached += 1,
                BenchmarkRecord::Version(_) => version = record.version().map(str::to_string),
                _ => counts.other += 1,
            }
            Ok(())
        })
        .with_context(|| format!("Invalid benchmark {}", self.input.display()))?;

        println!("# [Validated {}]", self.input.display());
        println!("Cube Records           : {}", counts.cube);
        println!("Move Records           : {}", counts.moves);
        if counts.moves > 0 {
            println!("Moves / Record         : {:.2}", counts.alternatives as f64 / counts.moves as f64);
        }
        println!("Cached Evaluations     : {}", counts.cached);
        println!("Other Records          : {}", counts.other);
        if let Some(version) = version {
            println!("Engine Version         : {version}");
        }

        Ok(())
    }
}
