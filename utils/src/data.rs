use std::{
    collections::HashSet,
    fs::File,
    io::{BufRead, BufReader},
    path::PathBuf,
    time::Instant,
};

use anyhow::{bail, Context};
use bgnet::data::{cycle_marker, TrainingExample};
use log::warn;
use structopt::StructOpt;

#[derive(StructOpt)]
pub struct ValidateDataOptions {
    #[structopt(required = true)]
    pub input: PathBuf,
}

impl ValidateDataOptions {
    pub fn run(&self) -> anyhow::Result<()> {
        let timer = Instant::now();
        let file = File::open(&self.input).with_context(|| format!("Failed to open {}", self.input.display()))?;

        let mut seen = HashSet::new();
        let mut examples = 0;
        let mut duplicates = 0;
        let mut markers = Vec::new();

        for (n, line) in BufReader::new(file).lines().enumerate() {
            let line = line.with_context(|| "Failed to read data file.")?;

            if let Some(cycle) = cycle_marker(&line) {
                markers.push(cycle);
                continue;
            }

            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }

            let example = match TrainingExample::parse(&line) {
                Ok(example) => example,
                Err(message) => bail!("line {}: {message}", n + 1),
            };

            if !seen.insert(example.key.clone()) {
                warn!("line {}: duplicate key {}", n + 1, example.key);
                duplicates += 1;
            }

            examples += 1;
        }

        println!("# [Validated {}]", self.input.display());
        println!("Examples               : {examples}");
        println!("Unique Positions       : {}", seen.len());
        println!("Duplicates             : {duplicates}");
        println!("Cycle Markers          : {}", markers.len());

        if let (Some(first), Some(last)) = (markers.first(), markers.last()) {
            println!("Cycles                 : {first}..={last}");
        }

        println!("Took {:.2} seconds", timer.elapsed().as_secs_f32());

        Ok(())
    }
}
