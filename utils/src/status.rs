use std::path::PathBuf;

use anyhow::Context;
use bgnet::data::{AddSchedule, CurationState};
use structopt::StructOpt;

#[derive(StructOpt)]
pub struct StatusOptions {
    #[structopt(required = true)]
    pub input: PathBuf,
    /// Quota of every cycle after the initial ones.
    #[structopt(long, default_value = "5000")]
    pub per_cycle: usize,
}

impl StatusOptions {
    pub fn run(&self) -> anyhow::Result<()> {
        let schedule = AddSchedule { per_cycle: self.per_cycle, ..Default::default() };

        let state = CurationState::resume_file(&self.input, &schedule)
            .with_context(|| format!("Failed to scan {}", self.input.display()))?;

        println!("# [Status of {}]", self.input.display());
        println!("Cycle                  : {}", state.cycle);
        println!("Positions To Add       : {}", state.to_add);
        println!("Unique Positions       : {}", state.seen.len());

        if state.cycle_fresh(&schedule) {
            println!("Cycle has not started adding positions");
        }

        Ok(())
    }
}
