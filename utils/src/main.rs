mod benchmark;
mod data;
mod status;

use structopt::StructOpt;

#[derive(StructOpt)]
#[structopt(name = "bgnet-utils", about = "Inspect training data and benchmark files")]
pub enum Options {
    /// Parse a training data file and report its contents.
    ValidateData(data::ValidateDataOptions),
    /// Parse a benchmark file and count its records.
    ValidateBenchmark(benchmark::ValidateBenchmarkOptions),
    /// Curation progress a run would resume from.
    Status(status::StatusOptions),
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Options::from_args() {
        Options::ValidateData(options) => options.run(),
        Options::ValidateBenchmark(options) => options.run(),
        Options::Status(options) => options.run(),
    }
}
