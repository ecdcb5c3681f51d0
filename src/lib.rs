pub mod audit;
pub mod benchmark;
pub mod cube;
pub mod curator;
pub mod data;
pub mod engine;
pub mod logger;
pub mod moves;
pub mod pipeline;
pub mod position;
pub mod trainer;
pub mod util;

#[cfg(test)]
mod testing;

pub use engine::{DataTrainer, Engine};
pub use pipeline::{Pipeline, PipelineSettings};
