//! The standalone pipeline: map, shuffle through an external sort, reduce,
//! all on the local machine.

use std::path::PathBuf;

use crate::error::ConfigError;

pub mod artifacts;
pub mod engine;
pub mod queue;

pub use engine::{run, run_with_stdin, RunSummary};

/// Everything a run needs to know, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Run only the map phase over standard input.
    pub map: bool,
    /// Run only the reduce phase over standard input.
    pub reduce: bool,
    /// Run the whole pipeline. Takes precedence over `map` and `reduce`.
    pub mapreduce: bool,
    pub partitions: u32,
    /// Concurrent map workers.
    pub mappers: usize,
    /// Concurrent shuffle/reduce workers.
    pub reducers: usize,
    /// Map inputs. Standard input is mapped when empty.
    pub inputs: Vec<PathBuf>,
    /// Where temporary and output files are created.
    pub work_dir: PathBuf,
    /// Distinguishes the files of concurrent runs sharing `work_dir`.
    pub run_id: u32,
    pub sort_program: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            map: false,
            reduce: false,
            mapreduce: false,
            partitions: 1,
            mappers: 4,
            reducers: 4,
            inputs: Vec::new(),
            work_dir: PathBuf::from("."),
            run_id: std::process::id(),
            sort_program: "sort".to_string(),
        }
    }
}

impl Config {
    /// Checks the settings the standalone pipeline depends on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.partitions == 0 {
            return Err(ConfigError::ZeroPartitions);
        }
        if self.mappers == 0 {
            return Err(ConfigError::ZeroWorkers { stage: "map" });
        }
        if self.reducers == 0 {
            return Err(ConfigError::ZeroWorkers { stage: "reduce" });
        }
        Ok(())
    }
}
