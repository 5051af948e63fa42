use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::standalone::Config;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Run the mapper on standard input
    #[arg(long)]
    pub mapper: bool,

    /// Run the reducer on sorted standard input
    #[arg(long)]
    pub reducer: bool,

    /// Run the full map/reduce pipeline locally
    #[arg(long)]
    pub mapreduce: bool,

    /// Number of partitions the map output is split into
    #[arg(long, default_value_t = 1)]
    pub partitions: u32,

    /// Number of concurrent map workers
    #[arg(long, default_value_t = 4)]
    pub mappers: usize,

    /// Number of concurrent sort/reduce workers
    #[arg(long, default_value_t = 4)]
    pub reducers: usize,

    /// Name of the workload
    #[arg(short, long, default_value = "wc")]
    pub workload: String,

    /// Directory for temporary and output files
    #[arg(long, default_value = ".")]
    pub work_dir: PathBuf,

    /// External program used to sort each partition
    #[arg(long, default_value = "sort")]
    pub sort_program: String,

    /// More logging on standard error (-v, -vv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Input files for --mapreduce; standard input when none are given
    pub inputs: Vec<PathBuf>,

    /// Auxiliary arguments to pass to the MapReduce application.
    #[clap(value_parser, last = true)]
    pub args: Vec<String>,
}

impl Args {
    pub fn config(&self) -> Config {
        Config {
            map: self.mapper,
            reduce: self.reducer,
            mapreduce: self.mapreduce,
            partitions: self.partitions,
            mappers: self.mappers,
            reducers: self.reducers,
            inputs: self.inputs.clone(),
            work_dir: self.work_dir.clone(),
            sort_program: self.sort_program.clone(),
            ..Config::default()
        }
    }

    /// Default log filter when `RUST_LOG` is not set.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}
