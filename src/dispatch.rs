//! Chooses between a single streaming phase and the standalone pipeline.

use std::io::{self, BufRead, Write};

use anyhow::Result;
use tracing::info;

use crate::emitter::DirectEmitter;
use crate::error::ConfigError;
use crate::runner::{run_map_final, run_map_phase, run_reduce_phase};
use crate::standalone::{self, Config, RunSummary};
use crate::{Emitter, MapReduceJob};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Map standard input to standard output.
    Map,
    /// Reduce sorted standard input to standard output.
    Reduce,
    /// Run the standalone pipeline.
    MapReduce,
}

impl Mode {
    pub fn resolve(config: &Config) -> Result<Mode, ConfigError> {
        if config.mapreduce {
            return Ok(Mode::MapReduce);
        }
        match (config.map, config.reduce) {
            (true, true) => Err(ConfigError::BothPhases),
            (false, false) => Err(ConfigError::NoPhase),
            (true, false) => Ok(Mode::Map),
            (false, true) => Ok(Mode::Reduce),
        }
    }
}

/// The map phase as a streaming harness runs it: every input line is
/// mapped, then the finalization step runs through the same output.
pub fn run_map_stream<J, R, W>(job: &mut J, input: R, output: W) -> Result<()>
where
    J: MapReduceJob + ?Sized,
    R: BufRead,
    W: Write,
{
    let mut emitter = DirectEmitter::new(output);
    run_map_phase(job, input, &mut emitter)?;
    run_map_final(job, &mut emitter)?;
    emitter.flush()?;
    Ok(())
}

/// The reduce phase as a streaming harness runs it over sorted input.
pub fn run_reduce_stream<J, R, W>(job: &mut J, input: R, output: W) -> Result<()>
where
    J: MapReduceJob + ?Sized,
    R: BufRead,
    W: Write,
{
    let mut emitter = DirectEmitter::new(output);
    run_reduce_phase(job, input, &mut emitter)?;
    emitter.flush()?;
    Ok(())
}

/// Runs `job` the way `config` asks for.
///
/// Returns where the output went for a standalone run, and `None` for a
/// streaming phase, whose output is standard output.
pub async fn dispatch<J>(mut job: J, config: &Config) -> Result<Option<RunSummary>>
where
    J: MapReduceJob + Clone + Send + 'static,
{
    let mode = Mode::resolve(config)?;
    info!(?mode, "dispatching");
    match mode {
        Mode::Map => {
            run_map_stream(&mut job, io::stdin().lock(), io::stdout().lock())?;
            Ok(None)
        }
        Mode::Reduce => {
            run_reduce_stream(&mut job, io::stdin().lock(), io::stdout().lock())?;
            Ok(None)
        }
        Mode::MapReduce => Ok(Some(standalone::run(&job, config).await?)),
    }
}
