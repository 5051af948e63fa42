//! Drives one map pass or one grouped reduce pass over a stream.

use std::io::BufRead;

use anyhow::Result;
use bytes::Bytes;
use itertools::Itertools;
use tracing::debug;

use crate::codec::{KeyValueLines, ValueLines};
use crate::{Emitter, MapReduceJob};

/// Calls `job.map` on every value-only line of `input`.
///
/// Does not run the finalization step, see [`run_map_final`].
pub fn run_map_phase<J, R>(job: &mut J, input: R, emitter: &mut dyn Emitter) -> Result<()>
where
    J: MapReduceJob + ?Sized,
    R: BufRead,
{
    let mut records = 0u64;
    for kv in ValueLines::new(input) {
        job.map(kv, emitter)?;
        records += 1;
    }
    debug!("map phase consumed {} records", records);
    Ok(())
}

/// Runs the end-of-phase step of one map worker.
pub fn run_map_final<J>(job: &mut J, emitter: &mut dyn Emitter) -> Result<()>
where
    J: MapReduceJob + ?Sized,
{
    job.map_final(emitter)
}

/// Calls `job.reduce` once per run of equal keys in `input`, which must
/// already be sorted by key.
///
/// When the stream holds no records at all, `reduce` is still called once
/// with an empty key and no values.
pub fn run_reduce_phase<J, R>(job: &mut J, input: R, emitter: &mut dyn Emitter) -> Result<()>
where
    J: MapReduceJob + ?Sized,
    R: BufRead,
{
    let mut groups = 0u64;
    for (key, group) in &KeyValueLines::new(input).chunk_by(|kv| kv.key()) {
        let values: Vec<Bytes> = group.map(|kv| kv.into_value()).collect();
        job.reduce(key, values, emitter)?;
        groups += 1;
    }
    if groups == 0 {
        job.reduce(Bytes::new(), Vec::new(), emitter)?;
    }
    debug!("reduce phase produced {} groups", groups);
    Ok(())
}
