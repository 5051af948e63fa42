//! Converts MapReduce application names to actual application code.
//!
//! # Example
//!
//! To get the word count application:
//! ```
//! # use anyhow::Result;
//! use mrstream::workload;
//! # fn main() -> Result<()> {
//! let wc = workload::named("wc", &[])?;
//! let grep = workload::named("grep", &["--term".to_string(), "cat".to_string()])?;
//! # Ok(())
//! # }
//! ```

use anyhow::{bail, Result};
use bytes::Bytes;

use crate::{Emitter, KeyValue, MapReduceJob};

pub mod grep;
pub mod vertex_degree;
pub mod wc;

/// Every name [`named`] knows.
pub const NAMES: &[&str] = &["wc", "grep", "vertex-degree"];

/// A resolved application, ready to be run by the engine.
#[derive(Clone)]
pub enum Workload {
    WordCount(wc::WordCount),
    Grep(grep::Grep),
    VertexDegree(vertex_degree::VertexDegree),
}

impl MapReduceJob for Workload {
    fn map(&mut self, kv: KeyValue, emitter: &mut dyn Emitter) -> Result<()> {
        match self {
            Workload::WordCount(job) => job.map(kv, emitter),
            Workload::Grep(job) => job.map(kv, emitter),
            Workload::VertexDegree(job) => job.map(kv, emitter),
        }
    }

    fn map_final(&mut self, emitter: &mut dyn Emitter) -> Result<()> {
        match self {
            Workload::WordCount(job) => job.map_final(emitter),
            Workload::Grep(job) => job.map_final(emitter),
            Workload::VertexDegree(job) => job.map_final(emitter),
        }
    }

    fn reduce(&mut self, key: Bytes, values: Vec<Bytes>, emitter: &mut dyn Emitter) -> Result<()> {
        match self {
            Workload::WordCount(job) => job.reduce(key, values, emitter),
            Workload::Grep(job) => job.reduce(key, values, emitter),
            Workload::VertexDegree(job) => job.reduce(key, values, emitter),
        }
    }
}

/// Gets the [`Workload`] named `name`, configured with `args`.
///
/// Returns [`None`] if no application with the given name was found.
pub fn try_named(name: &str, args: &[String]) -> Option<Result<Workload>> {
    let workload = match name {
        "wc" => wc::WordCount::from_args(args).map(Workload::WordCount),
        "grep" => grep::Grep::from_args(args).map(Workload::Grep),
        "vertex-degree" => Ok(Workload::VertexDegree(vertex_degree::VertexDegree)),
        _ => return None,
    };
    Some(workload)
}

/// Gets the [`Workload`] named `name`, configured with `args`.
///
/// Returns an [`anyhow::Error`] if no application with the given name was
/// found or its arguments do not parse.
pub fn named(name: &str, args: &[String]) -> Result<Workload> {
    match try_named(name, args) {
        Some(app) => app,
        None => bail!("No app named `{}` found. Known apps: {}", name, NAMES.join(", ")),
    }
}
