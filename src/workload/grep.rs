//! A MapReduce-compatible implementation of `grep`.
//!

use anyhow::Result;
use bytes::Bytes;
use clap::Parser;

use crate::{Emitter, KeyValue, MapReduceJob};

#[derive(Parser, Debug)]
#[clap(no_binary_name = true)]
struct Args {
    #[clap(short, long, value_parser)]
    term: String,
}

/// Collects every input line containing `term` under the key `term`.
#[derive(Debug, Clone)]
pub struct Grep {
    term: String,
}

impl Grep {
    pub fn new(term: impl Into<String>) -> Self {
        Self { term: term.into() }
    }

    pub fn from_args(args: &[String]) -> Result<Self> {
        let args = Args::try_parse_from(args)?;
        Ok(Self::new(args.term))
    }
}

impl MapReduceJob for Grep {
    fn map(&mut self, kv: KeyValue, emitter: &mut dyn Emitter) -> Result<()> {
        let line = String::from_utf8_lossy(&kv.value);
        if line.contains(&self.term) {
            emitter.emit(self.term.as_bytes(), &kv.value)?;
        }
        Ok(())
    }

    fn reduce(&mut self, key: Bytes, values: Vec<Bytes>, emitter: &mut dyn Emitter) -> Result<()> {
        for value in values {
            emitter.emit(&key, &value)?;
        }
        Ok(())
    }
}
