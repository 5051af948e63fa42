//! A MapReduce-compatible implementation of word count.
//!

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use bytes::Bytes;
use clap::Parser;

use crate::protocol::{JsonProtocol, Protocol};
use crate::{reporter, Emitter, KeyValue, MapReduceJob};

#[derive(Parser, Debug)]
#[clap(no_binary_name = true)]
struct Args {
    /// How counts are decoded in reduce.
    #[clap(long, default_value = "json", value_parser = ["json", "wc"])]
    proto: String,
}

/// Words are raw keys, counts are decimal values.
#[derive(Debug, Default, Clone, Copy)]
pub struct WordCountProtocol;

impl Protocol<String, u64> for WordCountProtocol {
    fn marshal(&self, key: &String, value: &u64) -> Result<KeyValue> {
        Ok(KeyValue::new(key.clone(), value.to_string()))
    }

    fn unmarshal_key(&self, key: &[u8]) -> Result<String> {
        Ok(String::from_utf8(key.to_vec())?)
    }

    fn unmarshal_values(&self, values: &[Bytes]) -> Vec<u64> {
        values
            .iter()
            .filter_map(|v| std::str::from_utf8(v).ok()?.trim().parse().ok())
            .collect()
    }
}

#[derive(Clone)]
pub struct WordCount {
    protocol: Arc<dyn Protocol<String, u64> + Send + Sync>,
    // Shared by every clone so the finalization step sees all workers' words.
    mapped_words: Arc<AtomicU64>,
}

impl Default for WordCount {
    fn default() -> Self {
        Self::new(JsonProtocol)
    }
}

impl WordCount {
    pub fn new<P>(protocol: P) -> Self
    where
        P: Protocol<String, u64> + Send + Sync + 'static,
    {
        Self {
            protocol: Arc::new(protocol),
            mapped_words: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn from_args(args: &[String]) -> Result<Self> {
        let args = Args::try_parse_from(args)?;
        Ok(match args.proto.as_str() {
            "wc" => Self::new(WordCountProtocol),
            _ => Self::new(JsonProtocol),
        })
    }

    /// Words seen by `map` so far, across all clones.
    pub fn mapped_words(&self) -> u64 {
        self.mapped_words.load(Ordering::Relaxed)
    }
}

impl MapReduceJob for WordCount {
    fn map(&mut self, kv: KeyValue, emitter: &mut dyn Emitter) -> Result<()> {
        let line = String::from_utf8_lossy(&kv.value).to_lowercase();
        let mut words = 0;
        for word in line.split_whitespace() {
            emitter.emit(word.as_bytes(), b"1")?;
            words += 1;
        }
        self.mapped_words.fetch_add(words, Ordering::Relaxed);
        Ok(())
    }

    fn map_final(&mut self, _emitter: &mut dyn Emitter) -> Result<()> {
        let mapped = self.mapped_words();
        reporter::status(format!("finished -- mapped {}", mapped));
        reporter::incr_counter("Program", "mapped words", mapped as i64);
        Ok(())
    }

    fn reduce(&mut self, key: Bytes, values: Vec<Bytes>, emitter: &mut dyn Emitter) -> Result<()> {
        // Nothing to count, e.g. an empty partition.
        if values.is_empty() {
            return Ok(());
        }
        let count: u64 = self.protocol.unmarshal_values(&values).into_iter().sum();
        emitter.emit(&key, count.to_string().as_bytes())?;
        Ok(())
    }
}
