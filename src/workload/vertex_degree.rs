//! A MapReduce-compatible application that computes the
//! degree of each vertex in a graph, given a list of edges.
//!

use anyhow::{anyhow, Result};
use bytes::Bytes;

use crate::protocol::{Protocol, TsvProtocol};
use crate::utils::string_from_bytes;
use crate::{Emitter, KeyValue, MapReduceJob};

fn parse_line(line: &str) -> Result<(u64, u64)> {
    let mut iter = line.split_whitespace().take(2);
    let a = iter
        .next()
        .ok_or_else(|| anyhow!("Invalid input file format"))?
        .parse()?;
    let b = iter
        .next()
        .ok_or_else(|| anyhow!("Invalid input file format"))?
        .parse()?;
    Ok((a, b))
}

#[derive(Debug, Default, Clone, Copy)]
pub struct VertexDegree;

impl MapReduceJob for VertexDegree {
    fn map(&mut self, kv: KeyValue, emitter: &mut dyn Emitter) -> Result<()> {
        let line = string_from_bytes(kv.value)?;
        if line.trim().is_empty() {
            return Ok(());
        }
        let (a, b) = parse_line(&line)?;
        for vertex in [a, b] {
            let out = TsvProtocol.marshal(&vertex, &1u64)?;
            emitter.emit(&out.key, &out.value)?;
        }
        Ok(())
    }

    fn reduce(&mut self, key: Bytes, values: Vec<Bytes>, emitter: &mut dyn Emitter) -> Result<()> {
        if values.is_empty() {
            return Ok(());
        }
        let vertex: u64 = Protocol::<u64, u64>::unmarshal_key(&TsvProtocol, &key)?;
        let degrees = Protocol::<u64, u64>::unmarshal_values(&TsvProtocol, &values);
        let out = TsvProtocol.marshal(&vertex, &degrees.into_iter().sum::<u64>())?;
        emitter.emit(&out.key, &out.value)?;
        Ok(())
    }
}
