//! A local MapReduce (lite) execution engine.
//!
//! Users supply a computation (map, a per-mapper finalization step and
//! reduce) and run it either one phase at a time behind a streaming
//! harness, or as a complete standalone pipeline that partitions,
//! shuffles through an external sort, and reduces across a bounded pool
//! of workers on a single machine.

use bytes::Bytes;

pub mod cmd;
pub mod codec;
pub mod dispatch;
pub mod emitter;
pub mod error;
pub mod protocol;
pub mod reporter;
pub mod runner;
pub mod standalone;
pub mod utils;
pub mod workload;

pub use emitter::Emitter;

/////////////////////////////////////////////////////////////////////////////
// MapReduce application types
/////////////////////////////////////////////////////////////////////////////

/// The contract every computation run by this engine satisfies.
///
/// The standalone engine clones one instance per worker, so state kept in
/// `self` is private to that worker unless the implementation shares it
/// through its own synchronization (an `Arc<AtomicU64>`, for instance).
pub trait MapReduceJob {
    /// Called once per input record during the map phase.
    fn map(&mut self, kv: KeyValue, emitter: &mut dyn Emitter) -> anyhow::Result<()>;

    /// Called once per map worker after its input is exhausted.
    fn map_final(&mut self, _emitter: &mut dyn Emitter) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called once per distinct key of a sorted stream with every value
    /// collected for that key, in stream order.
    fn reduce(
        &mut self,
        key: Bytes,
        values: Vec<Bytes>,
        emitter: &mut dyn Emitter,
    ) -> anyhow::Result<()>;
}

/////////////////////////////////////////////////////////////////////////////
// Key-value pairs
/////////////////////////////////////////////////////////////////////////////

/// A single key-value pair.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct KeyValue {
    /// The key.
    pub key: Bytes,
    /// The value.
    pub value: Bytes,
}

impl KeyValue {
    /// Construct a new key-value pair from the given key and value.
    pub fn new(key: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Get the key of this key-value pair.
    ///
    /// This method is cheap, since [`Bytes`] are cheaply cloneable.
    #[inline]
    pub fn key(&self) -> Bytes {
        self.key.clone()
    }

    /// Consumes the key-value pair and returns the value.
    #[inline]
    pub fn into_value(self) -> Bytes {
        self.value
    }
}

/// Hashes an intermediate key. Compute a reduce bucket for a given key
/// by calculating `ihash(key) % n_reduce`.
///
/// This is the Adler-32 checksum of the key. Other tools reading the same
/// partitioned output depend on it, so it must not change.
pub fn ihash(key: &[u8]) -> u32 {
    adler::adler32_slice(key)
}

/// The partition a key is routed to when the output is split into
/// `partitions` buckets. Always `0` for a single partition.
pub fn partition(key: &[u8], partitions: u32) -> u32 {
    if partitions <= 1 {
        0
    } else {
        ihash(key) % partitions
    }
}
