//! Sinks a computation writes its output records through.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::codec::write_key_value_line;
use crate::partition;

/// The output side of a computation.
pub trait Emitter {
    /// Writes one record.
    fn emit(&mut self, key: &[u8], value: &[u8]) -> io::Result<()>;

    /// Forces buffered records to the underlying stream(s).
    fn flush(&mut self) -> io::Result<()>;
}

/// Writes every record as one wire line into a single buffered stream.
pub struct DirectEmitter<W: Write> {
    writer: BufWriter<W>,
}

impl<W: Write> DirectEmitter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: BufWriter::new(inner),
        }
    }

    /// Flushes the buffer and returns the underlying stream.
    pub fn into_inner(self) -> io::Result<W> {
        self.writer.into_inner().map_err(|e| e.into_error())
    }
}

impl<W: Write> Emitter for DirectEmitter<W> {
    fn emit(&mut self, key: &[u8], value: &[u8]) -> io::Result<()> {
        write_key_value_line(&mut self.writer, key, value)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Routes records into one file per partition.
///
/// The file for partition `p` is `<template>.<p as %04d>` and is only
/// created once a record lands in it, so partitions that receive no output
/// have no file at all.
pub struct PartitionedEmitter {
    partitions: u32,
    template: PathBuf,
    sinks: Vec<Option<DirectEmitter<File>>>,
    file_names: Vec<Option<PathBuf>>,
    closed: bool,
}

impl PartitionedEmitter {
    pub fn new(partitions: u32, template: impl Into<PathBuf>) -> Self {
        let partitions = partitions.max(1);
        let slots = partitions as usize;
        Self {
            partitions,
            template: template.into(),
            sinks: (0..slots).map(|_| None).collect(),
            file_names: vec![None; slots],
            closed: false,
        }
    }

    /// The path partition `partition` is written to for `template`.
    pub fn partition_path(template: &Path, partition: u32) -> PathBuf {
        let mut name = template.as_os_str().to_owned();
        name.push(format!(".{:04}", partition));
        PathBuf::from(name)
    }

    /// Files created so far, indexed by partition.
    pub fn file_names(&self) -> &[Option<PathBuf>] {
        &self.file_names
    }

    /// Flushes and closes every file opened so far. Later emits fail.
    pub fn close(&mut self) -> io::Result<()> {
        self.closed = true;
        for slot in self.sinks.iter_mut() {
            if let Some(sink) = slot.take() {
                sink.into_inner()?;
            }
        }
        Ok(())
    }

    fn sink(&mut self, partition: u32) -> io::Result<&mut DirectEmitter<File>> {
        if self.closed {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("emit to {} after close", self.template.display()),
            ));
        }
        let index = partition as usize;
        match &mut self.sinks[index] {
            Some(sink) => Ok(sink),
            slot => {
                let path = Self::partition_path(&self.template, partition);
                let file = File::create(&path).map_err(|e| {
                    io::Error::new(e.kind(), format!("creating {}: {}", path.display(), e))
                })?;
                self.file_names[index] = Some(path);
                Ok(slot.insert(DirectEmitter::new(file)))
            }
        }
    }
}

impl Emitter for PartitionedEmitter {
    fn emit(&mut self, key: &[u8], value: &[u8]) -> io::Result<()> {
        let partition = partition(key, self.partitions);
        self.sink(partition)?.emit(key, value)
    }

    fn flush(&mut self) -> io::Result<()> {
        for sink in self.sinks.iter_mut().flatten() {
            sink.flush()?;
        }
        Ok(())
    }
}

/// Discards everything. Useful for measuring map/reduce throughput.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEmitter;

impl Emitter for NullEmitter {
    fn emit(&mut self, _key: &[u8], _value: &[u8]) -> io::Result<()> {
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
