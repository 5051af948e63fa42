//! The line-oriented record format spoken on every data stream.
//!
//! A record is written as `key TAB value NEWLINE`. Raw map input is read
//! as value-only lines, `value NEWLINE`, with an implied empty key.
//!
//! Readers do not distinguish a clean end of input from a read error or
//! a truncated trailing line: all of them end the stream.

use std::io::{self, BufRead, Write};

use bytes::Bytes;

use crate::KeyValue;

pub const FIELD_DELIMITER: u8 = b'\t';
pub const LINE_DELIMITER: u8 = b'\n';

/// Reads up to and including `delim`, returning the bytes before it.
///
/// Returns [`None`] if the stream fails or ends before `delim` is seen.
fn read_segment<R: BufRead + ?Sized>(reader: &mut R, delim: u8) -> Option<Vec<u8>> {
    let mut buf = Vec::new();
    match reader.read_until(delim, &mut buf) {
        Ok(_) if buf.last() == Some(&delim) => {
            buf.pop();
            Some(buf)
        }
        _ => None,
    }
}

/// Reads one value-only line. The key of the returned record is empty.
pub fn read_value_line<R: BufRead + ?Sized>(reader: &mut R) -> Option<KeyValue> {
    let value = read_segment(reader, LINE_DELIMITER)?;
    Some(KeyValue::new(Bytes::new(), value))
}

/// Reads one `key TAB value NEWLINE` line.
///
/// A partially read record is discarded.
pub fn read_key_value_line<R: BufRead + ?Sized>(reader: &mut R) -> Option<KeyValue> {
    let key = read_segment(reader, FIELD_DELIMITER)?;
    let value = read_segment(reader, LINE_DELIMITER)?;
    Some(KeyValue::new(key, value))
}

/// Writes `key TAB value NEWLINE`.
pub fn write_key_value_line<W: Write + ?Sized>(
    writer: &mut W,
    key: &[u8],
    value: &[u8],
) -> io::Result<()> {
    writer.write_all(key)?;
    writer.write_all(&[FIELD_DELIMITER])?;
    writer.write_all(value)?;
    writer.write_all(&[LINE_DELIMITER])
}

/// Writes `value NEWLINE`, the form raw map input takes.
pub fn write_value_line<W: Write + ?Sized>(writer: &mut W, value: &[u8]) -> io::Result<()> {
    writer.write_all(value)?;
    writer.write_all(&[LINE_DELIMITER])
}

/// An iterator over the value-only lines of a stream.
pub struct ValueLines<R> {
    reader: R,
}

impl<R: BufRead> ValueLines<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> Iterator for ValueLines<R> {
    type Item = KeyValue;

    fn next(&mut self) -> Option<KeyValue> {
        read_value_line(&mut self.reader)
    }
}

/// An iterator over the key/value lines of a stream.
pub struct KeyValueLines<R> {
    reader: R,
}

impl<R: BufRead> KeyValueLines<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> Iterator for KeyValueLines<R> {
    type Item = KeyValue;

    fn next(&mut self) -> Option<KeyValue> {
        read_key_value_line(&mut self.reader)
    }
}
