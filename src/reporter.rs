//! Status and counter updates for a streaming harness.
//!
//! Updates are single lines on standard error, `reporter:status:<text>` and
//! `reporter:counter:<group>,<counter>,<amount>`. Nothing is buffered.

use std::fmt::Display;
use std::io::{self, Write};

pub struct Reporter<W: Write> {
    out: W,
}

impl Reporter<io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Updates the job status. Line breaks in `text` are written as `\n`
    /// and `\r` escapes so the update stays a single line.
    pub fn status(&mut self, text: impl Display) -> io::Result<()> {
        let line = text.to_string().replace('\r', "\\r").replace('\n', "\\n");
        writeln!(self.out, "reporter:status:{}", line)?;
        self.out.flush()
    }

    /// Adds `amount` to the counter `counter` in `group`.
    pub fn incr_counter(&mut self, group: &str, counter: &str, amount: i64) -> io::Result<()> {
        writeln!(self.out, "reporter:counter:{},{},{}", group, counter, amount)?;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Reports a status line on standard error.
pub fn status(text: impl Display) {
    let _ = Reporter::stderr().status(text);
}

/// Reports a counter increment on standard error.
pub fn incr_counter(group: &str, counter: &str, amount: i64) {
    let _ = Reporter::stderr().incr_counter(group, counter, amount);
}
