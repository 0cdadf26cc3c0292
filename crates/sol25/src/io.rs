//! Input and output capabilities.
//!
//! The core touches the outside world through exactly two seams: `String
//! read` pulls one line through a [`LineReader`], and `print` pushes bytes
//! through a [`PrintWriter`]. Hosts and tests swap in their own
//! implementations to capture or redirect all program I/O.

use std::{
    collections::VecDeque,
    io::{self, BufRead as _, Write as _},
};

/// Trait for handling output from the `print` selector.
///
/// Implement this trait to capture or redirect output from SOL25 code. The
/// default implementation [`StdPrint`] writes to stdout.
pub trait PrintWriter {
    /// Writes one already-escape-processed chunk of program output.
    fn write_str(&mut self, output: &str) -> io::Result<()>;
}

/// Default `PrintWriter` that buffers and writes to stdout.
///
/// Output is buffered and flushed when the writer is dropped, so everything
/// written before a runtime error still reaches stdout before the process
/// exits with the error code.
#[derive(Debug, Default)]
pub struct StdPrint {
    buffer: String,
}

impl StdPrint {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PrintWriter for StdPrint {
    fn write_str(&mut self, output: &str) -> io::Result<()> {
        self.buffer.push_str(output);
        Ok(())
    }
}

impl Drop for StdPrint {
    fn drop(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let _ = io::stdout().write_all(self.buffer.as_bytes());
        let _ = io::stdout().flush();
        self.buffer.clear();
    }
}

/// A `PrintWriter` that collects all output into a string.
///
/// Useful for testing or capturing program output programmatically.
#[derive(Debug, Default)]
pub struct CollectStringPrint(String);

impl CollectStringPrint {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the collected output as a string slice.
    #[must_use]
    pub fn output(&self) -> &str {
        self.0.as_str()
    }

    /// Consumes the writer and returns the collected output.
    #[must_use]
    pub fn into_output(self) -> String {
        self.0
    }
}

impl PrintWriter for CollectStringPrint {
    fn write_str(&mut self, output: &str) -> io::Result<()> {
        self.0.push_str(output);
        Ok(())
    }
}

/// `PrintWriter` that ignores all output.
#[derive(Debug, Default)]
pub struct NoPrint;

impl PrintWriter for NoPrint {
    fn write_str(&mut self, _output: &str) -> io::Result<()> {
        Ok(())
    }
}

/// Trait for the input capability behind `String read`.
pub trait LineReader {
    /// Reads one line without its trailing newline. `Ok(None)` signals
    /// end-of-input, which SOL25 observes as `nil`.
    fn read_line(&mut self) -> io::Result<Option<String>>;
}

/// Reads lines from the process stdin. May block until a line is available.
#[derive(Debug, Default)]
pub struct StdinReader;

impl StdinReader {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl LineReader for StdinReader {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        let read = io::stdin().lock().read_line(&mut line)?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(strip_newline(line)))
    }
}

/// A `LineReader` over preloaded lines, for tests and embedding.
#[derive(Debug, Default)]
pub struct QueueReader {
    lines: VecDeque<String>,
}

impl QueueReader {
    #[must_use]
    pub fn new(lines: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }
}

impl LineReader for QueueReader {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        Ok(self.lines.pop_front())
    }
}

/// A `LineReader` that is always at end-of-input.
#[derive(Debug, Default)]
pub struct EmptyReader;

impl LineReader for EmptyReader {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        Ok(None)
    }
}

fn strip_newline(mut line: String) -> String {
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
    line
}
