// src/output/sink.rs

//! Consumers of classified output lines.

use std::io::Write;

use tracing::trace;

use super::LogLine;

/// Anything that accepts classified lines, in arrival order.
///
/// The session writes child output, its own progress messages and every
/// failure diagnostic through the same sink, so a front-end needs exactly one
/// display path.
pub trait OutputSink: Send {
    fn emit(&mut self, line: &LogLine);
}

/// Writes every line to stdout, untouched.
///
/// Tracing diagnostics go to stderr, so stdout carries only the benchmark
/// output and session messages.
#[derive(Debug, Default)]
pub struct ConsoleSink {
    _private: (),
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutputSink for ConsoleSink {
    fn emit(&mut self, line: &LogLine) {
        trace!(tag = %line.tag, "emit line");
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        // A closed stdout (e.g. `| head`) must not abort the run.
        let _ = writeln!(out, "{}", line.text);
        let _ = out.flush();
    }
}

impl<S: OutputSink + ?Sized> OutputSink for Box<S> {
    fn emit(&mut self, line: &LogLine) {
        (**self).emit(line);
    }
}
