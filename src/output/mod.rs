// src/output/mod.rs

//! Output lines, their classification, and the sinks that consume them.
//!
//! - [`classify`] holds the ordered rule list that tags each line.
//! - [`sink`] defines the `OutputSink` trait and the console implementation.

pub mod classify;
pub mod sink;

pub use classify::{Classifier, Matcher, Rule};
pub use sink::{ConsoleSink, OutputSink};

use crate::types::LogTag;

/// One line of output plus its classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub text: String,
    pub tag: LogTag,
}

impl LogLine {
    pub fn new(text: impl Into<String>, tag: LogTag) -> Self {
        Self {
            text: text.into(),
            tag,
        }
    }

    /// Classify `text` with the given rules.
    pub fn classified(text: impl Into<String>, classifier: &Classifier) -> Self {
        let text = text.into();
        let tag = classifier.classify(&text);
        Self { text, tag }
    }

    /// A diagnostic line, always tagged `Error`.
    pub fn error(text: impl Into<String>) -> Self {
        Self::new(text, LogTag::Error)
    }
}
