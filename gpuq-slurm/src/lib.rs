pub mod cluster;
pub mod gres;
pub mod jobs;
pub mod nodes;
pub mod parser;
pub mod utils;

use std::fmt;

/// A recoverable parse problem, attributed to the record that produced it.
///
/// Warnings never abort a snapshot: the offending job or node is given
/// fallback values (or skipped, for malformed top-level node records) and
/// the rest of the dump is still processed. The caller decides where to
/// surface them, typically stderr.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    /// The job id or node name the problem belongs to.
    pub subject: String,
    pub message: String,
}

impl Warning {
    pub fn new(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.subject, self.message)
    }
}
