//! Bounded session memory.
//!
//! Every durable agent output (study note, quiz question, tutor feedback) is
//! appended here and injected into every later prompt so the model keeps a
//! chronological view of the session.

use std::fmt;

/// The origin of a memory entry, rendered as a `Label::` prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryKind {
    StudyNote,
    Quiz,
    Feedback,
}

impl MemoryKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            MemoryKind::StudyNote => "StudyNote",
            MemoryKind::Quiz => "Quiz",
            MemoryKind::Feedback => "Feedback",
        }
    }
}

impl fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.prefix())
    }
}

/// FIFO log of prior agent outputs that never holds more than `limit` entries.
#[derive(Debug, Clone)]
pub struct MemoryBuffer {
    limit: usize,
    entries: Vec<String>,
}

impl MemoryBuffer {
    /// Creates an empty buffer. A limit of zero is raised to one.
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            entries: Vec::new(),
        }
    }

    /// Appends a labelled entry, e.g. `StudyNote::<text>`.
    pub fn remember(&mut self, kind: MemoryKind, text: &str) {
        self.push(format!("{}::{}", kind, text));
    }

    /// Appends a raw entry, evicting the oldest entries once over the limit.
    pub fn push(&mut self, entry: String) {
        self.entries.push(entry);
        if self.entries.len() > self.limit {
            let excess = self.entries.len() - self.limit;
            self.entries.drain(..excess);
        }
    }

    /// Entries oldest first.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
