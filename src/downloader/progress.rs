//! `[i/total]` progress markers for per-unit log lines

use std::fmt;

/// Position of one unit within its export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    index: usize,
    total: usize,
}

impl Progress {
    /// Progress of the unit at zero-based `index` out of `total`
    pub fn new(index: usize, total: usize) -> Self {
        Self { index, total }
    }

    /// One-based position
    pub fn position(&self) -> usize {
        self.index + 1
    }

    /// Number of units in the export
    pub fn total(&self) -> usize {
        self.total
    }

    /// Prefix `label` with this marker, e.g. `[2/5] weight-2023-02-01:2023-02-28`
    pub fn label(&self, label: &str) -> String {
        format!("{self} {label}")
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}/{}]", self.position(), self.total)
    }
}
