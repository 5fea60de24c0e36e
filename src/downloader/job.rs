//! Export jobs, fetch units and export summaries

use crate::metrics::UnitOutcome;
use crate::output::ExportPaths;
use crate::DateRange;
use std::fmt;
use std::path::PathBuf;

/// What an export job produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportKind {
    /// One TCX file per recorded exercise
    ActivityTcx,
    /// Monthly body weight CSV files
    Weight,
    /// Monthly daily-activity CSV files
    ActivityMetrics,
    /// Weight, then daily activity, then exercise TCX
    All,
}

impl ExportKind {
    /// Short lowercase name used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ActivityTcx => "activity_tcx",
            Self::Weight => "weight",
            Self::ActivityMetrics => "activity",
            Self::All => "all",
        }
    }
}

impl fmt::Display for ExportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Export job specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportJob {
    /// What to export
    pub kind: ExportKind,
    /// Requested days, both ends included
    pub range: DateRange,
    /// Credentials, markers and cached activity list
    pub cache_dir: PathBuf,
    /// Exported artifacts
    pub output_dir: PathBuf,
}

impl ExportJob {
    /// Create a new export job
    pub fn new(kind: ExportKind, range: DateRange, cache_dir: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            kind,
            range,
            cache_dir,
            output_dir,
        }
    }

    /// Directory layout of this job
    pub fn paths(&self) -> ExportPaths {
        ExportPaths::new(&self.cache_dir, &self.output_dir)
    }
}

/// Independently resumable piece of work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchUnit {
    /// Activity log list of the whole export range
    ActivityList(DateRange),
    /// TCX export of one activity
    ActivityTcx {
        /// Provider log id
        log_id: u64,
    },
    /// One month (or partial month) of weight entries
    Weight(DateRange),
    /// One month (or partial month) of daily activity metrics
    ActivityMetrics(DateRange),
}

impl FetchUnit {
    /// Marker file name inside the cache directory
    pub fn cache_key(&self) -> String {
        match self {
            Self::ActivityList(range) => format!(".exercises.{range}"),
            Self::ActivityTcx { log_id } => format!(".exercise.{log_id}"),
            Self::Weight(range) => format!(".weight.{range}"),
            Self::ActivityMetrics(range) => format!(".activity.{range}"),
        }
    }

    /// Artifact file name inside the output directory
    ///
    /// `None` for the activity list, whose cache lives next to its marker.
    pub fn artifact_name(&self) -> Option<String> {
        match self {
            Self::ActivityList(_) => None,
            Self::ActivityTcx { log_id } => Some(format!("exercise.{log_id}.tcx")),
            Self::Weight(range) => Some(format!("weight.{range}.csv")),
            Self::ActivityMetrics(range) => Some(format!("activity.{range}.csv")),
        }
    }

    /// Label used in retry and progress log lines
    pub fn label(&self) -> String {
        match self {
            Self::ActivityList(_) => "activity-log-list".to_string(),
            Self::ActivityTcx { log_id } => format!("activity-tcx-{log_id}"),
            Self::Weight(range) => format!("weight-{range}"),
            Self::ActivityMetrics(range) => format!("activity-{range}"),
        }
    }
}

/// Unit counts of one finished export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSummary {
    /// Export the counts belong to
    pub kind: ExportKind,
    /// Units planned
    pub units_total: usize,
    /// Units already marked done before this run
    pub units_skipped: usize,
    /// Units fetched with an artifact written
    pub units_fetched: usize,
    /// Units marked done without an artifact
    pub units_empty: usize,
}

impl ExportSummary {
    /// Empty summary for `units_total` planned units
    pub fn new(kind: ExportKind, units_total: usize) -> Self {
        Self {
            kind,
            units_total,
            units_skipped: 0,
            units_fetched: 0,
            units_empty: 0,
        }
    }

    /// Count one processed unit
    pub fn record(&mut self, outcome: UnitOutcome) {
        match outcome {
            UnitOutcome::Skipped => self.units_skipped += 1,
            UnitOutcome::Fetched => self.units_fetched += 1,
            UnitOutcome::Empty => self.units_empty += 1,
        }
    }

    /// Units processed so far
    pub fn units_processed(&self) -> usize {
        self.units_skipped + self.units_fetched + self.units_empty
    }

    /// Sum of `self` and `other`, labelled `kind`
    pub fn combine(self, other: Self, kind: ExportKind) -> Self {
        Self {
            kind,
            units_total: self.units_total + other.units_total,
            units_skipped: self.units_skipped + other.units_skipped,
            units_fetched: self.units_fetched + other.units_fetched,
            units_empty: self.units_empty + other.units_empty,
        }
    }
}

impl fmt::Display for ExportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} export: {} units ({} fetched, {} empty, {} already done)",
            self.kind, self.units_total, self.units_fetched, self.units_empty, self.units_skipped
        )
    }
}
