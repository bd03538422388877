// This module implements the aggregate compilation metrics summary: the record a replay
// driver accumulates over many compiled methods (successful/failing/missing compiles,
// code bytes, executed instruction counts, and their tiered and diff variants) and
// persists as a two-line CSV artifact. The writer emits all thirteen columns. The reader
// understands only the seven canonical columns older consumers rely on and ignores the
// six tier columns, so they never survive a save/load cycle; it locates the seven columns
// by header name, which lets it read both the thirteen-column files written here and the
// legacy seven-column layout. Every counter is an i64 so that summing instruction counts
// over very large runs cannot overflow. Errors are reported through MetricsError, and
// load_or_default/save_or_warn collapse them for callers that treat these metrics as
// advisory telemetry: a failed load means "no prior metrics", a failed save is a warning.

//! Aggregate compilation metrics summary.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, Write};
use std::ops::{Add, AddAssign};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Column names written to the header line, in data order.
pub const WRITE_COLUMNS: [&str; 13] = [
    "Successful compiles",
    "Successful tier0 compiles",
    "Successful tier1 compiles",
    "Failing compiles",
    "Missing compiles",
    "Code bytes",
    "Diffed code bytes",
    "Executed instructions",
    "Tier 0 executed instructions",
    "Tier 1 executed instructions",
    "Diff executed instructions",
    "Diff executed instructions tier 0",
    "Diff executed instructions tier1",
];

/// Column names the reader recovers.
pub const READ_COLUMNS: [&str; 7] = [
    "Successful compiles",
    "Failing compiles",
    "Missing compiles",
    "Code bytes",
    "Diffed code bytes",
    "Executed instructions",
    "Diff executed instructions",
];

/// Errors raised while saving or loading a summary.
#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: io::Error,
    },

    #[error("Metrics file has no header line")]
    MissingHeader,

    #[error("Metrics file has no data line")]
    MissingData,

    #[error("Metrics header has no '{column}' column")]
    MissingColumn {
        column: &'static str,
    },

    #[error("Metrics column '{column}' is not an integer: '{value}'")]
    InvalidValue {
        column: &'static str,
        value: String,
    },
}

/// Result type alias for metrics operations.
pub type MetricsResult<T> = Result<T, MetricsError>;

/// Summary of many compilations.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSummary {
    pub successful_compiles: i64,
    pub successful_tier0_compiles: i64,
    pub successful_tier1_compiles: i64,
    pub failing_compiles: i64,
    pub missing_compiles: i64,
    pub num_code_bytes: i64,
    pub num_diffed_code_bytes: i64,
    pub num_executed_instructions: i64,
    pub num_tier0_executed_instructions: i64,
    pub num_tier1_executed_instructions: i64,
    pub num_diff_executed_instructions: i64,
    pub num_tier0_diff_executed_instructions: i64,
    pub num_tier1_diff_executed_instructions: i64,
}

impl MetricsSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Values in [`WRITE_COLUMNS`] order.
    pub fn values(&self) -> [i64; 13] {
        [
            self.successful_compiles,
            self.successful_tier0_compiles,
            self.successful_tier1_compiles,
            self.failing_compiles,
            self.missing_compiles,
            self.num_code_bytes,
            self.num_diffed_code_bytes,
            self.num_executed_instructions,
            self.num_tier0_executed_instructions,
            self.num_tier1_executed_instructions,
            self.num_diff_executed_instructions,
            self.num_tier0_diff_executed_instructions,
            self.num_tier1_diff_executed_instructions,
        ]
    }

    fn from_values(v: [i64; 13]) -> Self {
        Self {
            successful_compiles: v[0],
            successful_tier0_compiles: v[1],
            successful_tier1_compiles: v[2],
            failing_compiles: v[3],
            missing_compiles: v[4],
            num_code_bytes: v[5],
            num_diffed_code_bytes: v[6],
            num_executed_instructions: v[7],
            num_tier0_executed_instructions: v[8],
            num_tier1_executed_instructions: v[9],
            num_diff_executed_instructions: v[10],
            num_tier0_diff_executed_instructions: v[11],
            num_tier1_diff_executed_instructions: v[12],
        }
    }

    /// The two-line artifact: thirteen-column header and data line.
    pub fn to_csv(&self) -> String {
        let values: Vec<String> = self.values().iter().map(i64::to_string).collect();
        format!("{}\n{}\n", WRITE_COLUMNS.join(","), values.join(","))
    }

    /// Parse the seven canonical columns out of a summary artifact.
    ///
    /// Tier columns are never read back; they stay zero in the result.
    pub fn parse(content: &str) -> MetricsResult<Self> {
        let mut lines = content.lines().map(|line| line.trim_end_matches('\r'));

        let header: Vec<&str> = match lines.next() {
            Some(line) if !line.trim().is_empty() => line.split(',').map(str::trim).collect(),
            _ => return Err(MetricsError::MissingHeader),
        };
        let data: Vec<&str> = match lines.next() {
            Some(line) if !line.trim().is_empty() => line.split(',').map(str::trim).collect(),
            _ => return Err(MetricsError::MissingData),
        };

        let mut parsed = [0i64; 7];
        for (slot, &column) in parsed.iter_mut().zip(READ_COLUMNS.iter()) {
            let index = header
                .iter()
                .position(|&name| name == column)
                .ok_or(MetricsError::MissingColumn { column })?;
            let raw = data.get(index).copied().unwrap_or_default();
            *slot = raw.parse().map_err(|_| MetricsError::InvalidValue {
                column,
                value: raw.to_string(),
            })?;
        }

        let [successful, failing, missing, code_bytes, diffed_code_bytes, executed, diff_executed] =
            parsed;
        Ok(Self {
            successful_compiles: successful,
            failing_compiles: failing,
            missing_compiles: missing,
            num_code_bytes: code_bytes,
            num_diffed_code_bytes: diffed_code_bytes,
            num_executed_instructions: executed,
            num_diff_executed_instructions: diff_executed,
            ..Self::default()
        })
    }

    /// Write the summary to `path`, replacing any existing file.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> MetricsResult<()> {
        let path = path.as_ref();
        let io_err = |source| MetricsError::Io {
            path: path.to_path_buf(),
            source,
        };

        let mut file = File::create(path).map_err(io_err)?;
        file.write_all(self.to_csv().as_bytes()).map_err(io_err)?;
        file.flush().map_err(io_err)?;
        Ok(())
    }

    /// Read the seven canonical columns from `path`.
    pub fn load_from_file(path: impl AsRef<Path>) -> MetricsResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| MetricsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Load prior metrics, treating any failure as "none available".
    pub fn load_or_default(path: impl AsRef<Path>) -> Option<Self> {
        match Self::load_from_file(path.as_ref()) {
            Ok(summary) => Some(summary),
            Err(err) => {
                log::info!("No prior metrics loaded from {}: {}", path.as_ref().display(), err);
                None
            }
        }
    }

    /// Save, logging a warning on failure. Returns whether the save succeeded.
    pub fn save_or_warn(&self, path: impl AsRef<Path>) -> bool {
        match self.save_to_file(path.as_ref()) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("Failed to save metrics summary: {}", err);
                false
            }
        }
    }

    /// Add every field of `other` into `self`.
    pub fn aggregate_from(&mut self, other: &MetricsSummary) {
        let mut values = self.values();
        for (lhs, rhs) in values.iter_mut().zip(other.values()) {
            *lhs += rhs;
        }
        *self = Self::from_values(values);
    }

    /// Field-wise sum of `self` and `other`.
    pub fn combine(&self, other: &MetricsSummary) -> MetricsSummary {
        let mut result = *self;
        result.aggregate_from(other);
        result
    }
}

impl Add for MetricsSummary {
    type Output = MetricsSummary;

    fn add(self, rhs: MetricsSummary) -> MetricsSummary {
        self.combine(&rhs)
    }
}

impl AddAssign<&MetricsSummary> for MetricsSummary {
    fn add_assign(&mut self, rhs: &MetricsSummary) {
        self.aggregate_from(rhs);
    }
}

impl fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Metrics Summary:")?;
        for (name, value) in WRITE_COLUMNS.iter().zip(self.values()) {
            writeln!(f, "  {}: {}", name, value)?;
        }
        Ok(())
    }
}
