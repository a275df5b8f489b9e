//! Listing results with per-line diagnostics.

use std::fmt;

use xpanel_core::ParseProtocolError;

/// Records read from a store together with what was wrong with the input.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded<T> {
    /// Records in file order.
    pub records: Vec<T>,
    /// Problems found while reading, in file order.
    pub issues: Vec<LineIssue>,
}

impl<T> Loaded<T> {
    pub fn new(records: Vec<T>) -> Self {
        Self {
            records,
            issues: Vec::new(),
        }
    }

    /// Number of lines that were dropped entirely.
    pub fn skipped(&self) -> usize {
        self.issues.iter().filter(|i| i.kind.is_skip()).count()
    }

    pub fn into_records(self) -> Vec<T> {
        self.records
    }
}

impl<T> Default for Loaded<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// A problem on one line of a record file (1-based line number).
#[derive(Debug, Clone, PartialEq)]
pub struct LineIssue {
    pub line: usize,
    pub kind: IssueKind,
}

impl fmt::Display for LineIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.kind)
    }
}

/// What was wrong with a line.
#[derive(Debug, Clone, PartialEq)]
pub enum IssueKind {
    /// Fewer fields than the format requires; the line was skipped.
    TooFewFields { found: usize, expected: usize },
    /// Port column is not a usable port; the line was skipped.
    BadPort(String),
    /// Tag does not name a known family and transport; the line was skipped.
    BadProtocol(ParseProtocolError),
    /// Numeric column did not parse; the record was kept with 0.
    BadNumber { field: &'static str, value: String },
    /// Expiry did not parse; the record was kept as already expired.
    BadExpiry(String),
}

impl IssueKind {
    /// Whether the whole line was dropped.
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            Self::TooFewFields { .. } | Self::BadPort(_) | Self::BadProtocol(_)
        )
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooFewFields { found, expected } => {
                write!(f, "expected {expected} fields, found {found}; skipped")
            }
            Self::BadPort(v) => write!(f, "invalid port {v:?}; skipped"),
            Self::BadProtocol(e) => write!(f, "{e}; skipped"),
            Self::BadNumber { field, value } => {
                write!(f, "invalid {field} {value:?}; loaded as 0")
            }
            Self::BadExpiry(v) => write!(f, "invalid expiry {v:?}; loaded as expired"),
        }
    }
}
