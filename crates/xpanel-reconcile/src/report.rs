//! Outcome of a reconciliation pass.

use std::fmt;

use crate::error::ReconcileError;

/// Bytes added to a client's usage.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageUpdate {
    pub username: String,
    pub bytes: u64,
    /// Usage after the update, in bytes.
    pub used: f64,
}

/// Something that went wrong without stopping the pass.
#[derive(Debug)]
pub struct Failure {
    /// Client concerned, `None` for the resync and restart steps.
    pub username: Option<String>,
    pub error: ReconcileError,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.username {
            Some(name) => write!(f, "{name}: {}", self.error),
            None => write!(f, "{}", self.error),
        }
    }
}

/// What a pass did.
#[derive(Debug, Default)]
pub struct PassReport {
    /// Distinct usernames examined.
    pub checked: usize,
    /// Usernames deleted, in order.
    pub removed: Vec<String>,
    pub usage_updates: Vec<UsageUpdate>,
    pub failures: Vec<Failure>,
    /// The engine config was rewritten.
    pub resynced: bool,
    /// The engine was restarted.
    pub restarted: bool,
}

impl PassReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub(crate) fn fail(&mut self, username: Option<&str>, error: impl Into<ReconcileError>) {
        self.failures.push(Failure {
            username: username.map(str::to_string),
            error: error.into(),
        });
    }

    /// Fold a later pass into this one.
    pub fn merge(&mut self, other: PassReport) {
        self.checked += other.checked;
        self.removed.extend(other.removed);
        self.usage_updates.extend(other.usage_updates);
        self.failures.extend(other.failures);
        self.resynced |= other.resynced;
        self.restarted |= other.restarted;
    }
}

impl fmt::Display for PassReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "checked {}, removed {}, usage updates {}, failures {}",
            self.checked,
            self.removed.len(),
            self.usage_updates.len(),
            self.failures.len()
        )?;
        if self.restarted {
            f.write_str(", engine restarted")?;
        } else if self.resynced {
            f.write_str(", config resynced")?;
        }
        Ok(())
    }
}
