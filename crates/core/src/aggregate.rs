//! Aggregate root contract and optimistic concurrency primitives.

use thiserror::Error;

/// Aggregate root marker + minimal interface.
///
/// Aggregates are immutable snapshots: every mutation returns the events it
/// produced plus the next snapshot, and never performs IO.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the aggregate identifier.
    fn id(&self) -> &Self::Id;

    /// Monotonically increasing version of the aggregate's state.
    ///
    /// Starts at 1 on creation and grows by one per emitted event, so a
    /// persisted event at version `n` may only be applied on top of `n - 1`.
    fn version(&self) -> u64;
}

/// Optimistic concurrency expectation for an aggregate.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// The aggregate must not exist yet.
    NoAggregate,
    /// Require the aggregate to be at an exact version.
    Exact(u64),
}

/// Stored version did not match the expectation.
#[derive(Debug, Error, Copy, Clone, PartialEq, Eq)]
#[error("optimistic concurrency check failed (expected: {expected:?}, actual: {actual:?})")]
pub struct VersionMismatch {
    pub expected: ExpectedVersion,
    pub actual: Option<u64>,
}

impl ExpectedVersion {
    /// Expectation for applying an event that produces `version`.
    pub fn preceding(version: u64) -> Self {
        match version {
            0 | 1 => ExpectedVersion::NoAggregate,
            v => ExpectedVersion::Exact(v - 1),
        }
    }

    pub fn matches(self, actual: Option<u64>) -> bool {
        match (self, actual) {
            (ExpectedVersion::NoAggregate, None) => true,
            (ExpectedVersion::Exact(v), Some(a)) => v == a,
            _ => false,
        }
    }

    pub fn check(self, actual: Option<u64>) -> Result<(), VersionMismatch> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(VersionMismatch {
                expected: self,
                actual,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preceding_version_of_creation_expects_no_aggregate() {
        assert_eq!(ExpectedVersion::preceding(1), ExpectedVersion::NoAggregate);
        assert_eq!(ExpectedVersion::preceding(4), ExpectedVersion::Exact(3));
    }

    #[test]
    fn check_reports_mismatch() {
        assert!(ExpectedVersion::Exact(2).check(Some(2)).is_ok());
        assert!(ExpectedVersion::NoAggregate.check(None).is_ok());

        let err = ExpectedVersion::Exact(2).check(Some(3)).unwrap_err();
        assert_eq!(err.actual, Some(3));
        assert!(ExpectedVersion::NoAggregate.check(Some(1)).is_err());
    }
}
