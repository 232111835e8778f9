//! Replicator error types

use std::fmt;

use thiserror::Error;

/// Replicator-specific errors
#[derive(Debug, Error)]
pub enum ReplicatorError {
    /// Invalid construction parameters (no destinations, zero chunk size, ...)
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// Destination creation error
    #[error("failed to create destination '{name}': {message}")]
    DestinationCreation { name: String, message: String },

    /// One or more branches of a save failed
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

impl ReplicatorError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a destination creation error
    pub fn destination_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DestinationCreation {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Aggregate failure of a save, if this is one
    pub fn as_aggregate(&self) -> Option<&AggregateError> {
        match self {
            Self::Aggregate(aggregate) => Some(aggregate),
            _ => None,
        }
    }
}

/// Failure of a single branch of a save
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BranchFailure {
    /// Reading the incoming stream failed partway
    #[error("source read: {message}")]
    SourceRead { message: String },

    /// A destination failed to persist its copy
    #[error("destination '{destination}': {message}")]
    DestinationWrite {
        destination: String,
        message: String,
    },
}

impl BranchFailure {
    pub fn source_read(message: impl Into<String>) -> Self {
        Self::SourceRead {
            message: message.into(),
        }
    }

    pub fn destination_write(destination: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DestinationWrite {
            destination: destination.into(),
            message: message.into(),
        }
    }

    /// Failure message without the branch tag
    pub fn message(&self) -> &str {
        match self {
            Self::SourceRead { message } | Self::DestinationWrite { message, .. } => message,
        }
    }

    /// Destination name for destination failures
    pub fn destination(&self) -> Option<&str> {
        match self {
            Self::SourceRead { .. } => None,
            Self::DestinationWrite { destination, .. } => Some(destination),
        }
    }
}

/// Every failed branch of one save
///
/// Ordering: the source failure (if any) first, then destinations in
/// construction order. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("upload '{name}' failed on {} branch(es): {}", .failures.len(), FailureList(.failures))]
pub struct AggregateError {
    name: String,
    failures: Vec<BranchFailure>,
}

impl AggregateError {
    /// Build an aggregate, returning `None` when nothing failed
    pub fn from_failures(name: impl Into<String>, failures: Vec<BranchFailure>) -> Option<Self> {
        if failures.is_empty() {
            return None;
        }
        Some(Self {
            name: name.into(),
            failures,
        })
    }

    /// Upload name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All failures in report order
    pub fn failures(&self) -> &[BranchFailure] {
        &self.failures
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// The source read failure, if reading the upload failed
    pub fn source_failure(&self) -> Option<&BranchFailure> {
        self.failures
            .iter()
            .find(|f| matches!(f, BranchFailure::SourceRead { .. }))
    }

    /// Destination failures in construction order
    pub fn destination_failures(&self) -> impl Iterator<Item = &BranchFailure> {
        self.failures
            .iter()
            .filter(|f| matches!(f, BranchFailure::DestinationWrite { .. }))
    }

    /// Names of failed destinations in construction order
    pub fn failed_destinations(&self) -> Vec<&str> {
        self.failures
            .iter()
            .filter_map(BranchFailure::destination)
            .collect()
    }
}

struct FailureList<'a>(&'a [BranchFailure]);

impl fmt::Display for FailureList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, failure) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{failure}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_failures_are_not_an_error() {
        assert!(AggregateError::from_failures("a.txt", Vec::new()).is_none());
    }

    #[test]
    fn test_aggregate_display_lists_every_branch() {
        let aggregate = AggregateError::from_failures(
            "book.epub",
            vec![
                BranchFailure::source_read("connection reset"),
                BranchFailure::destination_write("c", "disk full"),
            ],
        )
        .unwrap();

        let rendered = aggregate.to_string();
        assert_eq!(
            rendered,
            "upload 'book.epub' failed on 2 branch(es): source read: connection reset; \
             destination 'c': disk full"
        );
        assert_eq!(aggregate.failed_destinations(), vec!["c"]);
        assert_eq!(aggregate.source_failure().map(BranchFailure::message), Some("connection reset"));
        assert_eq!(aggregate.destination_failures().count(), 1);
    }

    #[test]
    fn test_replicator_error_exposes_aggregate() {
        let aggregate =
            AggregateError::from_failures("x", vec![BranchFailure::destination_write("a", "boom")])
                .unwrap();
        let err: ReplicatorError = aggregate.clone().into();
        assert_eq!(err.as_aggregate(), Some(&aggregate));
        assert!(ReplicatorError::configuration("no destinations")
            .as_aggregate()
            .is_none());
    }
}
