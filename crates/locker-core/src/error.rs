//! Error types for locker-core

use thiserror::Error;

/// Result type alias using locker-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in locker-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// Item or conflict not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rejected before any mutation took place
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Item service could not be reached or answered with a failure
    #[error("Remote item service error: {0}")]
    Remote(String),

    /// An error annotated with the phase that produced it
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<Error>,
    },

    /// A unit of work failed and rolling back its transaction failed too
    #[error("{source}; rollback failed: {rollback}")]
    Rollback {
        #[source]
        source: Box<Error>,
        rollback: String,
    },

    /// A batch apply failed and the compensating conflict delete failed too
    #[error("{source}; conflict rollback failed: {rollback}")]
    Compensation {
        #[source]
        source: Box<Error>,
        rollback: Box<Error>,
    },
}

impl Error {
    /// Wrap this error with the operation that was running when it occurred.
    #[must_use]
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The error this one wraps, if it is a wrapper.
    fn wrapped(&self) -> Option<&Error> {
        match self {
            Self::Context { source, .. }
            | Self::Rollback { source, .. }
            | Self::Compensation { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }

    /// Whether this error, or the error it wraps, is a not-found.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            other => other.wrapped().is_some_and(Error::is_not_found),
        }
    }

    /// Whether this error, or the error it wraps, is a validation failure.
    pub fn is_validation(&self) -> bool {
        match self {
            Self::Validation(_) => true,
            other => other.wrapped().is_some_and(Error::is_validation),
        }
    }

    /// Whether this error came from the remote item service.
    pub fn is_remote(&self) -> bool {
        match self {
            Self::Remote(_) => true,
            other => other.wrapped().is_some_and(Error::is_remote),
        }
    }
}

/// Attach operation context to a fallible result.
pub trait ResultExt<T> {
    /// Wrap the error, if any, with `context`.
    fn context(self, context: &str) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: &str) -> Result<T> {
        self.map_err(|error| error.into().context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_keeps_not_found_kind() {
        let error = Error::NotFound("conflict 42".into()).context("failed to get conflict");
        assert!(error.is_not_found());
        assert_eq!(
            error.to_string(),
            "failed to get conflict: Not found: conflict 42"
        );
    }

    #[test]
    fn compensation_message_contains_both_failures() {
        let error = Error::Compensation {
            source: Box::new(Error::Remote("batch exploded".into())),
            rollback: Box::new(Error::Database("delete exploded".into())),
        };
        let message = error.to_string();
        assert!(message.contains("batch exploded"));
        assert!(message.contains("delete exploded"));
        assert!(error.is_remote());
    }

    #[test]
    fn validation_is_not_not_found() {
        let error = Error::Validation("unknown resolution strategy".into());
        assert!(error.is_validation());
        assert!(!error.is_not_found());
    }
    #[test]
    fn every_wrapper_keeps_the_inner_kind() {
        let rolled_back = |source: Error| Error::Rollback {
            source: Box::new(source),
            rollback: "cannot rollback".into(),
        };
        assert!(rolled_back(Error::Validation("bad strategy".into())).is_validation());
        assert!(rolled_back(Error::Remote("down".into())).is_remote());
        assert!(rolled_back(Error::NotFound("item 1".into())).is_not_found());

        let compensated = Error::Compensation {
            source: Box::new(Error::Validation("bad".into()).context("failed to apply")),
            rollback: Box::new(Error::Database("locked".into())),
        };
        assert!(compensated.is_validation());
        assert!(!compensated.is_remote());
        assert!(!compensated.is_not_found());
    }
}
