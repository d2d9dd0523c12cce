//! Domain error types.

use std::fmt::Display;

use thiserror::Error;
use uuid::Uuid;

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A procedure instance was not found.
    #[error("aggregate not found: {0}")]
    AggregateNotFound(Uuid),

    /// Optimistic concurrency conflict.
    #[error("concurrency conflict on aggregate {aggregate_id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        /// The aggregate that had the conflict.
        aggregate_id: Uuid,
        /// The expected version.
        expected: i64,
        /// The actual version found.
        actual: i64,
    },

    /// An argument was rejected before any roll or mutation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation is not legal in the instance's current phase.
    #[error("cannot {operation} while in {current}; requires {required}")]
    InvalidOperation {
        /// The attempted operation.
        operation: String,
        /// The phase the instance is in.
        current: String,
        /// The phase(s) the operation is legal in.
        required: String,
    },

    /// The actor already has an active instance of this procedure kind.
    #[error("actor {actor_id} already has an active {kind} procedure")]
    AlreadyActive {
        /// The actor.
        actor_id: Uuid,
        /// The procedure kind.
        kind: String,
    },

    /// A required configuration entry is missing or malformed.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl DomainError {
    /// Builds an `InvalidOperation` error from the current phase and the
    /// phases the operation would have been legal in.
    #[must_use]
    pub fn invalid_operation<C, R>(operation: &str, current: C, required: &[R]) -> Self
    where
        C: Display,
        R: Display,
    {
        let required = if required.is_empty() {
            "an active phase".to_owned()
        } else {
            required
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" or ")
        };
        Self::InvalidOperation {
            operation: operation.to_owned(),
            current: current.to_string(),
            required,
        }
    }
}
