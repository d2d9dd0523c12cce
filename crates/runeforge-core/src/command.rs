//! Command abstractions.

use uuid::Uuid;

/// Trait that all procedure commands implement.
pub trait Command: Send + Sync + std::fmt::Debug {
    /// The type name for this command (used in logs).
    fn command_type(&self) -> &'static str;

    /// Correlation ID to trace this command through its events.
    fn correlation_id(&self) -> Uuid;
}
