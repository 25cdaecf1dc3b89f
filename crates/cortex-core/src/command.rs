//! Command abstractions.

use uuid::Uuid;

/// Trait implemented by every request that enters a bounded context.
pub trait Command: Send + Sync + std::fmt::Debug {
    /// Stable name of the command, used as a tracing field.
    fn command_type(&self) -> &'static str;

    /// Correlation ID linking every log line produced while handling it.
    fn correlation_id(&self) -> Uuid;
}
