//! Error types for the aggregation client.
//!
//! Provider-level failures are deliberately not represented here: a
//! provider that errors on a single operation is logged and skipped, never
//! surfaced to the caller. Only configuration mistakes are fatal.

use thiserror::Error;

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced to the host application.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Invalid provider configuration (duplicate identifiers). Fatal at
    /// configure time; the engine refuses to exist with a broken order.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// A subscriber callback failure.
///
/// Contained at the fan-out boundary: logged, never propagated to other
/// subscribers or to provider-handling code.
#[derive(Debug, Error)]
#[error("subscriber callback failed: {0}")]
pub struct SubscriberError(String);

impl SubscriberError {
    /// Creates a callback error with a reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}
