use thiserror::Error;

pub type LlmResult<T> = std::result::Result<T, LlmError>;

/// Adapter errors.
///
/// Every vendor-specific failure is caught at the dispatch boundary and
/// re-raised as one of these variants; no vendor exception type ever crosses
/// the crate surface.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Model identifier not listed by any known vendor family.
    #[error("Model '{0}' is currently not supported")]
    UnsupportedModel(String),

    /// The vendor could not be reached at the transport level.
    #[error("The server could not be reached: {0}")]
    Connection(String),

    /// Vendor-reported throttling (HTTP 429). Retry policy is the caller's
    /// choice; the message carries whatever detail the vendor included.
    #[error("Rate limit exceeded: {message}")]
    RateLimited { message: String },

    /// The vendor rejected the request with a non-success status.
    #[error("API status error ({status}): {message}")]
    ApiStatus { status: u16, message: String },

    /// A vendor stream violated the expected event ordering. Fatal to the
    /// turn it occurred in, not to the client.
    #[error("Stream protocol violation: {0}")]
    StreamProtocol(String),

    /// Anything else, never silently swallowed.
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}
