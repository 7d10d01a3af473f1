use thiserror::Error;

/// Failure reading or writing client-side storage.
///
/// Never fatal: the session manager degrades to an in-memory value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("failed to access storage key '{key}': {reason}")]
    Access { key: String, reason: String },
}

/// Every way a round trip to the chat endpoint can fail.
///
/// All variants collapse to the same fallback message in the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),
    #[error("chat endpoint returned status {0}")]
    Status(u16),
    #[error("failed to decode response body: {0}")]
    Decode(String),
    #[error("response body has no 'response' field")]
    MissingResponse,
}
