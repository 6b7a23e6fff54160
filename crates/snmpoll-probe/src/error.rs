/// Session-level failures surfaced to the polling engine.
///
/// The engine performs no retries of its own; `Timeout` already accounts
/// for the transport's configured retry count.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProbeError {
    /// The target did not respond within timeout x (retries + 1).
    #[error("no response from {host} after {attempts} attempt(s)")]
    Timeout { host: String, attempts: u32 },

    /// Any other session-level failure: unreachable target, malformed
    /// response, closed socket.
    #[error("transport error: {0}")]
    Transport(String),

    /// The agent does not expose the requested object at all.
    #[error("no such object: {0}")]
    NoSuchObject(String),
}

pub type Result<T> = std::result::Result<T, ProbeError>;
