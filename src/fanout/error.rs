use thiserror::Error;

/// Errors that end a fan-out invocation without sending anything.
///
/// Chunk and recipient failures are not represented here: they are absorbed
/// into the report counts.
#[derive(Debug, Error)]
pub enum FanOutError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Recipient directory unavailable: {0}")]
    UpstreamUnavailable(String),
}
