use std::time::Duration;

/// Errors from a single remote call.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// The request could not be delivered (DNS, connect, I/O).
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// The request did not complete within the configured timeout.
    #[error("request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    /// The remote answered with a non-success status.
    #[error("request to {url} returned HTTP {code}")]
    Status { url: String, code: u16 },

    /// The response body could not be read.
    #[error("failed to read response body: {0}")]
    Body(#[from] std::io::Error),
}

/// Errors that can occur in multiplexer and sequencer operations.
#[derive(Debug, thiserror::Error)]
pub enum ServoError {
    /// A remote call failed.
    #[error("remote link error: {0}")]
    Link(#[from] LinkError),

    /// Actuator id outside `[0, count)`.
    #[error("invalid actuator {id} (valid: 0..{count})")]
    InvalidActuator { id: usize, count: usize },

    /// Malformed request rejected before any remote call.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Step `index` of a multi-step operation failed; later steps were not run.
    #[error("step {index} failed: {source}")]
    ActionFailed {
        index: usize,
        #[source]
        source: Box<ServoError>,
    },
}

impl ServoError {
    pub(crate) fn at_step(index: usize, source: ServoError) -> Self {
        Self::ActionFailed {
            index,
            source: Box::new(source),
        }
    }

    /// Innermost error, looking through any `ActionFailed` wrappers.
    pub fn root_cause(&self) -> &ServoError {
        match self {
            Self::ActionFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, ServoError>;
