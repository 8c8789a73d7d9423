/// Error taxonomy for talking to the CloudWatcher and building readings
use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CloudWatcherError {
    /// The serial port could not be opened, or reopened after a fault.
    #[error("connection to {port} lost: {source}")]
    ConnectionLost {
        port: String,
        #[source]
        source: io::Error,
    },

    /// Fewer bytes arrived than the command's block count requires.
    #[error("incomplete response for {command}: got {got}/{expected} bytes")]
    IncompleteResponse {
        command: String,
        got: usize,
        expected: usize,
    },

    /// The mandatory quantity produced no samples during a whole cycle.
    #[error("insufficient data: no {quantity} samples collected")]
    InsufficientData { quantity: &'static str },

    /// A conversion was asked for a value outside its domain.
    #[error("{quantity} input {value} is out of domain")]
    OutOfDomain { quantity: &'static str, value: i64 },

    /// An I/O fault that persisted after the single reconnect-and-retry.
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, CloudWatcherError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incomplete_response_reports_counts() {
        let err = CloudWatcherError::IncompleteResponse {
            command: "S!".to_string(),
            got: 15,
            expected: 30,
        };
        assert_eq!(
            err.to_string(),
            "incomplete response for S!: got 15/30 bytes"
        );
    }

    #[test]
    fn io_errors_convert_to_transport() {
        let err: CloudWatcherError = io::Error::new(io::ErrorKind::BrokenPipe, "gone").into();
        assert!(matches!(err, CloudWatcherError::Transport(_)));
    }
}
