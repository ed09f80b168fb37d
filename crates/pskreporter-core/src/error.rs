//! Error types for the spot client.
//!
//! All fallible operations across the workspace return [`Result<T>`], which
//! uses [`Error`] as the error type. Transport failures, wire encoding and
//! decoding failures, and client lifecycle errors are all captured here.

/// The error type for all spot client operations.
///
/// Transport errors are normally handled inside the background scheduler
/// (logged and retried); callers of `feed` only ever see lifecycle errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A transport-level error (dial or datagram write failed).
    #[error("transport error: {0}")]
    Transport(String),

    /// A value cannot be represented in the IPFIX wire format.
    ///
    /// Raised for strings longer than the 255-byte length prefix and for
    /// frequencies that do not fit the 4-byte frequency field.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// A received message is malformed (used when decoding IPFIX).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// An invalid parameter was passed when building the client.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A bounded wait elapsed, e.g. the shutdown acknowledgment never arrived.
    #[error("timeout waiting for the background task")]
    Timeout,

    /// The background task is no longer running.
    #[error("not connected")]
    NotConnected,

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_transport() {
        let e = Error::Transport("connection refused".into());
        assert_eq!(e.to_string(), "transport error: connection refused");
    }

    #[test]
    fn error_display_encoding() {
        let e = Error::Encoding("callsign is 300 bytes".into());
        assert_eq!(e.to_string(), "encoding error: callsign is 300 bytes");
    }

    #[test]
    fn error_display_protocol() {
        let e = Error::Protocol("set length 3 is shorter than its header".into());
        assert_eq!(
            e.to_string(),
            "protocol error: set length 3 is shorter than its header"
        );
    }

    #[test]
    fn error_display_invalid_parameter() {
        let e = Error::InvalidParameter("collector address is empty".into());
        assert_eq!(e.to_string(), "invalid parameter: collector address is empty");
    }

    #[test]
    fn error_display_timeout() {
        assert_eq!(
            Error::Timeout.to_string(),
            "timeout waiting for the background task"
        );
    }

    #[test]
    fn error_display_not_connected() {
        assert_eq!(Error::NotConnected.to_string(), "not connected");
    }

    #[test]
    fn error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let e: Error = io_err.into();
        assert!(matches!(e, Error::Io(_)));
        assert!(e.to_string().contains("refused"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}
        assert_send::<Error>();
        assert_sync::<Error>();
    }

    #[test]
    fn error_implements_std_error() {
        fn assert_std_error<T: std::error::Error>() {}
        assert_std_error::<Error>();
    }
}
