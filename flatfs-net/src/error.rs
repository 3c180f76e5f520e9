use flatfs::FsError;
use thiserror::Error;

/// Problems with the bytes on the wire.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("connection closed")]
    Closed,
    #[error("connection closed in the middle of a response")]
    UnexpectedEof,
    #[error("malformed response header: {0}")]
    MalformedHeader(String),
    #[error("unknown status code {0}")]
    UnknownStatus(u16),
    #[error("request line longer than {0} bytes")]
    RequestTooLong(usize),
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a server session stopped early.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("file system fault: {0}")]
    Fs(#[from] FsError),
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot accept clients: {0}")]
    Accept(#[source] std::io::Error),
}

impl SessionError {
    /// True when only the client connection is affected and the server can go
    /// on to the next one.
    pub fn is_client_fault(&self) -> bool {
        matches!(self, SessionError::Protocol(_) | SessionError::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn only_client_side_errors_let_the_server_continue() {
        let reset = Error::new(ErrorKind::ConnectionReset, "reset");
        assert!(SessionError::Io(reset).is_client_fault());
        assert!(SessionError::Protocol(ProtocolError::RequestTooLong(1024)).is_client_fault());

        let listener = Error::new(ErrorKind::Other, "too many open files");
        assert!(!SessionError::Accept(listener).is_client_fault());
        assert!(!SessionError::Fs(FsError::Corrupt(3)).is_client_fault());
    }
}
