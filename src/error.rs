use std::io;
use thiserror::Error;
use tracing::warn;

/// Every failure the framing core can surface. The display strings double as
/// the mnemonics carried by the `SimpleError` replies the session driver
/// emits for recoverable errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// The source drained and the buffer is empty: the peer closed cleanly.
    #[error("stream reached eof")]
    Eof,
    /// The source drained mid-frame, with unread bytes left over.
    #[error("not enough data to decode a full frame")]
    IncompleteFrame,
    /// An exact-size read could not be satisfied before the source drained.
    #[error("eof is seen and the internal buffer does not have enough data to fulfill the request")]
    NotEnoughData,
    /// The wire content violates the protocol grammar.
    #[error("invalid frame")]
    Invalid,
    /// A decimal field would not parse.
    #[error("cannot convert string to integer")]
    Atoi,
    #[error("reached frame nesting limit")]
    MaxDepth,
    /// Non-recoverable I/O error on the source.
    #[error("network error occurred")]
    Network,
}

impl FrameError {
    /// Whether the session must terminate. The remaining variants describe a
    /// malformed frame the peer can be told about.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FrameError::Eof
                | FrameError::IncompleteFrame
                | FrameError::NotEnoughData
                | FrameError::Network
        )
    }
}

impl From<io::Error> for FrameError {
    fn from(err: io::Error) -> Self {
        warn!("io error on the source stream: {}", err);
        FrameError::Network
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_classification() {
        assert!(FrameError::Eof.is_fatal());
        assert!(FrameError::IncompleteFrame.is_fatal());
        assert!(FrameError::NotEnoughData.is_fatal());
        assert!(FrameError::Network.is_fatal());
        assert!(!FrameError::Invalid.is_fatal());
        assert!(!FrameError::Atoi.is_fatal());
        assert!(!FrameError::MaxDepth.is_fatal());
    }

    #[test]
    fn io_errors_map_to_network() {
        let err = io::Error::new(io::ErrorKind::ConnectionReset, "reset");
        assert_eq!(FrameError::Network, FrameError::from(err));
    }
}
