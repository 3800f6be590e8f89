use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

/// Type alias to [`Result<T, Error>`](std::result::Result).
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error type of this crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("Invalid transfer mode")]
    InvalidMode,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to bind socket: {0}")]
    Bind(#[source] std::io::Error),

    #[error("Path '{}' is not a directory", .0.display())]
    NotDir(PathBuf),

    #[error("Cannot open '{0}': {1}")]
    Open(String, #[source] crate::io::OpenError),

    #[error("No response from {0} after {1} sends")]
    NoResponse(SocketAddr, u32),

    #[error("Peer reported error {0}: {1}")]
    Peer(u16, String),
}

/// Ways a datagram can fail to decode into a [`Packet`](crate::packet::Packet).
///
/// Malformed inbound packets are dropped silently by the transfer engine;
/// this taxonomy mostly matters for direct users of the codec.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Packet is truncated")]
    TruncatedInput,

    #[error("Packet has trailing bytes")]
    TrailingData,

    #[error("Unknown opcode: {0}")]
    UnknownOpcode(u16),
}

impl<'a> From<nom::Err<nom::error::Error<&'a [u8]>>> for DecodeError {
    fn from(_error: nom::Err<nom::error::Error<&'a [u8]>>) -> DecodeError {
        DecodeError::TruncatedInput
    }
}
