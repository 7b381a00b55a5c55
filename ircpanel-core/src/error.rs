//! Error types surfaced by the session controller.

use thiserror::Error;

/// Failure reported by the connection library.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct SessionError(#[from] anyhow::Error);

/// Why a connect request did not produce a session.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("nickname must not be empty")]
    EmptyNickname,
    #[error("nickname {0:?} contains whitespace")]
    InvalidNickname(String),
    #[error("channel name must not be empty")]
    EmptyChannel,
    #[error("channel name {0:?} contains a forbidden character")]
    InvalidChannel(String),
    #[error("already connected as {nick}")]
    AlreadyConnected { nick: String },
    #[error("connection attempt to {server} was cancelled")]
    Cancelled { server: String },
    #[error("could not connect to {server}: {source}")]
    Connection {
        server: String,
        #[source]
        source: SessionError,
    },
}

/// Why a channel message was not delivered.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("not joined to a channel yet")]
    NotJoined,
    #[error("message must be a single line (no CR, LF or NUL)")]
    InvalidText,
    #[error("send to {channel} failed: {source}")]
    Session {
        channel: String,
        #[source]
        source: SessionError,
    },
}
