//! Error types for device sessions, command execution and the API client.
//!
//! [`ExecError`] covers everything that can go wrong between receiving a
//! credential set and returning command output. [`ClientError`] is what the
//! HTTP SDK in [`crate::client`] reports.

use thiserror::Error;

/// Errors that can occur while validating a request or talking to a device.
#[derive(Error, Debug)]
pub enum ExecError {
    /// The request itself is unusable: missing field, empty command list,
    /// unknown device or connection type.
    #[error("{0}")]
    Validation(String),

    /// The transport handshake or login did not succeed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Connecting to the device took longer than the credential timeout.
    #[error("connection to {addr} timed out after {secs}s")]
    Timeout { addr: String, secs: u64 },

    /// The session was used before `connect` succeeded or after `disconnect`.
    #[error("no active connection")]
    NotConnected,

    /// The remote side closed the shell channel.
    #[error("channel closed by device")]
    ChannelClosed,

    /// An error occurred in the async-ssh2-tokio library.
    #[error("ssh error: {0}")]
    Ssh2Error(#[from] async_ssh2_tokio::Error),

    /// An error occurred in the russh library.
    #[error("russh error: {0}")]
    RusshError(#[from] russh::Error),

    /// Socket level failure on a Telnet session.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExecError {
    /// Shorthand for building a [`ExecError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        ExecError::Validation(msg.into())
    }

    /// Returns true for caller mistakes (4xx), false for device/transport failures.
    pub fn is_validation(&self) -> bool {
        matches!(self, ExecError::Validation(_))
    }
}

/// Errors returned by [`crate::client::NetOpsClient`].
#[derive(Error, Debug)]
pub enum ClientError {
    /// The request did not complete within the client timeout.
    #[error("request timeout after {0}s")]
    Timeout(u64),

    /// The server could not be reached at all.
    #[error("cannot connect to {0}")]
    Connect(String),

    /// The server answered with a non-success HTTP status.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The client could not be built from the given settings.
    #[error("invalid client configuration: {0}")]
    Config(String),

    /// The server answered 200 but reported `success: false`.
    #[error("{0}")]
    Api(String),

    /// Any other transport or decoding failure.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Writing a downloaded result to disk failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
