//! Error types for the sync engine.
//!
//! `ErrorModel` is the closed set of outcomes an [`Uploader`](crate::Uploader) can
//! return; classification into retryable vs. permanent drives the state machine in
//! [`crate::engine`]. `SyncError` is the separate, ambient error type surfaced by
//! [`ResponseStore`](crate::ResponseStore) implementations — it never reaches a
//! `sync()` caller directly (see `drain`, which converts store failures into a
//! `StopReason::FatalError`).

use std::fmt;

/// Closed sum of upload outcomes. Construct directly; this type has no
/// hidden variants and adding one is a breaking change (see spec Design Notes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorModel {
    /// Host unreachable; no request left the device.
    NoInternet,
    /// Request dispatched but no response before the transport deadline.
    Timeout,
    /// Peer responded with a non-success status code.
    ServerError(u16, Option<String>),
    /// Payload could not be encoded or decoded.
    Serialization(Option<String>),
    /// Any other failure.
    Unknown(Option<String>),
}

impl ErrorModel {
    /// Total, pure classification function. Must never consult external state.
    pub fn is_retryable(&self) -> bool {
        match self {
            ErrorModel::NoInternet => true,
            ErrorModel::Timeout => true,
            ErrorModel::ServerError(code, _) => (500..=599).contains(code),
            ErrorModel::Serialization(_) => false,
            ErrorModel::Unknown(_) => false,
        }
    }

    /// True for a 5xx [`ErrorModel::ServerError`].
    pub fn is_server_5xx(&self) -> bool {
        matches!(self, ErrorModel::ServerError(code, _) if (500..=599).contains(code))
    }
}

impl fmt::Display for ErrorModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorModel::NoInternet => write!(f, "no internet connection"),
            ErrorModel::Timeout => write!(f, "upload timed out"),
            ErrorModel::ServerError(code, Some(msg)) => {
                write!(f, "server error {code}: {msg}")
            }
            ErrorModel::ServerError(code, None) => write!(f, "server error {code}"),
            ErrorModel::Serialization(Some(cause)) => {
                write!(f, "serialization failure: {cause}")
            }
            ErrorModel::Serialization(None) => write!(f, "serialization failure"),
            ErrorModel::Unknown(Some(cause)) => write!(f, "unknown failure: {cause}"),
            ErrorModel::Unknown(None) => write!(f, "unknown failure"),
        }
    }
}

impl std::error::Error for ErrorModel {}

/// Error surfaced by a [`ResponseStore`](crate::ResponseStore) implementation.
/// Fatal to a drain: `drain()` aborts and reports it as
/// `StopReason::FatalError(ErrorModel::Unknown(..))`, never as a returned `Result::Err`.
#[derive(Debug, Clone)]
pub struct SyncError {
    message: String,
}

impl SyncError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for SyncError {}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for SyncError {
    fn from(err: rusqlite::Error) -> Self {
        SyncError::new(err.to_string())
    }
}

#[cfg(feature = "sqlite")]
impl From<r2d2::Error> for SyncError {
    fn from(err: r2d2::Error) -> Self {
        SyncError::new(err.to_string())
    }
}
