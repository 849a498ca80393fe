// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unified error taxonomy for the push client.
//!
//! One flat enum, not a tree of nested error types — callers match on
//! [`PushError::kind`] rather than downcasting.

use std::fmt;

/// Error kinds the push client can surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// An outbound RPC exceeded its per-call deadline.
    Timeout,
    /// Dial failure, stream EOF, or framing error.
    Transport,
    /// Empty session token or UID mismatch on authenticate. Disables retry
    /// for exactly one reconnect attempt.
    AuthPermanent,
    /// An in-band message whose MsgID is already present in state.
    Repeat,
    /// An out-of-band message whose system tag matches no handler.
    UnhandledSystem,
    /// A registered handler returned an error.
    HandlerFailure,
    /// The local store failed to read or write.
    Persistence,
    /// A broadcast frame had neither an in-band nor out-of-band body.
    InvalidMessage,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "TIMEOUT",
            Self::Transport => "TRANSPORT",
            Self::AuthPermanent => "AUTH_PERMANENT",
            Self::Repeat => "REPEAT",
            Self::UnhandledSystem => "UNHANDLED_SYSTEM",
            Self::HandlerFailure => "HANDLER_FAILURE",
            Self::Persistence => "PERSISTENCE",
            Self::InvalidMessage => "INVALID_MESSAGE",
        }
    }

    /// Whether this kind should suppress the next reconnect attempt via
    /// the one-shot `skip_retry_connect` flag.
    pub fn is_auth_permanent(&self) -> bool {
        matches!(self, Self::AuthPermanent)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A push-client error: a kind plus a human-readable message.
#[derive(Debug, Clone)]
pub struct PushError {
    kind: ErrorKind,
    message: String,
}

impl PushError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, message)
    }

    pub fn auth_permanent(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AuthPermanent, message)
    }

    pub fn repeat(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Repeat, message)
    }

    pub fn unhandled_system(system: &str) -> Self {
        Self::new(ErrorKind::UnhandledSystem, format!("no handler for system {system:?}"))
    }

    pub fn invalid_message(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidMessage, message)
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Persistence, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for PushError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for PushError {}

impl From<tonic::Status> for PushError {
    fn from(status: tonic::Status) -> Self {
        match status.code() {
            tonic::Code::DeadlineExceeded => Self::timeout(status.message().to_owned()),
            tonic::Code::Unauthenticated => Self::auth_permanent(status.message().to_owned()),
            _ => Self::transport(format!("{}: {}", status.code(), status.message())),
        }
    }
}

impl From<tonic::transport::Error> for PushError {
    fn from(err: tonic::transport::Error) -> Self {
        Self::transport(err.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for PushError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Self::timeout("deadline exceeded")
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
