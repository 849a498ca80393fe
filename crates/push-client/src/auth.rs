// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authentication: exchanges a caller-supplied session token for the UID
//! and session id the broker binds the connection to.

use crate::error::{ErrorKind, PushError};
use crate::ids::Uid;
use crate::wire::grpc::PushStub;
use crate::wire::proto;

/// Supplies the bearer token sent on every `Authenticate` call. Implemented
/// by callers so the client never has an opinion on how tokens are minted
/// or refreshed.
#[tonic::async_trait]
pub trait SessionProvider: Send + Sync {
    async fn session_token(&self) -> Result<String, PushError>;
}

/// A provider returning a fixed token, for tests and simple deployments.
pub struct StaticTokenProvider(String);

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[tonic::async_trait]
impl SessionProvider for StaticTokenProvider {
    async fn session_token(&self) -> Result<String, PushError> {
        Ok(self.0.clone())
    }
}

/// Outcome of a successful authenticate call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub uid: Uid,
    pub session_id: Vec<u8>,
}

/// Performs the `Authenticate` RPC and enforces the two fatal-auth
/// invariants: an empty token never reaches the broker, and a UID returned
/// for a session that doesn't match the caller's expected UID is always a
/// permanent failure (never retried).
pub struct SessionAuthenticator<P> {
    provider: P,
    expected_uid: Option<Uid>,
}

impl<P: SessionProvider> SessionAuthenticator<P> {
    pub fn new(provider: P, expected_uid: Option<Uid>) -> Self {
        Self { provider, expected_uid }
    }

    pub async fn authenticate(&self, stub: &mut PushStub) -> Result<AuthSession, PushError> {
        let token = self.provider.session_token().await?;
        if token.is_empty() {
            return Err(PushError::new(ErrorKind::AuthPermanent, "session token is empty"));
        }

        let response = stub
            .authenticate(proto::AuthenticateRequest { session_token: token.into_bytes() })
            .await?
            .into_inner();
        let uid = Uid::from_bytes(response.uid);

        if let Some(expected) = &self.expected_uid {
            if expected != &uid {
                return Err(PushError::new(
                    ErrorKind::AuthPermanent,
                    format!("authenticate returned uid {uid} but expected {expected}"),
                ));
            }
        }

        Ok(AuthSession { uid, session_id: response.session_id })
    }
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
