// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dials the broker endpoint and hands back a channel the [`ConnectionManager`]
//! builds its [`proto::push_client::PushClient`] stub on.
//!
//! [`ConnectionManager`]: crate::connection::ConnectionManager

use tonic::transport::Channel;

use crate::error::PushError;

use super::proto;

/// Produces a connected [`Channel`] for one dial attempt. Abstracted behind
/// a trait so tests can substitute an in-process channel instead of
/// dialing a real socket, by connecting a tonic client against a locally
/// bound server.
#[tonic::async_trait]
pub trait RpcDialer: Send + Sync {
    async fn dial(&self) -> Result<Channel, PushError>;
}

/// Dials a broker reachable at a fixed HTTP(S) endpoint.
pub struct EndpointDialer {
    endpoint: String,
}

impl EndpointDialer {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self { endpoint: endpoint.into() }
    }
}

#[tonic::async_trait]
impl RpcDialer for EndpointDialer {
    async fn dial(&self) -> Result<Channel, PushError> {
        let endpoint = Channel::from_shared(self.endpoint.clone())
            .map_err(|e| PushError::transport(format!("invalid endpoint {:?}: {e}", self.endpoint)))?;
        let channel = endpoint.connect().await?;
        Ok(channel)
    }
}

pub type PushStub = proto::push_client::PushClient<Channel>;

pub fn stub(channel: Channel) -> PushStub {
    proto::push_client::PushClient::new(channel)
}
