// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client library for a session-oriented push-notification broker: dials
//! the broker over gRPC, authenticates, replays missed state on connect,
//! and routes inbound in-band and out-of-band messages to registered
//! handlers while exposing a small write path for injecting and
//! dismissing items.
//!
//! [`client::PushClient`] is the entry point; everything else is either a
//! type it hands back to callers or a trait callers implement to plug in
//! their own token source, local persistence, or message handling.

pub mod auth;
pub mod client;
pub mod clock;
pub mod config;
pub mod connection;
pub mod error;
pub mod handlers;
pub mod ids;
pub mod item;
pub mod message;
pub mod ring;
pub mod state;
pub mod store;
pub mod timeout;
pub mod wire;

pub use auth::{AuthSession, SessionAuthenticator, SessionProvider, StaticTokenProvider};
pub use client::{Metrics, MetricsSnapshot, PushClient, PushStateFilter};
pub use config::Config;
pub use error::{ErrorKind, PushError};
pub use handlers::{FirehoseHandler, HandlerOutcome, InBandHandler, SnapshotReason, SystemHandler};
pub use ids::{DeviceId, MsgId, Uid};
pub use item::{Category, Item};
pub use message::{BroadcastFrame, Dismissal, InBandBody, InBandMessage, OutOfBandMessage, StateUpdate, TimeCategoryRange};
pub use state::State;
pub use store::{LocalStore, MemoryStore};
pub use wire::grpc::{EndpointDialer, RpcDialer};
