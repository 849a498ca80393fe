// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subscriber registry: in-band handlers (per-category Create/Dismiss) and
//! firehose handlers (whole-state snapshots). Dispatch is synchronous and
//! serial; liveness pruning happens once per dispatch pass.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::PushError;
use crate::item::{Category, Item};
use crate::message::OutOfBandMessage;

/// Why a state snapshot was pushed to firehose subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotReason {
    /// Emitted after a full or incremental replay on (re)connect.
    Reconnected,
    /// Emitted after a broadcast whose `pushStateFilter` accepted the message.
    NewData,
}

/// Result of a single handler callback. `Silent` is a pass with no
/// logging; `Handled` succeeded; `HandledWithError` is logged as a
/// warning but never aborts dispatch.
pub enum HandlerOutcome {
    Silent,
    Handled,
    HandledWithError(PushError),
}

#[tonic::async_trait]
pub trait InBandHandler: Send + Sync {
    fn name(&self) -> &str;
    fn is_alive(&self) -> bool;
    async fn create(&self, category: &Category, item: &Item) -> HandlerOutcome;
    async fn dismiss(&self, category: &Category, item: &Item) -> HandlerOutcome;
}

#[tonic::async_trait]
pub trait FirehoseHandler: Send + Sync {
    fn name(&self) -> &str;
    fn is_alive(&self) -> bool;
    async fn push_state(&self, items: &[Item], reason: SnapshotReason);
    async fn push_out_of_band(&self, msg: &OutOfBandMessage);
}

/// Handles out-of-band messages for one `system` tag. Not named in the
/// core's external-interface surface alongside in-band/firehose handlers,
/// but required to make §4.3.3's "dispatch to the system handler matching
/// msg.System" and its `UnhandledSystem` error concrete; see DESIGN.md.
#[tonic::async_trait]
pub trait SystemHandler: Send + Sync {
    fn is_alive(&self) -> bool;
    async fn handle(&self, msg: &OutOfBandMessage) -> HandlerOutcome;
}

#[derive(Default)]
pub struct HandlerRegistry {
    in_band: Vec<Arc<dyn InBandHandler>>,
    firehose: Vec<Arc<dyn FirehoseHandler>>,
    system: HashMap<String, Arc<dyn SystemHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler`. If the client is already connected, the
    /// caller is responsible for immediately replaying current state to
    /// the new handler; this method only appends.
    pub fn register_in_band(&mut self, handler: Arc<dyn InBandHandler>) {
        self.in_band.push(handler);
    }

    pub fn register_firehose(&mut self, handler: Arc<dyn FirehoseHandler>) {
        self.firehose.push(handler);
    }

    pub fn register_system(&mut self, system: impl Into<String>, handler: Arc<dyn SystemHandler>) {
        self.system.insert(system.into(), handler);
    }

    pub fn in_band_handlers(&self) -> &[Arc<dyn InBandHandler>] {
        &self.in_band
    }

    pub fn firehose_handlers(&self) -> &[Arc<dyn FirehoseHandler>] {
        &self.firehose
    }

    /// Returns the number of handlers that answered with
    /// `HandledWithError`, so callers can fold it into their own metrics.
    pub async fn dispatch_create(&mut self, category: &Category, item: &Item) -> usize {
        let mut errors = 0;
        for handler in &self.in_band {
            match handler.create(category, item).await {
                HandlerOutcome::Silent => {}
                HandlerOutcome::Handled => {
                    tracing::debug!(handler = handler.name(), "in-band handler processed creation");
                }
                HandlerOutcome::HandledWithError(err) => {
                    errors += 1;
                    tracing::warn!(handler = handler.name(), error = %err, "in-band handler error on creation");
                }
            }
        }
        self.prune();
        errors
    }

    pub async fn dispatch_dismiss(&mut self, category: &Category, item: &Item) -> usize {
        let mut errors = 0;
        for handler in &self.in_band {
            match handler.dismiss(category, item).await {
                HandlerOutcome::Silent => {}
                HandlerOutcome::Handled => {
                    tracing::debug!(handler = handler.name(), "in-band handler processed dismissal");
                }
                HandlerOutcome::HandledWithError(err) => {
                    errors += 1;
                    tracing::warn!(handler = handler.name(), error = %err, "in-band handler error on dismissal");
                }
            }
        }
        self.prune();
        errors
    }

    pub async fn push_state(&mut self, items: &[Item], reason: SnapshotReason) {
        for handler in &self.firehose {
            handler.push_state(items, reason).await;
        }
        self.prune();
    }

    pub async fn push_out_of_band(&mut self, msg: &OutOfBandMessage) {
        for handler in &self.firehose {
            handler.push_out_of_band(msg).await;
        }
        self.prune();
    }

    /// Mirrors `msg` to firehose subscribers, then dispatches it to the
    /// system handler registered for `msg.system`. Returns
    /// [`PushError`] with [`crate::error::ErrorKind::UnhandledSystem`] if
    /// no live handler is registered for that tag.
    pub async fn dispatch_out_of_band(&mut self, msg: &OutOfBandMessage) -> Result<(), PushError> {
        self.push_out_of_band(msg).await;

        let outcome = match self.system.get(&msg.system) {
            Some(handler) if handler.is_alive() => handler.handle(msg).await,
            _ => return Err(PushError::unhandled_system(&msg.system)),
        };

        match outcome {
            HandlerOutcome::Silent => {}
            HandlerOutcome::Handled => {
                tracing::debug!(system = %msg.system, "system handler processed message");
            }
            HandlerOutcome::HandledWithError(err) => {
                tracing::warn!(system = %msg.system, error = %err, "system handler error");
            }
        }
        self.prune();
        Ok(())
    }

    fn prune(&mut self) {
        self.in_band.retain(|h| h.is_alive());
        self.firehose.retain(|h| h.is_alive());
        self.system.retain(|_, h| h.is_alive());
    }
}

#[cfg(test)]
#[path = "handlers_tests.rs"]
mod tests;
