// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection lifecycle: `Idle → Dialing → Authenticating → Connected →
//! Disconnected → Dialing …`, terminated by `Shutdown`. Constant-interval
//! reconnect backoff, a ping loop while connected, and the one-shot
//! `skip_retry_connect` suppression for permanent auth failures.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::PushError;
use crate::timeout::with_timeout;
use crate::wire::grpc::{stub, PushStub, RpcDialer};
use crate::wire::proto;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Dialing,
    Authenticating,
    Connected,
    Disconnected,
}

/// Callback contract the connection manager drives. The owner (normally
/// [`crate::client::PushClient`]) authenticates inside `on_connect` and
/// returns an [`ErrorKind::AuthPermanent`] error to reject the connection
/// permanently rather than trigger a retry.
///
/// [`ErrorKind::AuthPermanent`]: crate::error::ErrorKind::AuthPermanent
#[tonic::async_trait]
pub trait ConnectionEvents: Send + Sync {
    async fn on_connect(&self, stub: &mut PushStub) -> Result<(), PushError>;
    async fn on_disconnected(&self);
}

/// Owns the transport and drives the dial/auth/ping/reconnect lifecycle.
pub struct ConnectionManager<E> {
    dialer: Arc<dyn RpcDialer>,
    events: Arc<E>,
    config: Config,
    clock: Arc<dyn Clock>,
    state: Mutex<ConnectionState>,
    channel: Arc<tokio::sync::RwLock<Option<PushStub>>>,
    shutdown: Mutex<CancellationToken>,
    skip_retry_connect: Arc<AtomicBool>,
    reconnects: Arc<AtomicU64>,
}

impl<E: ConnectionEvents + 'static> ConnectionManager<E> {
    pub fn new(dialer: Arc<dyn RpcDialer>, events: Arc<E>, config: Config, reconnects: Arc<AtomicU64>) -> Arc<Self> {
        Self::with_clock(dialer, events, config, reconnects, Arc::new(SystemClock))
    }

    /// Same as [`Self::new`] but with an injectable [`Clock`], for tests that
    /// want to assert ordering without sleeping real wall-clock time.
    pub fn with_clock(
        dialer: Arc<dyn RpcDialer>,
        events: Arc<E>,
        config: Config,
        reconnects: Arc<AtomicU64>,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        Arc::new(Self {
            dialer,
            events,
            config,
            clock,
            state: Mutex::new(ConnectionState::Idle),
            channel: Arc::new(tokio::sync::RwLock::new(None)),
            shutdown: Mutex::new(CancellationToken::new()),
            skip_retry_connect: Arc::new(AtomicBool::new(false)),
            reconnects,
        })
    }

    /// Begins the connect/reconnect lifecycle. Non-blocking: returns once
    /// the background task is scheduled.
    pub fn connect(self: &Arc<Self>) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.run().await;
        });
    }

    /// Idempotent: a second call is a no-op.
    pub fn shutdown(&self) {
        self.shutdown_token().cancel();
        self.set_state(ConnectionState::Disconnected);
    }

    /// Re-arms the lifecycle after a shutdown so a subsequent [`connect`]
    /// starts a fresh dial loop. Used by [`crate::client::PushClient::reset`].
    ///
    /// [`connect`]: Self::connect
    pub fn rearm(&self) {
        *self.shutdown.lock().unwrap_or_else(|e| e.into_inner()) = CancellationToken::new();
        self.skip_retry_connect.store(false, Ordering::SeqCst);
        self.set_state(ConnectionState::Idle);
    }

    /// The current shutdown signal. Cloning it is cheap; callers (e.g.
    /// [`crate::client::PushClient`]'s broadcast-subscription task) can
    /// `select!` on `.cancelled()` to stop promptly without a second
    /// shutdown channel.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown_token().is_cancelled()
    }

    pub fn is_connected(&self) -> bool {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) == ConnectionState::Connected
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }

    /// Acquires the current stub, if connected. The connection lock is
    /// held only for the clone, never across the RPC itself.
    pub async fn current_stub(&self) -> Option<PushStub> {
        self.channel.read().await.clone()
    }

    async fn run(self: Arc<Self>) {
        let mut first_connect = true;
        loop {
            if self.shutdown_token().is_cancelled() {
                return;
            }

            self.set_state(ConnectionState::Dialing);
            let dial_result = self.dialer.dial().await;
            let channel = match dial_result {
                Ok(channel) => channel,
                Err(err) => {
                    tracing::debug!(error = %err, "dial failed");
                    if !self.backoff_or_shutdown().await {
                        return;
                    }
                    continue;
                }
            };

            self.set_state(ConnectionState::Authenticating);
            let mut candidate = stub(channel);
            match self.events.on_connect(&mut candidate).await {
                Ok(()) => {
                    if !first_connect {
                        self.reconnects.fetch_add(1, Ordering::Relaxed);
                    }
                    first_connect = false;
                    *self.channel.write().await = Some(candidate);
                    self.set_state(ConnectionState::Connected);
                }
                Err(err) => {
                    tracing::warn!(error = %err, "connect rejected");
                    if err.kind().is_auth_permanent() {
                        self.skip_retry_connect.store(true, Ordering::SeqCst);
                    }
                    self.events.on_disconnected().await;
                    self.set_state(ConnectionState::Disconnected);
                    if self.skip_retry_connect.swap(false, Ordering::SeqCst) {
                        return;
                    }
                    if !self.backoff_or_shutdown().await {
                        return;
                    }
                    continue;
                }
            }

            self.run_ping_loop().await;
            *self.channel.write().await = None;
            self.set_state(ConnectionState::Disconnected);
            self.events.on_disconnected().await;

            if self.shutdown_token().is_cancelled() {
                return;
            }
        }
    }

    /// Sleeps `reconnect_interval`, interruptible by shutdown. Returns
    /// `false` if shutdown fired during the wait.
    async fn backoff_or_shutdown(&self) -> bool {
        let shutdown = self.shutdown_token();
        tokio::select! {
            _ = shutdown.cancelled() => false,
            _ = self.clock.after(self.config.reconnect_interval()) => true,
        }
    }

    /// Period = `ping_interval`, per-ping deadline = `ping_timeout`.
    /// Returns once the connection should be torn down, either by
    /// shutdown or a ping timeout.
    async fn run_ping_loop(&self) {
        loop {
            let shutdown = self.shutdown_token();
            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = self.clock.after(self.config.ping_interval()) => {}
            }

            if !self.is_connected() {
                continue;
            }

            let Some(mut active) = self.current_stub().await else { continue };
            let result =
                with_timeout(self.config.ping_timeout(), active.ping(proto::PingRequest {})).await;
            match result {
                Ok(_) => {}
                Err(err) if err.kind() == crate::error::ErrorKind::Timeout => {
                    tracing::warn!("ping timeout, reconnecting");
                    return;
                }
                Err(err) => {
                    tracing::debug!(error = %err, "ping failed");
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
