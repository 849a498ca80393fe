// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The orchestrator: drives sync/replay on connect, routes inbound broadcast
//! frames through the state machine and handler registry, exposes the
//! inject/dismiss write path, and publishes state snapshots to firehose
//! subscribers.
//!
//! [`PushClient`] installs itself as the [`ConnectionManager`]'s
//! [`ConnectionEvents`] through [`ConnectionEventsAdapter`], which holds only
//! a [`Weak`] reference back rather than a true ownership cycle.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use tokio::sync::Mutex;
use tokio_stream::StreamExt;

use crate::auth::SessionAuthenticator;
use crate::config::Config;
use crate::connection::{ConnectionEvents, ConnectionManager};
use crate::error::PushError;
use crate::handlers::{FirehoseHandler, HandlerRegistry, InBandHandler, SnapshotReason, SystemHandler};
use crate::ids::{MsgId, Uid};
use crate::item::{Category, Item};
use crate::message::{BroadcastFrame, InBandBody, InBandMessage, OutOfBandMessage, StateUpdate};
use crate::state::{State, StateMachine};
use crate::store::LocalStore;
use crate::timeout::with_timeout;
use crate::wire::grpc::{PushStub, RpcDialer};
use crate::wire::proto;

/// Predicate deciding whether a freshly-consumed in-band message should
/// trigger a `NEW_DATA` firehose push. Defaults to "always push".
pub type PushStateFilter = Box<dyn Fn(&InBandMessage) -> bool + Send + Sync>;

fn default_filter() -> PushStateFilter {
    Box::new(|_| true)
}

/// Point-in-time counters: how many reconnects happened, how many
/// repeats/handler failures were observed, how many range dismissals were
/// silently ignored, and how many times the unconditional `fresh_replay`
/// clear skipped a retry of the full dump after a sync error.
#[derive(Debug, Default)]
pub struct Metrics {
    reconnects: Arc<AtomicU64>,
    repeat_messages: AtomicU64,
    handler_errors: AtomicU64,
    range_dismissals_ignored: AtomicU64,
    fresh_replay_skipped_after_error: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub reconnects: u64,
    pub repeat_messages: u64,
    pub handler_errors: u64,
    pub range_dismissals_ignored: u64,
    pub fresh_replay_skipped_after_error: u64,
}

impl Metrics {
    fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            reconnects: self.reconnects.load(Ordering::Relaxed),
            repeat_messages: self.repeat_messages.load(Ordering::Relaxed),
            handler_errors: self.handler_errors.load(Ordering::Relaxed),
            range_dismissals_ignored: self.range_dismissals_ignored.load(Ordering::Relaxed),
            fresh_replay_skipped_after_error: self.fresh_replay_skipped_after_error.load(Ordering::Relaxed),
        }
    }
}

/// State guarded by the single PushClient lock: the handler registry, the
/// state machine, the current session, and `fresh_replay`.
struct ClientInner {
    state_machine: StateMachine,
    registry: HandlerRegistry,
    session_id: Vec<u8>,
    fresh_replay: bool,
    push_state_filter: PushStateFilter,
}

impl ClientInner {
    fn new(ring_capacity: usize) -> Self {
        Self {
            state_machine: StateMachine::with_ring_capacity(ring_capacity),
            registry: HandlerRegistry::new(),
            session_id: Vec::new(),
            fresh_replay: true,
            push_state_filter: default_filter(),
        }
    }
}

/// Orchestrates the push client lifecycle for one user. `P` supplies session
/// tokens, `L` persists state-machine snapshots between process runs.
pub struct PushClient<P, L> {
    uid: Uid,
    config: Config,
    authenticator: SessionAuthenticator<P>,
    store: Arc<L>,
    inner: Mutex<ClientInner>,
    connection: Arc<ConnectionManager<ConnectionEventsAdapter<P, L>>>,
    metrics: Metrics,
    shutdown: tokio_util::sync::CancellationToken,
    self_weak: Weak<PushClient<P, L>>,
}

impl<P, L> PushClient<P, L>
where
    P: crate::auth::SessionProvider + Send + Sync + 'static,
    L: LocalStore + Send + Sync + 'static,
{
    pub fn new(uid: Uid, dialer: Arc<dyn RpcDialer>, provider: P, store: L, config: Config) -> Arc<Self> {
        let reconnects = Arc::new(AtomicU64::new(0));
        let ring_capacity = config.ring_capacity;

        Arc::new_cyclic(|weak: &Weak<Self>| {
            let events = Arc::new(ConnectionEventsAdapter { client: weak.clone() });
            let connection = ConnectionManager::new(dialer, events, config.clone(), Arc::clone(&reconnects));
            Self {
                uid: uid.clone(),
                config,
                authenticator: SessionAuthenticator::new(provider, Some(uid)),
                store: Arc::new(store),
                inner: Mutex::new(ClientInner::new(ring_capacity)),
                connection,
                metrics: Metrics { reconnects, ..Metrics::default() },
                shutdown: tokio_util::sync::CancellationToken::new(),
                self_weak: weak.clone(),
            }
        })
    }

    /// Begins the connect/reconnect lifecycle and starts the periodic
    /// persistence task. Non-blocking.
    pub fn connect(self: &Arc<Self>) {
        self.connection.connect();
        self.spawn_persistence_loop();
    }

    /// Tears down the connection and stops the persistence loop. Idempotent.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        self.connection.shutdown();
    }

    /// Shuts down, re-arms the connection manager, and reconnects. Used to
    /// recover from a caller-detected logout/credential swap.
    pub fn reset(self: &Arc<Self>) {
        self.shutdown();
        self.connection.rearm();
        self.connect();
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Loads a persisted snapshot, if any. Failures are logged and
    /// non-fatal: the state machine stays empty and the next server sync
    /// restores consistency.
    pub async fn restore(&self) {
        match self.store.get(&self.uid).await {
            Ok(Some(blob)) => {
                let mut inner = self.inner.lock().await;
                if let Err(err) = inner.state_machine.restore(&blob) {
                    tracing::warn!(error = %err, "failed to restore persisted state, starting empty");
                }
            }
            Ok(None) => {}
            Err(err) => tracing::warn!(error = %err, "local store read failed, starting empty"),
        }
    }

    async fn save(&self) {
        let blob = {
            let inner = self.inner.lock().await;
            match inner.state_machine.save() {
                Ok(blob) => blob,
                Err(err) => {
                    tracing::warn!(error = %err, "failed to serialize state machine");
                    return;
                }
            }
        };
        if let Err(err) = self.store.put(&self.uid, blob).await {
            tracing::warn!(error = %err, "local store write failed");
        }
    }

    fn spawn_persistence_loop(self: &Arc<Self>) {
        let this = Arc::clone(self);
        let shutdown = self.shutdown.clone();
        let interval = self.config.save_interval();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => return,
                    _ = tokio::time::sleep(interval) => {}
                }
                this.save().await;
            }
        });
    }

    pub async fn push_in_band_handler(&self, handler: Arc<dyn InBandHandler>) {
        let mut inner = self.inner.lock().await;
        let was_connected = self.connection.is_connected();
        inner.registry.register_in_band(Arc::clone(&handler));

        // If already connected, immediately replay current state to the
        // newly registered handler so it doesn't miss items created before
        // it subscribed.
        if was_connected {
            for item in inner.state_machine.items_in_state() {
                let _ = handler.create(&item.category, &item).await;
            }
        }
    }

    pub async fn push_firehose_handler(&self, handler: Arc<dyn FirehoseHandler>) {
        let mut inner = self.inner.lock().await;
        let was_connected = self.connection.is_connected();
        inner.registry.register_firehose(Arc::clone(&handler));
        if was_connected {
            let items = inner.state_machine.items_in_state();
            handler.push_state(&items, SnapshotReason::Reconnected).await;
        }
    }

    pub async fn push_system_handler(&self, system: impl Into<String>, handler: Arc<dyn SystemHandler>) {
        let mut inner = self.inner.lock().await;
        inner.registry.register_system(system, handler);
    }

    pub async fn get_state(&self) -> State {
        self.inner.lock().await.state_machine.snapshot()
    }

    pub async fn set_push_state_filter(&self, filter: impl Fn(&InBandMessage) -> bool + Send + Sync + 'static) {
        self.inner.lock().await.push_state_filter = Box::new(filter);
    }

    /// Constructs and sends a Creation template. The write never mutates
    /// local state directly; the broker's echo through
    /// `SubscribeBroadcasts` is what commits it, guaranteeing local/remote
    /// convergence.
    pub async fn inject(&self, category: impl Into<Category>, body: Vec<u8>) -> Result<MsgId, PushError> {
        let msg_id = MsgId::generate();
        let item = Item::new(msg_id.clone(), category, body, 0);
        let msg = InBandMessage {
            uid: self.uid.clone(),
            ctime: 0,
            body: InBandBody::StateUpdate(StateUpdate::Creation(item)),
        };
        self.consume_message_rpc(msg).await?;
        Ok(msg_id)
    }

    pub async fn dismiss_item(&self, msg_id: MsgId) -> Result<(), PushError> {
        let msg = InBandMessage::dismissal_template(self.uid.clone(), msg_id);
        self.consume_message_rpc(msg).await
    }

    pub async fn inject_out_of_band_message(&self, system: impl Into<String>, body: Vec<u8>) -> Result<(), PushError> {
        let msg = OutOfBandMessage { uid: self.uid.clone(), system: system.into(), body };
        let mut stub = self.current_stub().await?;
        with_timeout(
            self.config.request_timeout(),
            stub.inject_out_of_band(proto::InjectOutOfBandRequest { message: Some(proto::OutOfBandMessage::from(&msg)) }),
        )
        .await?;
        Ok(())
    }

    async fn current_stub(&self) -> Result<PushStub, PushError> {
        self.connection.current_stub().await.ok_or_else(|| PushError::transport("not connected"))
    }

    async fn consume_message_rpc(&self, msg: InBandMessage) -> Result<(), PushError> {
        let mut stub = self.current_stub().await?;
        with_timeout(
            self.config.request_timeout(),
            stub.consume_message(proto::ConsumeMessageRequest { message: Some(proto::InBandMessage::from(&msg)) }),
        )
        .await?;
        Ok(())
    }

    /// The single inbound funnel for frames arriving off `SubscribeBroadcasts`.
    /// Holds the PushClient lock for the entire duration.
    pub async fn broadcast(&self, frame: BroadcastFrame) -> Result<(), PushError> {
        let mut inner = self.inner.lock().await;
        match frame {
            BroadcastFrame::InBand(msg) => {
                if let Some(id) = msg.msg_id() {
                    if inner.state_machine.contains(id) {
                        self.metrics.repeat_messages.fetch_add(1, Ordering::Relaxed);
                        // Firehose subscribers are not notified of repeats.
                        return Err(PushError::repeat(format!("msg_id {id} already applied")));
                    }
                }
                self.apply_and_dispatch(&mut inner, msg.clone()).await?;
                if (inner.push_state_filter)(&msg) {
                    let items = inner.state_machine.items_in_state();
                    inner.registry.push_state(&items, SnapshotReason::NewData).await;
                }
                Ok(())
            }
            BroadcastFrame::OutOfBand(msg) => inner.registry.dispatch_out_of_band(&msg).await,
        }
    }

    /// Applies `msg` to the state machine and dispatches the corresponding
    /// Create/Dismiss calls to every live in-band handler. Shared by live
    /// broadcast handling and sync replay.
    async fn apply_and_dispatch(&self, inner: &mut ClientInner, msg: InBandMessage) -> Result<(), PushError> {
        match &msg.body {
            InBandBody::StateSync(items) => {
                let items = items.clone();
                inner.state_machine.consume(msg)?;
                for item in items {
                    let errors = inner.registry.dispatch_create(&item.category, &item).await;
                    self.metrics.handler_errors.fetch_add(errors as u64, Ordering::Relaxed);
                }
            }
            InBandBody::StateUpdate(StateUpdate::Creation(item)) => {
                let item = item.clone();
                inner.state_machine.consume(msg)?;
                let errors = inner.registry.dispatch_create(&item.category, &item).await;
                self.metrics.handler_errors.fetch_add(errors as u64, Ordering::Relaxed);
            }
            InBandBody::StateUpdate(StateUpdate::Dismissal(dismissal)) => {
                let targets: Vec<_> = dismissal
                    .msg_ids
                    .iter()
                    .filter_map(|id| inner.state_machine.get(id).cloned())
                    .collect();
                if !dismissal.ranges.is_empty() {
                    self.metrics
                        .range_dismissals_ignored
                        .fetch_add(dismissal.ranges.len() as u64, Ordering::Relaxed);
                }
                inner.state_machine.consume(msg)?;
                for item in targets {
                    let errors = inner.registry.dispatch_dismiss(&item.category, &item).await;
                    self.metrics.handler_errors.fetch_add(errors as u64, Ordering::Relaxed);
                }
            }
        }
        Ok(())
    }

    /// Replays `msg` during sync. Errors are logged but never abort the
    /// replay — this is the only way the client makes progress after
    /// partial corruption.
    async fn replay_one(&self, inner: &mut ClientInner, msg: InBandMessage) {
        if let Err(err) = self.apply_and_dispatch(inner, msg).await {
            tracing::warn!(error = %err, "replay error, continuing");
        }
    }

    /// Runs inside [`ConnectionEventsAdapter::on_connect`]: authenticate,
    /// then sync/replay, then open the broadcast subscription. Holds the
    /// PushClient lock for the whole body.
    async fn handle_connect(&self, stub: &mut PushStub) -> Result<(), PushError> {
        if self.shutdown.is_cancelled() || self.connection.is_shutdown() {
            return Err(PushError::transport("shutdown in progress"));
        }

        let mut inner = self.inner.lock().await;

        let session = with_timeout(self.config.request_timeout(), self.authenticator.authenticate(stub)).await?;
        inner.session_id = session.session_id.clone();

        self.server_sync(&mut inner, stub).await;

        let items = inner.state_machine.items_in_state();
        inner.registry.push_state(&items, SnapshotReason::Reconnected).await;
        drop(inner);

        self.subscribe_broadcasts(stub, session.uid.clone(), session.session_id.clone()).await?;
        self.fire_reconnect_broadcast();

        Ok(())
    }

    /// Fresh replay (first sync since process start) asks for a full dump
    /// and replays every resulting item to every handler; otherwise it asks
    /// for messages since the current watermark and replays only those.
    /// `fresh_replay` is cleared unconditionally afterward, even on error,
    /// with the skip recorded as a metric.
    async fn server_sync(&self, inner: &mut ClientInner, stub: &mut PushStub) {
        let fresh = inner.fresh_replay;
        let since_ctime = if fresh { 0 } else { inner.state_machine.latest_ctime() };

        let result = with_timeout(
            self.config.request_timeout(),
            stub.sync(proto::SyncRequest { uid: self.uid.clone().into_bytes(), since_ctime }),
        )
        .await;

        match result {
            Ok(response) => {
                for proto_msg in response.into_inner().messages {
                    match InBandMessage::try_from(proto_msg) {
                        Ok(msg) => self.replay_one(inner, msg).await,
                        Err(err) => tracing::warn!(error = %err, "dropping malformed sync message"),
                    }
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "sync failed, proceeding with cached state");
                if fresh {
                    self.metrics.fresh_replay_skipped_after_error.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        inner.fresh_replay = false;
    }

    /// Opens the `SubscribeBroadcasts` stream and spawns a detached task
    /// that feeds every frame into [`Self::broadcast`]. The task outlives
    /// this call — it only ends when the stream closes or the connection
    /// shuts down. See DESIGN.md for why this stream stands in for a
    /// server-initiated broadcast.
    async fn subscribe_broadcasts(&self, stub: &mut PushStub, uid: Uid, session_id: Vec<u8>) -> Result<(), PushError> {
        let response = with_timeout(
            self.config.request_timeout(),
            stub.subscribe_broadcasts(proto::SubscribeBroadcastsRequest { uid: uid.into_bytes(), session_id }),
        )
        .await?;

        let Some(me) = self.self_weak.upgrade() else { return Ok(()) };
        let mut stream = response.into_inner();
        let shutdown = self.connection.shutdown_token();

        tokio::spawn(async move {
            loop {
                let frame = tokio::select! {
                    _ = shutdown.cancelled() => return,
                    frame = stream.next() => frame,
                };
                let Some(frame) = frame else { return };
                let frame = match frame {
                    Ok(frame) => frame,
                    Err(err) => {
                        tracing::debug!(error = %err, "broadcast stream error, awaiting reconnect");
                        return;
                    }
                };
                match BroadcastFrame::try_from(frame) {
                    Ok(frame) => {
                        if let Err(err) = me.broadcast(frame).await {
                            tracing::debug!(error = %err, "broadcast rejected");
                        }
                    }
                    Err(err) => tracing::warn!(error = %err, "dropping invalid broadcast frame"),
                }
            }
        });

        Ok(())
    }

    /// Synthesizes the `internal.reconnect` out-of-band broadcast so
    /// domain-specific handlers can refresh their own caches after a
    /// (re)sync. Fire-and-forget: allowed to outlive shutdown.
    fn fire_reconnect_broadcast(&self) {
        let Some(me) = self.self_weak.upgrade() else { return };
        let uid = self.uid.clone();
        tokio::spawn(async move {
            let msg = OutOfBandMessage { uid, system: "internal.reconnect".into(), body: Vec::new() };
            let _ = me.broadcast(BroadcastFrame::OutOfBand(msg)).await;
        });
    }
}

/// Bridges [`ConnectionEvents`] to [`PushClient`] through a [`Weak`]
/// reference, so the two types don't form an ownership cycle.
pub struct ConnectionEventsAdapter<P, L> {
    client: Weak<PushClient<P, L>>,
}

#[tonic::async_trait]
impl<P, L> ConnectionEvents for ConnectionEventsAdapter<P, L>
where
    P: crate::auth::SessionProvider + Send + Sync + 'static,
    L: LocalStore + Send + Sync + 'static,
{
    async fn on_connect(&self, stub: &mut PushStub) -> Result<(), PushError> {
        let Some(client) = self.client.upgrade() else {
            return Err(PushError::transport("client dropped"));
        };
        client.handle_connect(stub).await
    }

    async fn on_disconnected(&self) {}
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
