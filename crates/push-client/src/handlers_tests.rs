// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use super::*;
use crate::ids::MsgId;

struct CountingHandler {
    alive: AtomicBool,
    creates: AtomicUsize,
    dismisses: AtomicUsize,
}

impl CountingHandler {
    fn new() -> Self {
        Self { alive: AtomicBool::new(true), creates: AtomicUsize::new(0), dismisses: AtomicUsize::new(0) }
    }
}

#[tonic::async_trait]
impl InBandHandler for CountingHandler {
    fn name(&self) -> &str {
        "counting"
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    async fn create(&self, _category: &Category, _item: &Item) -> HandlerOutcome {
        self.creates.fetch_add(1, Ordering::SeqCst);
        HandlerOutcome::Handled
    }

    async fn dismiss(&self, _category: &Category, _item: &Item) -> HandlerOutcome {
        self.dismisses.fetch_add(1, Ordering::SeqCst);
        HandlerOutcome::Handled
    }
}

fn item() -> Item {
    Item::new(MsgId::from_bytes(vec![1]), "inbox", vec![], 1)
}

#[tokio::test]
async fn dispatch_create_invokes_every_live_handler() {
    let mut registry = HandlerRegistry::new();
    let handler = Arc::new(CountingHandler::new());
    registry.register_in_band(handler.clone());

    registry.dispatch_create(&"inbox".to_string(), &item()).await;
    assert_eq!(handler.creates.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn dispatch_continues_after_handler_error() {
    struct FailingHandler;
    #[tonic::async_trait]
    impl InBandHandler for FailingHandler {
        fn name(&self) -> &str {
            "failing"
        }
        fn is_alive(&self) -> bool {
            true
        }
        async fn create(&self, _category: &Category, _item: &Item) -> HandlerOutcome {
            HandlerOutcome::HandledWithError(PushError::invalid_message("boom"))
        }
        async fn dismiss(&self, _category: &Category, _item: &Item) -> HandlerOutcome {
            HandlerOutcome::Silent
        }
    }

    let mut registry = HandlerRegistry::new();
    let failing = Arc::new(FailingHandler);
    let counting = Arc::new(CountingHandler::new());
    registry.register_in_band(failing);
    registry.register_in_band(counting.clone());

    registry.dispatch_create(&"inbox".to_string(), &item()).await;
    assert_eq!(counting.creates.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn dead_handler_is_pruned_after_dispatch() {
    let mut registry = HandlerRegistry::new();
    let handler = Arc::new(CountingHandler::new());
    registry.register_in_band(handler.clone());

    handler.alive.store(false, Ordering::SeqCst);
    registry.dispatch_create(&"inbox".to_string(), &item()).await;

    assert!(registry.in_band_handlers().is_empty());
}

struct CountingFirehose {
    alive: AtomicBool,
    state_pushes: AtomicUsize,
    oob_pushes: AtomicUsize,
}

impl CountingFirehose {
    fn new() -> Self {
        Self { alive: AtomicBool::new(true), state_pushes: AtomicUsize::new(0), oob_pushes: AtomicUsize::new(0) }
    }
}

#[tonic::async_trait]
impl FirehoseHandler for CountingFirehose {
    fn name(&self) -> &str {
        "firehose"
    }
    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
    async fn push_state(&self, _items: &[Item], _reason: SnapshotReason) {
        self.state_pushes.fetch_add(1, Ordering::SeqCst);
    }
    async fn push_out_of_band(&self, _msg: &OutOfBandMessage) {
        self.oob_pushes.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn firehose_receives_state_and_out_of_band_pushes() {
    let mut registry = HandlerRegistry::new();
    let firehose = Arc::new(CountingFirehose::new());
    registry.register_firehose(firehose.clone());

    registry.push_state(&[item()], SnapshotReason::NewData).await;
    registry
        .push_out_of_band(&OutOfBandMessage {
            uid: crate::ids::Uid::from_bytes(vec![1]),
            system: "internal.reconnect".into(),
            body: vec![],
        })
        .await;

    assert_eq!(firehose.state_pushes.load(Ordering::SeqCst), 1);
    assert_eq!(firehose.oob_pushes.load(Ordering::SeqCst), 1);
}

struct EchoSystemHandler {
    calls: AtomicUsize,
}

#[tonic::async_trait]
impl SystemHandler for EchoSystemHandler {
    fn is_alive(&self) -> bool {
        true
    }
    async fn handle(&self, _msg: &OutOfBandMessage) -> HandlerOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        HandlerOutcome::Handled
    }
}

fn oob(system: &str) -> OutOfBandMessage {
    OutOfBandMessage { uid: crate::ids::Uid::from_bytes(vec![1]), system: system.into(), body: vec![] }
}

#[tokio::test]
async fn dispatch_out_of_band_routes_to_matching_system_handler() {
    let mut registry = HandlerRegistry::new();
    let handler = Arc::new(EchoSystemHandler { calls: AtomicUsize::new(0) });
    registry.register_system("chat.activity", handler.clone());

    registry.dispatch_out_of_band(&oob("chat.activity")).await.expect("dispatch");
    assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn dispatch_out_of_band_unknown_system_errors() {
    let mut registry = HandlerRegistry::new();
    let err = registry.dispatch_out_of_band(&oob("unknown")).await.expect_err("should be unhandled");
    assert_eq!(err.kind(), crate::error::ErrorKind::UnhandledSystem);
}

#[tokio::test]
async fn dispatch_out_of_band_still_mirrors_to_firehose_on_unhandled_system() {
    let mut registry = HandlerRegistry::new();
    let firehose = Arc::new(CountingFirehose::new());
    registry.register_firehose(firehose.clone());

    let _ = registry.dispatch_out_of_band(&oob("unknown")).await;
    assert_eq!(firehose.oob_pushes.load(Ordering::SeqCst), 1);
}
