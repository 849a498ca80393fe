// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local view of broker state: the set of live items plus enough history
//! to answer incremental sync requests without re-dialing the broker.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::PushError;
use crate::ids::MsgId;
use crate::item::Item;
use crate::message::{InBandBody, InBandMessage, StateUpdate};
use crate::ring::MessageRing;

/// Default capacity of the in-band message ring before `InBandMessagesSince`
/// starts returning `None` and callers must fall back to a full `Sync`.
pub const DEFAULT_RING_CAPACITY: usize = 256;

#[derive(Serialize, Deserialize)]
struct Snapshot {
    items: Vec<Item>,
    latest_ctime: u64,
}

/// The live set of items for one user plus the watermark of the most
/// recently consumed message — the value [`crate::client::PushClient::get_state`]
/// hands back to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    pub items: Vec<Item>,
    pub latest_ctime: u64,
}

/// Tracks every live item for one UID, plus a bounded history of the
/// in-band messages that produced the current state.
pub struct StateMachine {
    items: HashMap<MsgId, Item>,
    latest_ctime: u64,
    history: MessageRing<InBandMessage>,
}

impl StateMachine {
    pub fn new() -> Self {
        Self::with_ring_capacity(DEFAULT_RING_CAPACITY)
    }

    pub fn with_ring_capacity(capacity: usize) -> Self {
        Self { items: HashMap::new(), latest_ctime: 0, history: MessageRing::new(capacity) }
    }

    /// Applies an in-band message to local state. Returns `Err` with
    /// [`crate::error::ErrorKind::Repeat`] if a creation names a MsgID
    /// already present — the caller short-circuits on this rather than
    /// re-dispatching handlers.
    pub fn consume(&mut self, msg: InBandMessage) -> Result<(), PushError> {
        match &msg.body {
            InBandBody::StateSync(items) => {
                self.items.clear();
                for item in items {
                    self.items.insert(item.msg_id.clone(), item.clone());
                }
            }
            InBandBody::StateUpdate(StateUpdate::Creation(item)) => {
                if self.items.contains_key(&item.msg_id) {
                    return Err(PushError::repeat(format!("msg_id {} already in state", item.msg_id)));
                }
                self.items.insert(item.msg_id.clone(), item.clone());
            }
            InBandBody::StateUpdate(StateUpdate::Dismissal(dismissal)) => {
                for id in &dismissal.msg_ids {
                    self.items.remove(id);
                }
                // Range dismissals are intentionally not applied here; the
                // caller counts them via a metric instead.
            }
        }
        self.latest_ctime = self.latest_ctime.max(msg.ctime);
        self.history.push(msg);
        Ok(())
    }

    /// All items currently held, ordered by ctime then MsgID bytes.
    pub fn items_in_state(&self) -> Vec<Item> {
        let mut items: Vec<Item> = self.items.values().cloned().collect();
        items.sort();
        items
    }

    pub fn contains(&self, id: &MsgId) -> bool {
        self.items.contains_key(id)
    }

    pub fn get(&self, id: &MsgId) -> Option<&Item> {
        self.items.get(id)
    }

    /// In-band messages applied since `watermark` pushes ago, or `None`
    /// if the ring has already discarded messages the caller hasn't seen
    /// (the caller should fall back to a full `Sync` in that case).
    pub fn in_band_messages_since(&self, watermark: u64) -> Option<Vec<InBandMessage>> {
        self.history.since(watermark)
    }

    pub fn history_watermark(&self) -> u64 {
        self.history.total_pushed()
    }

    pub fn latest_ctime(&self) -> u64 {
        self.latest_ctime
    }

    pub fn snapshot(&self) -> State {
        State { items: self.items_in_state(), latest_ctime: self.latest_ctime }
    }

    pub fn save(&self) -> Result<Vec<u8>, PushError> {
        let snapshot = Snapshot { items: self.items_in_state(), latest_ctime: self.latest_ctime };
        crate::wire::codec::encode(&snapshot)
    }

    pub fn restore(&mut self, blob: &[u8]) -> Result<(), PushError> {
        let snapshot: Snapshot = crate::wire::codec::decode(blob)?;
        self.items.clear();
        for item in snapshot.items {
            self.items.insert(item.msg_id.clone(), item);
        }
        self.latest_ctime = snapshot.latest_ctime;
        Ok(())
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
