// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-state items: the unit the [`crate::state::StateMachine`] tracks.

use crate::ids::MsgId;

/// Caller-defined namespace a message belongs to (e.g. "inbox", "alert").
/// Opaque to the client; used only for range dismissals.
pub type Category = String;

/// A message-pack-encoded payload, tagged with the category and creation
/// time the broker assigned it.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Item {
    pub msg_id: MsgId,
    pub category: Category,
    pub body: Vec<u8>,
    pub ctime: u64,
}

impl Item {
    pub fn new(msg_id: MsgId, category: impl Into<Category>, body: Vec<u8>, ctime: u64) -> Self {
        Self { msg_id, category: category.into(), body, ctime }
    }

    /// Encodes `value` as a MessagePack body, matching the wire codec used
    /// for the rest of the protocol.
    pub fn encode_body<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, crate::error::PushError> {
        crate::wire::codec::encode(value)
    }

    pub fn decode_body<T: serde::de::DeserializeOwned>(&self) -> Result<T, crate::error::PushError> {
        crate::wire::codec::decode(&self.body)
    }
}

/// Ordering used throughout the state machine: CTime first, then the raw
/// MsgID bytes as a tiebreak so items with an identical ctime still sort
/// deterministically.
impl PartialOrd for Item {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Item {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.ctime
            .cmp(&other.ctime)
            .then_with(|| self.msg_id.as_bytes().cmp(other.msg_id.as_bytes()))
    }
}

#[cfg(test)]
#[path = "item_tests.rs"]
mod tests;
