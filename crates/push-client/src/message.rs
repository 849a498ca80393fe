// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Domain representation of broadcast frames, decoupled from the generated
//! protobuf types. [`crate::wire::grpc`] converts between the two.

use crate::ids::{MsgId, Uid};
use crate::item::{Category, Item};

/// A dismissal addressed either by explicit MsgIDs or by a time/category
/// range. Range dismissals are accepted on the wire but never applied
/// locally — only counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dismissal {
    pub msg_ids: Vec<MsgId>,
    pub ranges: Vec<TimeCategoryRange>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeCategoryRange {
    pub category: Category,
    pub start_ctime: u64,
    pub end_ctime: u64,
}

/// The two shapes a `StateUpdate` can take. Creation and dismissal are
/// mutually exclusive on the wire (the generated `oneof` enforces this
/// upstream; here we model it directly as an enum).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateUpdate {
    Creation(Item),
    Dismissal(Dismissal),
}

/// The payload carried by an in-band message: either a full state dump
/// (`StateSync`, sent in response to `Sync` or a fresh replay) or an
/// incremental `StateUpdate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InBandBody {
    StateSync(Vec<Item>),
    StateUpdate(StateUpdate),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InBandMessage {
    pub uid: Uid,
    pub ctime: u64,
    pub body: InBandBody,
}

impl InBandMessage {
    /// The MsgID this message would occupy in state, if it carries one.
    /// `StateSync` dumps and dismissals have no single MsgID of their own.
    pub fn msg_id(&self) -> Option<&MsgId> {
        match &self.body {
            InBandBody::StateUpdate(StateUpdate::Creation(item)) => Some(&item.msg_id),
            _ => None,
        }
    }

    /// Builds the template message [`crate::client::PushClient::inject`]
    /// sends: a fresh, random MsgID wrapping a single Creation. The server
    /// echo through the broadcast stream is what actually commits this to
    /// local state — this message is never consumed locally.
    pub fn creation_template(uid: Uid, category: impl Into<crate::item::Category>, body: Vec<u8>) -> Self {
        let item = Item::new(MsgId::generate(), category, body, 0);
        InBandMessage { uid, ctime: 0, body: InBandBody::StateUpdate(StateUpdate::Creation(item)) }
    }

    /// Builds the template message [`crate::client::PushClient::dismiss_item`]
    /// sends: a Dismissal naming exactly one target MsgID.
    pub fn dismissal_template(uid: Uid, target: MsgId) -> Self {
        InBandMessage {
            uid,
            ctime: 0,
            body: InBandBody::StateUpdate(StateUpdate::Dismissal(Dismissal { msg_ids: vec![target], ranges: vec![] })),
        }
    }
}

/// An out-of-band message: routed to firehose and system handlers, never
/// touches the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutOfBandMessage {
    pub uid: Uid,
    pub system: String,
    pub body: Vec<u8>,
}

/// The union the broker can push down `SubscribeBroadcasts`, the
/// client-subscribed stand-in for a server-initiated `Broadcast` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BroadcastFrame {
    InBand(InBandMessage),
    OutOfBand(OutOfBandMessage),
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
