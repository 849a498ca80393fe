// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Conversions between generated protobuf types and the domain types in
//! [`crate::message`] and [`crate::item`].

use crate::error::PushError;
use crate::ids::{MsgId, Uid};
use crate::item::Item;
use crate::message::{
    BroadcastFrame, Dismissal, InBandBody, InBandMessage, OutOfBandMessage, StateUpdate, TimeCategoryRange,
};

use super::proto;

impl From<&Item> for proto::Item {
    fn from(item: &Item) -> Self {
        proto::Item {
            msg_id: item.msg_id.as_bytes().to_vec(),
            category: item.category.clone(),
            body: item.body.clone(),
            ctime: item.ctime,
        }
    }
}

impl TryFrom<proto::Item> for Item {
    type Error = PushError;

    fn try_from(item: proto::Item) -> Result<Self, Self::Error> {
        Ok(Item::new(MsgId::from_bytes(item.msg_id), item.category, item.body, item.ctime))
    }
}

impl From<&TimeCategoryRange> for proto::TimeCategoryRange {
    fn from(range: &TimeCategoryRange) -> Self {
        proto::TimeCategoryRange {
            category: range.category.clone(),
            start_ctime: range.start_ctime,
            end_ctime: range.end_ctime,
        }
    }
}

impl From<proto::TimeCategoryRange> for TimeCategoryRange {
    fn from(range: proto::TimeCategoryRange) -> Self {
        TimeCategoryRange { category: range.category, start_ctime: range.start_ctime, end_ctime: range.end_ctime }
    }
}

impl From<&Dismissal> for proto::Dismissal {
    fn from(dismissal: &Dismissal) -> Self {
        proto::Dismissal {
            msg_ids: dismissal.msg_ids.iter().map(|id| id.as_bytes().to_vec()).collect(),
            ranges: dismissal.ranges.iter().map(proto::TimeCategoryRange::from).collect(),
        }
    }
}

impl From<proto::Dismissal> for Dismissal {
    fn from(dismissal: proto::Dismissal) -> Self {
        Dismissal {
            msg_ids: dismissal.msg_ids.into_iter().map(MsgId::from_bytes).collect(),
            ranges: dismissal.ranges.into_iter().map(TimeCategoryRange::from).collect(),
        }
    }
}

impl TryFrom<proto::InBandMessage> for InBandMessage {
    type Error = PushError;

    fn try_from(msg: proto::InBandMessage) -> Result<Self, Self::Error> {
        let uid = Uid::from_bytes(msg.uid);
        let ctime = msg.ctime;
        let body = match msg.body.ok_or_else(|| PushError::invalid_message("in-band message has no body"))? {
            proto::in_band_message::Body::StateSync(sync) => {
                let items = sync.items.into_iter().map(Item::try_from).collect::<Result<_, _>>()?;
                InBandBody::StateSync(items)
            }
            proto::in_band_message::Body::StateUpdate(update) => {
                let state_update = match (update.creation, update.dismissal) {
                    (Some(item), None) => StateUpdate::Creation(Item::try_from(item)?),
                    (None, Some(dismissal)) => StateUpdate::Dismissal(Dismissal::from(dismissal)),
                    _ => {
                        return Err(PushError::invalid_message(
                            "state update must carry exactly one of creation or dismissal",
                        ))
                    }
                };
                InBandBody::StateUpdate(state_update)
            }
        };
        Ok(InBandMessage { uid, ctime, body })
    }
}

impl From<&InBandMessage> for proto::InBandMessage {
    fn from(msg: &InBandMessage) -> Self {
        let body = match &msg.body {
            InBandBody::StateSync(items) => proto::in_band_message::Body::StateSync(proto::StateSync {
                items: items.iter().map(proto::Item::from).collect(),
            }),
            InBandBody::StateUpdate(StateUpdate::Creation(item)) => {
                proto::in_band_message::Body::StateUpdate(proto::StateUpdate {
                    creation: Some(proto::Item::from(item)),
                    dismissal: None,
                })
            }
            InBandBody::StateUpdate(StateUpdate::Dismissal(dismissal)) => {
                proto::in_band_message::Body::StateUpdate(proto::StateUpdate {
                    creation: None,
                    dismissal: Some(proto::Dismissal::from(dismissal)),
                })
            }
        };
        proto::InBandMessage { uid: msg.uid.as_bytes().to_vec(), ctime: msg.ctime, body: Some(body) }
    }
}

impl From<proto::OutOfBandMessage> for OutOfBandMessage {
    fn from(msg: proto::OutOfBandMessage) -> Self {
        OutOfBandMessage { uid: Uid::from_bytes(msg.uid), system: msg.system, body: msg.body }
    }
}

impl From<&OutOfBandMessage> for proto::OutOfBandMessage {
    fn from(msg: &OutOfBandMessage) -> Self {
        proto::OutOfBandMessage { uid: msg.uid.as_bytes().to_vec(), system: msg.system.clone(), body: msg.body.clone() }
    }
}

impl TryFrom<proto::BroadcastFrame> for BroadcastFrame {
    type Error = PushError;

    fn try_from(frame: proto::BroadcastFrame) -> Result<Self, Self::Error> {
        match frame.body.ok_or_else(|| PushError::invalid_message("broadcast frame has no body"))? {
            proto::broadcast_frame::Body::InBand(msg) => Ok(BroadcastFrame::InBand(msg.try_into()?)),
            proto::broadcast_frame::Body::OutOfBand(msg) => Ok(BroadcastFrame::OutOfBand(msg.into())),
        }
    }
}

#[cfg(test)]
#[path = "convert_tests.rs"]
mod tests;
