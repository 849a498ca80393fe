// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Opaque byte-string identifiers: [`Uid`], [`DeviceId`], [`MsgId`].
//!
//! All three are plain byte strings on the wire. We wrap them so callers
//! can't accidentally pass a UID where a MsgID is expected, and so they
//! render as hex rather than raw bytes in logs.

use std::fmt;

use crate::error::PushError;

macro_rules! byte_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
        pub struct $name(Vec<u8>);

        impl $name {
            pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
                Self(bytes.into())
            }

            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }

            pub fn into_bytes(self) -> Vec<u8> {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode(&self.0))
            }
        }

        impl TryFrom<&str> for $name {
            type Error = PushError;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                hex::decode(value)
                    .map(Self)
                    .map_err(|e| PushError::invalid_message(format!("invalid hex id {value:?}: {e}")))
            }
        }

        impl From<Vec<u8>> for $name {
            fn from(bytes: Vec<u8>) -> Self {
                Self(bytes)
            }
        }
    };
}

byte_id!(Uid);
byte_id!(DeviceId);
byte_id!(MsgId);

impl MsgId {
    /// Generates a fresh, random message id for an outbound write (spec
    /// §4.3.5: injected items need a MsgID the broker hasn't seen before).
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().as_bytes().to_vec())
    }
}

#[cfg(test)]
#[path = "ids_tests.rs"]
mod tests;
