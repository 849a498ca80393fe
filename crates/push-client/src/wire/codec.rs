// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! MessagePack encode/decode helpers shared by item bodies and local
//! snapshots. Named maps (`to_vec_named`) keep encoded bytes stable across
//! field reordering, matching how the broker expects struct fields typed.

use crate::error::PushError;

pub fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, PushError> {
    rmp_serde::to_vec_named(value).map_err(|e| PushError::invalid_message(format!("messagepack encode: {e}")))
}

pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, PushError> {
    rmp_serde::from_slice(bytes).map_err(|e| PushError::invalid_message(format!("messagepack decode: {e}")))
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
