// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local persistence for state-machine snapshots.
//!
//! Mirrors the load/save split used for credential persistence, but keyed
//! by UID and swappable behind a trait so callers can back it with a file,
//! a keychain, or (in tests) memory.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::PushError;
use crate::ids::Uid;

/// Durable key-value storage for one opaque blob per UID. The blob is the
/// state machine's serialized snapshot; this trait has no knowledge of
/// its contents.
#[tonic::async_trait]
pub trait LocalStore: Send + Sync {
    async fn get(&self, uid: &Uid) -> Result<Option<Vec<u8>>, PushError>;
    async fn put(&self, uid: &Uid, blob: Vec<u8>) -> Result<(), PushError>;
}

/// In-memory store used by tests and the demo binary. Real deployments
/// supply their own [`LocalStore`] backed by a file or secret store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: Mutex<HashMap<Uid, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[tonic::async_trait]
impl LocalStore for MemoryStore {
    async fn get(&self, uid: &Uid) -> Result<Option<Vec<u8>>, PushError> {
        let blobs = self.blobs.lock().map_err(|_| PushError::persistence("store lock poisoned"))?;
        Ok(blobs.get(uid).cloned())
    }

    async fn put(&self, uid: &Uid, blob: Vec<u8>) -> Result<(), PushError> {
        let mut blobs = self.blobs.lock().map_err(|_| PushError::persistence("store lock poisoned"))?;
        blobs.insert(uid.clone(), blob);
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
