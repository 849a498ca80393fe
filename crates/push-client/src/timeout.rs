// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deadline wrapper applied uniformly to every outbound RPC.

use std::future::Future;
use std::time::Duration;

use crate::error::PushError;

/// Runs `fut` under `timeout`, collapsing both the deadline expiry and the
/// inner error into [`PushError`].
pub async fn with_timeout<T, E>(
    timeout: Duration,
    fut: impl Future<Output = Result<T, E>>,
) -> Result<T, PushError>
where
    E: Into<PushError>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(err.into()),
        Err(_) => Err(PushError::timeout(format!("rpc exceeded {timeout:?} deadline"))),
    }
}

#[cfg(test)]
#[path = "timeout_tests.rs"]
mod tests;
