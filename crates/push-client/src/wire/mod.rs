// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire layer: generated protobuf types, domain conversions, and the
//! tonic-backed RPC dialer.

pub mod codec;
pub mod convert;
pub mod grpc;

/// Generated protobuf types for the `push.v1` package.
pub mod proto {
    tonic::include_proto!("push.v1");
}
