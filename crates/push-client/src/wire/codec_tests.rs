// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};

use super::*;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Sample {
    a: u32,
    b: String,
}

#[test]
fn encode_decode_roundtrips() {
    let sample = Sample { a: 1, b: "x".into() };
    let bytes = encode(&sample).expect("encode");
    let back: Sample = decode(&bytes).expect("decode");
    assert_eq!(back, sample);
}

#[test]
fn decode_rejects_garbage() {
    let result: Result<Sample, PushError> = decode(&[0xff, 0x00]);
    assert!(result.is_err());
}
