// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn lazy_stub() -> PushStub {
    let channel = tonic::transport::Channel::from_static("http://[::1]:0").connect_lazy();
    crate::wire::grpc::stub(channel)
}

#[tokio::test]
async fn empty_token_never_reaches_the_wire() {
    let authenticator = SessionAuthenticator::new(StaticTokenProvider::new(""), None);
    let mut stub = lazy_stub();
    let err = authenticator.authenticate(&mut stub).await.expect_err("empty token must fail");
    assert_eq!(err.kind(), ErrorKind::AuthPermanent);
}
