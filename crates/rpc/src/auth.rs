// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Gateway auth interceptor — signs a small per-call envelope with an RSA
//! private key and attaches it as three ASCII metadata headers. Mirrors the
//! Python `GatewayAuthClientInterceptor` this system was distilled from.

use base64::Engine;
use rsa::pkcs1v15::SigningKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::RsaPrivateKey;
use serde::Serialize;
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};
use tonic::metadata::MetadataValue;
use tonic::service::Interceptor;
use tonic::{Request, Status};

const AUTH_MESSAGE_KEY: &str = "x-gateway-auth-message";
const AUTH_SIGNATURE_KEY: &str = "x-gateway-auth-signature";
const AUTH_PUBKEY_KEY: &str = "x-gateway-auth-pubkey";

#[derive(Serialize)]
struct AuthPayload<'a> {
    model_id: &'a str,
    timestamp: u64,
}

/// Attaches signed `x-gateway-auth-*` headers to every outbound unary call.
///
/// The public key encoding is computed once at construction, matching the
/// original's `_pubkey_b64` precomputation — it never changes per instance.
#[derive(Clone)]
pub struct GatewayAuthInterceptor {
    signing_key: SigningKey<Sha256>,
    worker_id: String,
    pubkey_der_b64: String,
}

impl GatewayAuthInterceptor {
    pub fn new(private_key: RsaPrivateKey, worker_id: impl Into<String>) -> Self {
        let pubkey_der = public_key_der(&private_key);
        Self {
            signing_key: SigningKey::<Sha256>::new(private_key),
            worker_id: worker_id.into(),
            pubkey_der_b64: base64::engine::general_purpose::STANDARD.encode(pubkey_der),
        }
    }

    fn build_auth_metadata(&self) -> (String, String) {
        let payload = AuthPayload {
            model_id: &self.worker_id,
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
        };
        // A struct of a &str and a u64 always serializes; there is no
        // fallible input here for serde_json to reject.
        let message = serde_json::to_string(&payload).unwrap_or_default();
        let message_b64 = base64::engine::general_purpose::STANDARD.encode(message.as_bytes());
        let signature = self.signing_key.sign(message.as_bytes());
        let signature_b64 = base64::engine::general_purpose::STANDARD.encode(signature.to_bytes());
        (message_b64, signature_b64)
    }
}

impl Interceptor for GatewayAuthInterceptor {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        let (message_b64, signature_b64) = self.build_auth_metadata();

        insert_ascii(&mut request, AUTH_MESSAGE_KEY, &message_b64)?;
        insert_ascii(&mut request, AUTH_SIGNATURE_KEY, &signature_b64)?;
        insert_ascii(&mut request, AUTH_PUBKEY_KEY, &self.pubkey_der_b64)?;

        Ok(request)
    }
}

fn insert_ascii(request: &mut Request<()>, key: &'static str, value: &str) -> Result<(), Status> {
    let value = MetadataValue::try_from(value)
        .map_err(|_| Status::internal(format!("non-ASCII auth header value for {key}")))?;
    request.metadata_mut().insert(key, value);
    Ok(())
}

/// SubjectPublicKeyInfo/DER encoding of the key's public half.
///
/// A hand-rolled minimal DER encoder would duplicate what `rsa`'s own
/// `pkcs8`-backed `EncodePublicKey` does; this assumes that trait is in
/// scope via the `rsa` crate's `pkcs8` feature.
fn public_key_der(private_key: &RsaPrivateKey) -> Vec<u8> {
    use rsa::pkcs8::EncodePublicKey;
    let public_key = private_key.to_public_key();
    public_key.to_public_key_der().map(|d| d.as_bytes().to_vec()).unwrap_or_default()
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
