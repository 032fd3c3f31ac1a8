// Copyright (c) Studydesk.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::config::ServerConfig;
use crate::error::ApiError;
use anyhow::{anyhow, bail, Result};
use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("malformed token")]
    Malformed,
    #[error("signature mismatch")]
    BadSignature,
    #[error("unknown token")]
    Unknown,
}

/// Maps a bearer token to the id of the user it belongs to. The server never
/// mints identities itself; it trusts whatever verifier it was handed.
pub trait AuthVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<String, AuthError>;
}

/// Authenticated user id, inserted into request extensions by `require_auth`.
#[derive(Debug, Clone)]
pub struct AuthUser(pub String);

/// Verifies `<user_id>.<hex sig>` tokens where the signature is
/// HMAC-SHA256 over the user id with a shared secret.
pub struct HmacVerifier {
    key: Vec<u8>,
}

impl HmacVerifier {
    pub fn new(secret: &str) -> Self {
        Self { key: secret.as_bytes().to_vec() }
    }

    /// Issues a token for `user_id`. Counterpart of `verify`.
    pub fn sign(&self, user_id: &str) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|_| anyhow!("HMAC key rejected"))?;
        mac.update(user_id.as_bytes());
        let sig = hex::encode(mac.finalize().into_bytes());
        Ok(format!("{user_id}.{sig}"))
    }
}

impl AuthVerifier for HmacVerifier {
    fn verify(&self, token: &str) -> Result<String, AuthError> {
        let (user_id, sig_hex) = token.split_once('.').ok_or(AuthError::Malformed)?;
        if user_id.is_empty() {
            return Err(AuthError::Malformed);
        }
        let sig = hex::decode(sig_hex).map_err(|_| AuthError::Malformed)?;
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|_| AuthError::BadSignature)?;
        mac.update(user_id.as_bytes());
        mac.verify_slice(&sig).map_err(|_| AuthError::BadSignature)?;
        Ok(user_id.to_string())
    }
}

/// Fixed token table, mainly for tests and small deployments.
pub struct StaticTokenVerifier {
    tokens: Vec<(String, String)>, // (token, user_id)
}

impl StaticTokenVerifier {
    pub fn new(tokens: Vec<(String, String)>) -> Self {
        Self { tokens }
    }
}

impl AuthVerifier for StaticTokenVerifier {
    fn verify(&self, token: &str) -> Result<String, AuthError> {
        self.tokens
            .iter()
            .find(|(t, _)| t == token)
            .map(|(_, user)| user.clone())
            .ok_or(AuthError::Unknown)
    }
}

pub fn verifier_from_config(cfg: &ServerConfig) -> Result<Arc<dyn AuthVerifier>> {
    if !cfg.auth_tokens.is_empty() {
        return Ok(Arc::new(StaticTokenVerifier::new(cfg.auth_tokens.clone())));
    }
    if let Some(secret) = &cfg.auth_secret {
        return Ok(Arc::new(HmacVerifier::new(secret)));
    }
    bail!("No auth configured; set STUDYDESK_AUTH_TOKENS or STUDYDESK_AUTH_SECRET")
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Rejects the request with a uniform 401 unless it carries a valid bearer
/// token. Why the token was rejected is only ever logged, never returned.
pub async fn require_auth(
    State(verifier): State<Arc<dyn AuthVerifier>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers()).ok_or(AuthError::MissingToken);
    let user = match token.and_then(|t| verifier.verify(t)) {
        Ok(user) => user,
        Err(err) => {
            tracing::debug!(error = %err, "rejected request");
            return Err(ApiError::Unauthorized);
        }
    };
    req.extensions_mut().insert(AuthUser(user));
    Ok(next.run(req).await)
}
