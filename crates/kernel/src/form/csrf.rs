//! CSRF token generation and verification.
//!
//! Tokens live in the session as `token:issued_at` entries. Each token is
//! single-use and expires after an hour.

use anyhow::Result;
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tower_sessions::Session;

/// Form field carrying the token.
pub const CSRF_FIELD: &str = "_token";

/// Session key for storing CSRF tokens.
const CSRF_SESSION_KEY: &str = "csrf_tokens";

/// Maximum number of outstanding tokens per session.
const MAX_TOKENS: usize = 10;

/// Token validity period in seconds (1 hour).
const TOKEN_VALIDITY_SECS: i64 = 3600;

fn parse_entry(entry: &str) -> Option<(&str, i64)> {
    let (token, issued_at) = entry.split_once(':')?;
    Some((token, issued_at.parse().ok()?))
}

fn is_fresh(issued_at: i64, now: i64) -> bool {
    now - issued_at <= TOKEN_VALIDITY_SECS
}

async fn stored_tokens(session: &Session) -> Vec<String> {
    session
        .get::<Vec<String>>(CSRF_SESSION_KEY)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

/// Generate a CSRF token and store it in the session.
pub async fn generate_csrf_token(session: &Session) -> Result<String> {
    let mut random_bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut random_bytes);
    let issued_at = chrono::Utc::now().timestamp();

    let mut hasher = Sha256::new();
    hasher.update(random_bytes);
    hasher.update(issued_at.to_le_bytes());
    let token = hex::encode(hasher.finalize());

    let mut tokens = stored_tokens(session).await;
    tokens.push(format!("{token}:{issued_at}"));
    if tokens.len() > MAX_TOKENS {
        let excess = tokens.len() - MAX_TOKENS;
        tokens.drain(..excess);
    }

    session
        .insert(CSRF_SESSION_KEY, tokens)
        .await
        .map_err(|e| anyhow::anyhow!("failed to store CSRF token: {e}"))?;

    Ok(token)
}

/// Verify and consume a submitted token.
///
/// Returns `Ok(false)` for empty, unknown, or expired tokens.
pub async fn verify_csrf_token(session: &Session, submitted: &str) -> Result<bool> {
    if submitted.is_empty() {
        return Ok(false);
    }

    let tokens = stored_tokens(session).await;
    if tokens.is_empty() {
        return Ok(false);
    }

    let now = chrono::Utc::now().timestamp();
    let mut matched = false;
    let mut remaining = Vec::with_capacity(tokens.len());

    for entry in tokens {
        let Some((token, issued_at)) = parse_entry(&entry) else {
            continue;
        };
        if !is_fresh(issued_at, now) {
            continue;
        }
        if !matched && bool::from(token.as_bytes().ct_eq(submitted.as_bytes())) {
            matched = true;
            continue;
        }
        remaining.push(entry);
    }

    if matched {
        session
            .insert(CSRF_SESSION_KEY, remaining)
            .await
            .map_err(|e| anyhow::anyhow!("failed to update CSRF tokens: {e}"))?;
    }

    Ok(matched)
}
