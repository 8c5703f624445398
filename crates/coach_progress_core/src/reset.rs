//! Password-reset tokens with TTL and single use.
//!
//! The opaque token only ever leaves the process through a
//! [`ResetDelivery`]; the store is keyed by its SHA-256 digest.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::ProgressError;

const TOKEN_BYTES: usize = 32;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetTicket {
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

/// Expiring key-value storage for reset tickets.
#[async_trait]
pub trait TokenStore: Send + Sync + 'static {
    async fn put(&self, key: String, ticket: ResetTicket) -> Result<(), ProgressError>;

    /// Remove the entry and return it, as one atomic step.
    async fn take(&self, key: &str) -> Result<Option<ResetTicket>, ProgressError>;

    /// Drop every entry that expired before `now`; returns how many.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, ProgressError>;
}

#[derive(Default)]
pub struct InMemoryTokenStore {
    entries: Mutex<HashMap<String, ResetTicket>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    #[cfg(test)]
    pub(crate) async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn put(&self, key: String, ticket: ResetTicket) -> Result<(), ProgressError> {
        self.entries.lock().await.insert(key, ticket);
        Ok(())
    }

    async fn take(&self, key: &str) -> Result<Option<ResetTicket>, ProgressError> {
        Ok(self.entries.lock().await.remove(key))
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, ProgressError> {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, ticket| ticket.expires_at >= now);
        Ok(before - entries.len())
    }
}

/// Hands a freshly issued token to the account owner (usually by email).
#[async_trait]
pub trait ResetDelivery: Send + Sync + 'static {
    async fn deliver(&self, email: &str, token: &SecretString) -> Result<(), ProgressError>;
}

/// Records the delivery in the log without the token itself.
#[derive(Clone, Debug, Default)]
pub struct LogDelivery;

#[async_trait]
impl ResetDelivery for LogDelivery {
    async fn deliver(&self, email: &str, _token: &SecretString) -> Result<(), ProgressError> {
        tracing::info!(%email, "password reset token issued");
        Ok(())
    }
}

#[derive(Clone)]
pub struct PasswordResets {
    store: Arc<dyn TokenStore>,
    ttl: Duration,
}

impl PasswordResets {
    pub fn new(store: Arc<dyn TokenStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Mint a token for `email` valid until `now + ttl`.
    pub async fn issue(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<SecretString, ProgressError> {
        let token = generate_token()?;
        let ticket = ResetTicket {
            email: email.to_string(),
            expires_at: now + self.ttl,
        };
        self.store.put(token_key(&token), ticket).await?;
        ::metrics::counter!("coach_reset_tokens_issued_total").increment(1);
        Ok(SecretString::new(token.into_boxed_str()))
    }

    /// Consume a token and return the email it was issued for. The entry is
    /// gone afterwards whether or not it had expired.
    pub async fn redeem(&self, token: &SecretString, now: DateTime<Utc>) -> Result<String, ProgressError> {
        let ticket = self
            .store
            .take(&token_key(token.expose_secret()))
            .await?
            .ok_or(ProgressError::InvalidToken)?;
        if now > ticket.expires_at {
            tracing::debug!(email = %ticket.email, "expired reset token presented");
            return Err(ProgressError::TokenExpired);
        }
        Ok(ticket.email)
    }

    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, ProgressError> {
        self.store.purge_expired(now).await
    }
}

fn generate_token() -> Result<String, ProgressError> {
    let mut buf = [0u8; TOKEN_BYTES];
    getrandom::fill(&mut buf)
        .map_err(|e| ProgressError::Persistence(format!("random source unavailable: {e}")))?;
    Ok(URL_SAFE_NO_PAD.encode(buf))
}

fn token_key(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
