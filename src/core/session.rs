// src/core/session.rs
//! Explicit authentication context handed to the HTTP layer.
//!
//! Holds the current token pair (mirrored into a [`TokenStore`]) and the
//! signed-in user's profile once it has been fetched.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::Deserialize;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{info, warn};

use crate::types::{RecordId, TokenPair, UserProfile};

/// Persistent storage for the token pair.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn load(&self) -> Result<Option<TokenPair>>;
    async fn save(&self, tokens: &TokenPair) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

#[derive(Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<Option<TokenPair>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(tokens: TokenPair) -> Self {
        Self {
            tokens: Mutex::new(Some(tokens)),
        }
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> Result<Option<TokenPair>> {
        Ok(self
            .tokens
            .lock()
            .map_err(|_| anyhow::anyhow!("Token store lock poisoned"))?
            .clone())
    }

    async fn save(&self, tokens: &TokenPair) -> Result<()> {
        *self
            .tokens
            .lock()
            .map_err(|_| anyhow::anyhow!("Token store lock poisoned"))? = Some(tokens.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self
            .tokens
            .lock()
            .map_err(|_| anyhow::anyhow!("Token store lock poisoned"))? = None;
        Ok(())
    }
}

/// Claims read from the access token without verifying it. The server
/// remains the authority; these are only used for display and expiry hints.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AccessClaims {
    #[serde(default)]
    pub user_id: Option<RecordId>,
    #[serde(default)]
    pub exp: Option<i64>,
}

impl AccessClaims {
    pub fn decode_unverified(token: &str) -> Option<Self> {
        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        decode::<AccessClaims>(token, &DecodingKey::from_secret(&[]), &validation)
            .map(|data| data.claims)
            .ok()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| Utc.timestamp_opt(exp, 0).single())
    }
}

pub struct SessionContext {
    store: Arc<dyn TokenStore>,
    tokens: RwLock<Option<TokenPair>>,
    profile: RwLock<Option<UserProfile>>,
}

impl SessionContext {
    /// Empty session backed by `store`. Nothing is read from the store.
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self {
            store,
            tokens: RwLock::new(None),
            profile: RwLock::new(None),
        }
    }

    /// Session seeded from whatever the store holds.
    pub async fn restore(store: Arc<dyn TokenStore>) -> Result<Self> {
        let tokens = store.load().await?;
        if tokens.is_some() {
            info!("Restored stored session tokens");
        }

        Ok(Self {
            store,
            tokens: RwLock::new(tokens),
            profile: RwLock::new(None),
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.tokens.read().map(|t| t.is_some()).unwrap_or(false)
    }

    pub fn access_token(&self) -> Option<String> {
        self.tokens
            .read()
            .ok()
            .and_then(|t| t.as_ref().map(|p| p.access.clone()))
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.tokens
            .read()
            .ok()
            .and_then(|t| t.as_ref().map(|p| p.refresh.clone()))
    }

    pub fn claims(&self) -> Option<AccessClaims> {
        self.access_token()
            .and_then(|token| AccessClaims::decode_unverified(&token))
    }

    pub async fn set_tokens(&self, tokens: TokenPair) -> Result<()> {
        self.store.save(&tokens).await?;
        *self
            .tokens
            .write()
            .map_err(|_| anyhow::anyhow!("Session token lock poisoned"))? = Some(tokens);
        Ok(())
    }

    /// Apply a refresh result. The refresh token is kept unless rotated.
    pub async fn update_access(&self, access: String, refresh: Option<String>) -> Result<()> {
        let refresh = match refresh.or_else(|| self.refresh_token()) {
            Some(refresh) => refresh,
            None => anyhow::bail!("No refresh token in session"),
        };
        self.set_tokens(TokenPair { access, refresh }).await
    }

    /// Forget tokens and the cached profile, forcing a new login.
    pub async fn clear(&self) -> Result<()> {
        if let Ok(mut guard) = self.tokens.write() {
            *guard = None;
        }
        if let Ok(mut guard) = self.profile.write() {
            *guard = None;
        }

        if let Err(e) = self.store.clear().await {
            warn!("Failed to clear stored tokens: {}", e);
            return Err(e);
        }

        info!("Session cleared");
        Ok(())
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.profile.read().ok().and_then(|p| p.clone())
    }

    pub fn set_current_user(&self, profile: UserProfile) {
        if let Ok(mut guard) = self.profile.write() {
            *guard = Some(profile);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;

    #[derive(Serialize)]
    struct TestClaims {
        user_id: u64,
        exp: i64,
        token_type: &'static str,
    }

    fn pair(access: &str, refresh: &str) -> TokenPair {
        TokenPair {
            access: access.to_string(),
            refresh: refresh.to_string(),
        }
    }

    #[test]
    fn test_decode_unverified_claims() {
        let token = encode(
            &Header::default(),
            &TestClaims {
                user_id: 17,
                exp: 1_700_000_000,
                token_type: "access",
            },
            &EncodingKey::from_secret(b"server-secret"),
        )
        .unwrap();

        let claims = AccessClaims::decode_unverified(&token).unwrap();
        assert_eq!(claims.user_id, Some(RecordId::from(17u64)));
        assert_eq!(
            claims.expires_at(),
            Utc.timestamp_opt(1_700_000_000, 0).single()
        );
        assert!(AccessClaims::decode_unverified("not-a-jwt").is_none());
    }

    #[tokio::test]
    async fn test_restore_and_clear() {
        let store = Arc::new(MemoryTokenStore::with_tokens(pair("a1", "r1")));
        let session = SessionContext::restore(store.clone()).await.unwrap();
        assert!(session.is_authenticated());
        assert_eq!(session.access_token().as_deref(), Some("a1"));

        session.clear().await.unwrap();
        assert!(!session.is_authenticated());
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_access_keeps_refresh_unless_rotated() {
        let store = Arc::new(MemoryTokenStore::new());
        let session = SessionContext::new(store.clone());
        session.set_tokens(pair("a1", "r1")).await.unwrap();

        session.update_access("a2".to_string(), None).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(pair("a2", "r1")));

        session
            .update_access("a3".to_string(), Some("r2".to_string()))
            .await
            .unwrap();
        assert_eq!(session.refresh_token().as_deref(), Some("r2"));
    }

    #[tokio::test]
    async fn test_update_access_without_refresh_token_fails() {
        let session = SessionContext::new(Arc::new(MemoryTokenStore::new()));
        assert!(session.update_access("a".to_string(), None).await.is_err());
    }

    #[tokio::test]
    async fn test_set_tokens_reports_poisoned_lock() {
        let session = Arc::new(SessionContext::new(Arc::new(MemoryTokenStore::new())));

        let holder = session.clone();
        let _ = std::thread::spawn(move || {
            let _guard = holder.tokens.write().unwrap();
            panic!("panic while holding the token lock");
        })
        .join();

        let err = session.set_tokens(pair("a1", "r1")).await.unwrap_err();
        assert!(err.to_string().contains("poisoned"));
    }
}
