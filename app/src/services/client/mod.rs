// Client-side functionality for the backend collaborator
//
// This module provides a complete client-side implementation for:
// - Account creation and password sign-in
// - Session management with an in-memory store and optional disk cache
// - Profile record reads and partial updates
// - Document uploads into named storage buckets
//
// The backend itself (auth provider, record store, object storage) is an
// external collaborator; everything here treats it as a black box behind its
// HTTP surface.

pub mod api;
pub mod auth;
pub mod backend_client;
pub mod errors;
pub mod session;
pub mod types;

// Re-export core types for easy access
pub use types::{
    Account,
    CreateAccountRequest,
    CreatedAccount,
    DocumentSource,
    Profile,
    ProfileAttributes,
    ProfileChanges,
    Session,
    SessionTokens,
    UserRole,
};

// Re-export error types
pub use errors::{AuthError, ClientResult, ProfileError, StorageError};

// Re-export main client classes
pub use backend_client::BackendClient;
pub use session::{JwtUtils, SessionCache, SessionStore};

use tracing::{instrument, warn};

/// Credential service: wraps the backend client's auth operations and keeps
/// the session store (and optional disk cache) in step with every auth
/// transition.
pub struct CredentialService {
    client: BackendClient,
    store: SessionStore,
    cache: Option<SessionCache>,
}

impl CredentialService {
    pub fn new(client: BackendClient, store: SessionStore) -> Self {
        Self {
            client,
            store,
            cache: None,
        }
    }

    /// Persist auth transitions to the given cache so a later run can restore
    /// the session.
    pub fn with_cache(mut self, cache: SessionCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn client(&self) -> &BackendClient {
        &self.client
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Register a new identity. When the backend opens a session immediately
    /// (no verification step), the session store is updated like any other
    /// auth transition; otherwise the account stays pending until verified.
    #[instrument(skip(self, request), err)]
    pub async fn create_account(
        &self,
        request: &CreateAccountRequest,
    ) -> Result<CreatedAccount, AuthError> {
        let created = self.client.create_account(request).await?;

        if let Some(tokens) = created.tokens.clone() {
            let profile_result = self
                .client
                .fetch_profile(&created.account_id, Some(&tokens))
                .await;
            match profile_result {
                Ok(Some(profile)) => {
                    self.remember(Session {
                        account: Account {
                            id: created.account_id.clone(),
                            email: created.email.clone(),
                            phone: None,
                        },
                        profile,
                        tokens,
                    });
                }
                Ok(None) => warn!(
                    "Profile record not yet provisioned for account: {}",
                    created.account_id
                ),
                Err(e) => warn!("Could not load profile after signup: {}", e),
            }
        }

        Ok(created)
    }

    /// Password sign-in. A missing profile row after a successful sign-in is
    /// surfaced as `ProfileNotFound`, never as an empty profile.
    #[instrument(skip(self, password), err)]
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let (account, tokens) = self.client.create_session(email, password).await?;

        let profile = self
            .client
            .fetch_profile(&account.id, Some(&tokens))
            .await?
            .ok_or_else(|| AuthError::ProfileNotFound {
                account_id: account.id.clone(),
            })?;

        let session = Session {
            account,
            profile,
            tokens,
        };
        self.remember(session.clone());
        Ok(session)
    }

    /// Invalidate the current session. Local state is cleared first so the
    /// app lands signed out even when the backend call fails.
    #[instrument(skip(self), err)]
    pub async fn end_session(&self) -> Result<(), AuthError> {
        let current = self.store.current();
        self.forget();

        if let Some(session) = current {
            self.client.end_session(&session.tokens).await?;
        }
        Ok(())
    }

    /// One-shot startup restore: load the cached session, drop it if stale,
    /// and refresh the profile view before publishing it to the store.
    #[instrument(skip(self), err)]
    pub async fn current_session(&self) -> Result<Option<Session>, AuthError> {
        let Some(cache) = &self.cache else {
            return Ok(self.store.current());
        };

        let cached = cache.load_session().unwrap_or_else(|e| {
            warn!("Could not read the cached session, starting signed out: {}", e);
            None
        });
        let Some(session) = cached else {
            return Ok(None);
        };

        // Probe the backend's notion of the session before trusting the cache.
        let account = match self.client.fetch_account(&session.tokens).await {
            Ok(account) => account,
            Err(AuthError::Rejected { .. }) => {
                warn!("Cached session is no longer accepted by the backend");
                self.forget();
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let profile_result = self
            .client
            .fetch_profile(&account.id, Some(&session.tokens))
            .await;
        match profile_result {
            Ok(Some(profile)) => {
                let session = Session {
                    account,
                    profile,
                    tokens: session.tokens,
                };
                self.remember(session.clone());
                Ok(Some(session))
            }
            Ok(None) => {
                warn!(
                    "Cached session has no profile record, discarding it: {}",
                    session.account.id
                );
                self.forget();
                Ok(None)
            }
            Err(ProfileError::Unauthorized) => {
                warn!("Cached session is no longer accepted by the backend");
                self.forget();
                Ok(None)
            }
            Err(e) => Err(AuthError::from(e)),
        }
    }

    /// Redeem an email-link verification token.
    pub async fn confirm_email(&self, email: &str, token: &str) -> Result<bool, AuthError> {
        self.client.confirm_email(email, token).await
    }

    fn remember(&self, session: Session) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.store_session(&session) {
                warn!("Failed to persist the session cache: {}", e);
            }
        }
        self.store.set(session);
    }

    fn forget(&self) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.clear_session() {
                warn!("Failed to clear the session cache: {}", e);
            }
        }
        self.store.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::config::BackendConfig;

    fn service() -> CredentialService {
        let client = BackendClient::new(BackendConfig {
            base_url: "https://backend.example.com".to_string(),
            anon_key: "anon-key".to_string(),
            ..BackendConfig::default()
        });
        CredentialService::new(client, SessionStore::new())
    }

    #[tokio::test]
    async fn test_end_session_without_session_is_a_local_no_op() {
        let service = service();
        service.end_session().await.unwrap();
        assert!(!service.store().is_signed_in());
    }

    #[tokio::test]
    async fn test_current_session_without_cache_reads_the_store() {
        let service = service();
        let restored = service.current_session().await.unwrap();
        assert!(restored.is_none());
    }
}
