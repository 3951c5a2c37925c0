use std::time::Duration;

use reqwest::Client;
use tracing::instrument;

use super::errors::{AuthError, ProfileError, StorageError};
use super::types::*;
use crate::services::config::BackendConfig;

/// Client for the backend collaborator: credential endpoints, the profile
/// record store, and bucketed object storage, all under one base URL.
#[derive(Clone)]
pub struct BackendClient {
    pub(crate) http_client: Client,
    pub(crate) config: BackendConfig,
}

impl BackendClient {
    /// Create a new backend client.
    pub fn new(config: BackendConfig) -> Self {
        Self {
            http_client: {
                Client::builder()
                    .user_agent(config.user_agent.clone())
                    .timeout(Duration::from_millis(config.request_timeout_ms))
                    .build()
                    .expect("Failed to create HTTP client")
            },
            config,
        }
    }

    /// Register a new identity; profile attributes ride along as signup
    /// metadata for the server-side profile trigger.
    #[instrument(skip(self, request), err)]
    pub async fn create_account(
        &self,
        request: &CreateAccountRequest,
    ) -> Result<CreatedAccount, AuthError> {
        crate::services::client::auth::create_account_impl(self, request).await
    }

    /// Password sign-in; returns the account plus transport tokens.
    #[instrument(skip(self, password), err)]
    pub async fn create_session(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(Account, SessionTokens), AuthError> {
        crate::services::client::auth::create_session_impl(self, email, password).await
    }

    /// Invalidate the session behind the given tokens.
    #[instrument(skip(self, tokens), err)]
    pub async fn end_session(&self, tokens: &SessionTokens) -> Result<(), AuthError> {
        crate::services::client::auth::end_session_impl(self, tokens).await
    }

    /// One-shot probe of the account behind the given tokens.
    #[instrument(skip(self, tokens), err)]
    pub async fn fetch_account(&self, tokens: &SessionTokens) -> Result<Account, AuthError> {
        crate::services::client::auth::fetch_account_impl(self, tokens).await
    }

    /// Redeem an email-link verification token.
    #[instrument(skip(self, token), err)]
    pub async fn confirm_email(&self, email: &str, token: &str) -> Result<bool, AuthError> {
        crate::services::client::auth::confirm_email_impl(self, email, token).await
    }

    /// Read the profile record keyed by the account id, if it exists yet.
    #[instrument(skip(self, tokens), err)]
    pub async fn fetch_profile(
        &self,
        account_id: &str,
        tokens: Option<&SessionTokens>,
    ) -> Result<Option<Profile>, ProfileError> {
        crate::services::client::api::fetch_profile_impl(self, account_id, tokens).await
    }

    /// Partially update the profile record keyed by the account id and return
    /// the updated row.
    #[instrument(skip(self, changes, tokens), err)]
    pub async fn update_profile(
        &self,
        account_id: &str,
        changes: &ProfileChanges,
        tokens: Option<&SessionTokens>,
    ) -> Result<Profile, ProfileError> {
        crate::services::client::api::update_profile_impl(self, account_id, changes, tokens).await
    }

    /// Upload a picked document to the named bucket, keyed by the account id,
    /// and return the durable public URL.
    #[instrument(skip(self, source, tokens), err)]
    pub async fn upload_document(
        &self,
        source: Option<&DocumentSource>,
        bucket: &str,
        account_id: &str,
        tokens: Option<&SessionTokens>,
    ) -> Result<String, StorageError> {
        crate::services::client::api::upload_document_impl(self, source, bucket, account_id, tokens)
            .await
    }

    /// Durable public URL for an object key in a bucket. Deterministic string
    /// form, no network round-trip required.
    pub fn public_document_url(&self, bucket: &str, key: &str) -> String {
        crate::services::client::api::public_object_url(&self.config.base_url, bucket, key)
    }

    pub(crate) fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.config.base_url, path)
    }

    pub(crate) fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.config.base_url, table)
    }

    pub(crate) fn storage_object_url(&self, bucket: &str, key: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.config.base_url, bucket, key
        )
    }

    /// Bearer value for a request: the session access token when signed in,
    /// the publishable key otherwise.
    pub(crate) fn bearer_token<'a>(&'a self, tokens: Option<&'a SessionTokens>) -> &'a str {
        tokens
            .map(|tokens| tokens.access_token.as_str())
            .unwrap_or(&self.config.anon_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> BackendClient {
        BackendClient::new(BackendConfig {
            base_url: "https://backend.example.com".to_string(),
            anon_key: "anon-key".to_string(),
            ..BackendConfig::default()
        })
    }

    #[test]
    fn test_endpoint_urls() {
        let client = test_client();
        assert_eq!(
            client.auth_url("signup"),
            "https://backend.example.com/auth/v1/signup"
        );
        assert_eq!(
            client.rest_url("profiles"),
            "https://backend.example.com/rest/v1/profiles"
        );
        assert_eq!(
            client.storage_object_url("valid-id", "u1.jpeg"),
            "https://backend.example.com/storage/v1/object/valid-id/u1.jpeg"
        );
    }

    #[test]
    fn test_bearer_token_falls_back_to_anon_key() {
        let client = test_client();
        assert_eq!(client.bearer_token(None), "anon-key");

        let tokens = SessionTokens {
            access_token: "session-token".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: None,
        };
        assert_eq!(client.bearer_token(Some(&tokens)), "session-token");
    }
}
