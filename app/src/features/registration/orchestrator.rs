//! Registration orchestrator - coordinates one registration attempt.
//!
//! The sequence is compensating, not transactional: once the account exists,
//! no later failure rolls it back. Document uploads and the profile update
//! are best-effort enrichment and degrade to warnings on the report.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

use crate::services::client::errors::{AuthError, ProfileError, StorageError};
use crate::services::client::types::{
    CreateAccountRequest, CreatedAccount, DocumentSource, ProfileChanges, SessionTokens,
};
use crate::services::client::BackendClient;
use crate::services::config::{BucketsConfig, ProvisioningConfig};
use crate::services::errors::{RegistrationError, RegistrationStage};

use super::types::{DocumentKind, DocumentWarning, RegistrationForm, RegistrationReport};
use super::validation::validate_registration;

/// Backend operations one registration attempt needs. The seam keeps the
/// sequencing policy testable against an in-memory double.
#[async_trait]
pub trait RegistrationBackend: Send + Sync {
    /// Register the identity; profile attributes ride along as metadata.
    async fn create_account(
        &self,
        request: &CreateAccountRequest,
    ) -> Result<CreatedAccount, AuthError>;

    /// Probe whether the trigger-created profile record exists yet.
    async fn profile_exists(&self, account_id: &str) -> Result<bool, ProfileError>;

    /// Upload one document and resolve its durable public URL.
    async fn upload_document(
        &self,
        source: Option<&DocumentSource>,
        bucket: &str,
        account_id: &str,
    ) -> Result<String, StorageError>;

    /// Write the given partial changes onto the profile record.
    async fn apply_profile_changes(
        &self,
        account_id: &str,
        changes: &ProfileChanges,
    ) -> Result<(), ProfileError>;
}

/// Drives one registration attempt through
/// validating → creating account → uploading documents → updating profile.
pub struct RegistrationOrchestrator<'a, B: RegistrationBackend> {
    backend: &'a B,
    buckets: &'a BucketsConfig,
    provisioning: &'a ProvisioningConfig,
}

impl<'a, B: RegistrationBackend> RegistrationOrchestrator<'a, B> {
    pub fn new(
        backend: &'a B,
        buckets: &'a BucketsConfig,
        provisioning: &'a ProvisioningConfig,
    ) -> Self {
        Self {
            backend,
            buckets,
            provisioning,
        }
    }

    #[instrument(skip(self, form), fields(role = %form.role))]
    pub async fn run(&self, form: &RegistrationForm) -> Result<RegistrationReport, RegistrationError> {
        info!("[Registration] {}: checking the submitted form", RegistrationStage::Validating);
        let field_errors = validate_registration(form);
        if !field_errors.is_empty() {
            warn!(
                "[Registration] Submission blocked, {} field(s) invalid",
                field_errors.len()
            );
            return Err(RegistrationError::Validation { field_errors });
        }

        info!(
            "[Registration] {}: registering {} account for {}",
            RegistrationStage::CreatingAccount,
            form.role,
            form.email.trim()
        );
        let request = CreateAccountRequest {
            email: form.email.trim().to_string(),
            password: form.password.clone(),
            attributes: form.profile_attributes(),
        };
        let created = match self.backend.create_account(&request).await {
            Ok(created) => created,
            Err(e) => {
                error!("[Registration] Account creation failed: {}", e);
                return Err(RegistrationError::AccountCreation(e));
            }
        };
        // Point of no return: the account exists. Everything after this is
        // best-effort enrichment and never rolls it back.

        let profile_provisioned = self.await_profile(&created.account_id).await;

        let required = DocumentKind::required_for(form.role);
        info!(
            "[Registration] {}: {} document(s) to upload",
            RegistrationStage::UploadingDocuments,
            required.len()
        );
        let mut document_urls = BTreeMap::new();
        let mut document_warnings = Vec::new();
        for &kind in required {
            let bucket = kind.bucket(self.buckets);
            match self
                .backend
                .upload_document(form.documents.get(&kind), bucket, &created.account_id)
                .await
            {
                Ok(url) => {
                    document_urls.insert(kind, url);
                }
                Err(e) => {
                    warn!(
                        "[Registration] {} upload failed, account remains usable: {}",
                        kind, e
                    );
                    document_warnings.push(DocumentWarning {
                        kind,
                        message: e.to_string(),
                    });
                }
            }
        }

        let mut profile_warning = None;
        if document_urls.is_empty() {
            info!(
                "[Registration] {}: skipped, no document URLs to record",
                RegistrationStage::UpdatingProfile
            );
        } else {
            info!(
                "[Registration] {}: recording {} document URL(s)",
                RegistrationStage::UpdatingProfile,
                document_urls.len()
            );
            let changes = ProfileChanges::from_document_urls(&document_urls);
            if let Err(e) = self
                .backend
                .apply_profile_changes(&created.account_id, &changes)
                .await
            {
                warn!("[Registration] Profile update failed after upload: {}", e);
                profile_warning = Some(e.to_string());
            }
        }

        info!(
            "[Registration] {}: finished for account {}",
            RegistrationStage::Done,
            created.account_id
        );
        Ok(RegistrationReport {
            account_id: created.account_id,
            pending_verification: created.pending_verification,
            profile_provisioned,
            document_urls,
            document_warnings,
            profile_warning,
        })
    }

    /// The profile record is created by a backend trigger; wait for it with a
    /// bounded poll instead of assuming it is already there.
    async fn await_profile(&self, account_id: &str) -> bool {
        let attempts = self.provisioning.max_attempts;
        for attempt in 1..=attempts {
            match self.backend.profile_exists(account_id).await {
                Ok(true) => return true,
                Ok(false) => info!(
                    "[Registration] Profile for {} not provisioned yet (attempt {}/{})",
                    account_id, attempt, attempts
                ),
                Err(e) => warn!(
                    "[Registration] Profile probe failed (attempt {}/{}): {}",
                    attempt, attempts, e
                ),
            }
            if attempt < attempts {
                sleep(Duration::from_millis(self.provisioning.retry_delay_ms)).await;
            }
        }
        warn!(
            "[Registration] Profile for {} still missing after {} attempt(s)",
            account_id, attempts
        );
        false
    }
}

/// Live [`RegistrationBackend`] over the HTTP client. The signup response may
/// open a session immediately; its tokens are captured so the follow-up calls
/// run with the freshest credentials available, falling back to the
/// publishable key otherwise.
pub struct ClientBackend {
    client: BackendClient,
    tokens: Mutex<Option<SessionTokens>>,
}

impl ClientBackend {
    pub fn new(client: BackendClient) -> Self {
        Self {
            client,
            tokens: Mutex::new(None),
        }
    }

    fn current_tokens(&self) -> Option<SessionTokens> {
        self.tokens.lock().ok().and_then(|guard| guard.clone())
    }

    fn remember_tokens(&self, tokens: Option<SessionTokens>) {
        if let Ok(mut guard) = self.tokens.lock() {
            *guard = tokens;
        }
    }
}

#[async_trait]
impl RegistrationBackend for ClientBackend {
    async fn create_account(
        &self,
        request: &CreateAccountRequest,
    ) -> Result<CreatedAccount, AuthError> {
        let created = self.client.create_account(request).await?;
        self.remember_tokens(created.tokens.clone());
        Ok(created)
    }

    async fn profile_exists(&self, account_id: &str) -> Result<bool, ProfileError> {
        let tokens = self.current_tokens();
        let profile = self
            .client
            .fetch_profile(account_id, tokens.as_ref())
            .await?;
        Ok(profile.is_some())
    }

    async fn upload_document(
        &self,
        source: Option<&DocumentSource>,
        bucket: &str,
        account_id: &str,
    ) -> Result<String, StorageError> {
        let tokens = self.current_tokens();
        self.client
            .upload_document(source, bucket, account_id, tokens.as_ref())
            .await
    }

    async fn apply_profile_changes(
        &self,
        account_id: &str,
        changes: &ProfileChanges,
    ) -> Result<(), ProfileError> {
        let tokens = self.current_tokens();
        self.client
            .update_profile(account_id, changes, tokens.as_ref())
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::client::types::UserRole;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// In-memory backend double recording every call.
    #[derive(Default)]
    struct FakeBackend {
        fail_account: Option<AuthError>,
        failing_buckets: Vec<String>,
        fail_update: Option<ProfileError>,
        profile_never_provisions: bool,
        probes: AtomicU32,
        accounts: Mutex<Vec<CreateAccountRequest>>,
        uploads: Mutex<Vec<(String, String, bool)>>,
        updates: Mutex<Vec<(String, ProfileChanges)>>,
    }

    impl FakeBackend {
        fn upload_count(&self) -> usize {
            self.uploads.lock().unwrap().len()
        }

        fn update_count(&self) -> usize {
            self.updates.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl RegistrationBackend for FakeBackend {
        async fn create_account(
            &self,
            request: &CreateAccountRequest,
        ) -> Result<CreatedAccount, AuthError> {
            if let Some(err) = &self.fail_account {
                return Err(err.clone());
            }
            self.accounts.lock().unwrap().push(request.clone());
            Ok(CreatedAccount {
                account_id: "acct-1".to_string(),
                email: request.email.clone(),
                pending_verification: true,
                tokens: None,
            })
        }

        async fn profile_exists(&self, _account_id: &str) -> Result<bool, ProfileError> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            Ok(!self.profile_never_provisions)
        }

        async fn upload_document(
            &self,
            source: Option<&DocumentSource>,
            bucket: &str,
            account_id: &str,
        ) -> Result<String, StorageError> {
            self.uploads.lock().unwrap().push((
                bucket.to_string(),
                account_id.to_string(),
                source.is_some(),
            ));
            let source = source.ok_or(StorageError::NoSourceProvided)?;
            if self.failing_buckets.iter().any(|b| b == bucket) {
                return Err(StorageError::Network {
                    message: "connection reset during transfer".to_string(),
                });
            }
            Ok(format!(
                "https://cdn.test/{}/{}.{}",
                bucket,
                account_id,
                source.extension()
            ))
        }

        async fn apply_profile_changes(
            &self,
            account_id: &str,
            changes: &ProfileChanges,
        ) -> Result<(), ProfileError> {
            if let Some(err) = &self.fail_update {
                return Err(err.clone());
            }
            self.updates
                .lock()
                .unwrap()
                .push((account_id.to_string(), changes.clone()));
            Ok(())
        }
    }

    fn quick_poll() -> ProvisioningConfig {
        ProvisioningConfig {
            max_attempts: 3,
            retry_delay_ms: 0,
        }
    }

    fn passenger_form() -> RegistrationForm {
        let mut form = RegistrationForm::new(UserRole::Passenger);
        form.email = "a@b.com".to_string();
        form.password = "secret1".to_string();
        form.confirm_password = "secret1".to_string();
        form.first_name = "Ana".to_string();
        form.last_name = "Cruz".to_string();
        form.contact_no = "09171234567".to_string();
        form.attach_document(
            DocumentKind::ValidId,
            DocumentSource::new("valid-id.jpeg", vec![1, 2, 3]),
        );
        form
    }

    fn driver_form() -> RegistrationForm {
        let mut form = RegistrationForm::new(UserRole::Driver);
        form.email = "ben@example.com".to_string();
        form.password = "secret1".to_string();
        form.confirm_password = "secret1".to_string();
        form.first_name = "Ben".to_string();
        form.last_name = "Reyes".to_string();
        form.contact_no = "09181234567".to_string();
        form.license_number = "N01-23-456789".to_string();
        form.plate_number = "ABC 1234".to_string();
        form.vehicle_model = "Mirage G4".to_string();
        for kind in DocumentKind::required_for(UserRole::Driver) {
            form.attach_document(*kind, DocumentSource::new("photo.jpg", vec![1]));
        }
        form
    }

    #[tokio::test]
    async fn test_invalid_form_makes_zero_backend_calls() {
        let backend = FakeBackend::default();
        let buckets = BucketsConfig::default();
        let provisioning = quick_poll();
        let orchestrator = RegistrationOrchestrator::new(&backend, &buckets, &provisioning);

        let mut form = passenger_form();
        form.password = "abc".to_string();
        form.confirm_password = "abc".to_string();

        let err = orchestrator.run(&form).await.unwrap_err();
        match &err {
            RegistrationError::Validation { field_errors } => {
                assert!(field_errors.contains_key("password"));
            }
            other => panic!("expected Validation, got {:?}", other),
        }
        assert_eq!(err.stage(), RegistrationStage::Validating);

        assert!(backend.accounts.lock().unwrap().is_empty());
        assert_eq!(backend.upload_count(), 0);
        assert_eq!(backend.update_count(), 0);
    }

    #[tokio::test]
    async fn test_account_creation_failure_halts_the_attempt() {
        let backend = FakeBackend {
            fail_account: Some(AuthError::DuplicateAccount),
            ..FakeBackend::default()
        };
        let buckets = BucketsConfig::default();
        let provisioning = quick_poll();
        let orchestrator = RegistrationOrchestrator::new(&backend, &buckets, &provisioning);

        let err = orchestrator.run(&passenger_form()).await.unwrap_err();
        assert_eq!(err.stage(), RegistrationStage::CreatingAccount);

        // No account means no valid key for anything after it.
        assert_eq!(backend.probes.load(Ordering::SeqCst), 0);
        assert_eq!(backend.upload_count(), 0);
        assert_eq!(backend.update_count(), 0);
    }

    #[tokio::test]
    async fn test_passenger_registration_end_to_end() {
        let backend = FakeBackend::default();
        let buckets = BucketsConfig::default();
        let provisioning = quick_poll();
        let orchestrator = RegistrationOrchestrator::new(&backend, &buckets, &provisioning);

        let report = orchestrator.run(&passenger_form()).await.unwrap();
        assert_eq!(report.account_id, "acct-1");
        assert!(report.pending_verification);
        assert!(report.profile_provisioned);
        assert!(report.is_clean());

        // Exactly one upload, into the valid-id bucket, keyed by the account.
        let uploads = backend.uploads.lock().unwrap();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0], ("valid-id".to_string(), "acct-1".to_string(), true));
        drop(uploads);

        let updates = backend.updates.lock().unwrap();
        assert_eq!(updates.len(), 1);
        let (account_id, changes) = &updates[0];
        assert_eq!(account_id, "acct-1");
        assert_eq!(
            changes.valid_id_url.as_deref(),
            Some("https://cdn.test/valid-id/acct-1.jpeg")
        );

        // The metadata forwarded for the profile trigger carried the role.
        let accounts = backend.accounts.lock().unwrap();
        assert_eq!(accounts[0].attributes.user_type, UserRole::Passenger);
    }

    #[tokio::test]
    async fn test_single_upload_failure_keeps_the_rest() {
        let backend = FakeBackend {
            failing_buckets: vec!["vehicles".to_string()],
            ..FakeBackend::default()
        };
        let buckets = BucketsConfig::default();
        let provisioning = quick_poll();
        let orchestrator = RegistrationOrchestrator::new(&backend, &buckets, &provisioning);

        let report = orchestrator.run(&driver_form()).await.unwrap();

        // All three uploads were attempted; one failed.
        assert_eq!(backend.upload_count(), 3);
        assert_eq!(report.document_warnings.len(), 1);
        assert_eq!(report.document_warnings[0].kind, DocumentKind::VehiclePhoto);
        assert!(!report.is_clean());

        // The profile update still ran, with the two surviving URLs.
        let updates = backend.updates.lock().unwrap();
        assert_eq!(updates.len(), 1);
        let (_, changes) = &updates[0];
        assert!(changes.vehicle_image_url.is_none());
        assert!(changes.certificate_of_registration_url.is_some());
        assert!(changes.drivers_license_url.is_some());
    }

    #[tokio::test]
    async fn test_all_uploads_failing_skips_the_profile_update() {
        let backend = FakeBackend {
            failing_buckets: vec![
                "vehicles".to_string(),
                "certificate-of-registration".to_string(),
                "driver-id".to_string(),
            ],
            ..FakeBackend::default()
        };
        let buckets = BucketsConfig::default();
        let provisioning = quick_poll();
        let orchestrator = RegistrationOrchestrator::new(&backend, &buckets, &provisioning);

        let report = orchestrator.run(&driver_form()).await.unwrap();

        // The attempt still completes: the account is viable without its
        // documents.
        assert_eq!(report.document_warnings.len(), 3);
        assert!(report.document_urls.is_empty());
        assert_eq!(backend.update_count(), 0);
    }

    #[tokio::test]
    async fn test_profile_update_failure_is_a_warning_not_a_rollback() {
        let backend = FakeBackend {
            fail_update: Some(ProfileError::Network {
                message: "connection reset".to_string(),
            }),
            ..FakeBackend::default()
        };
        let buckets = BucketsConfig::default();
        let provisioning = quick_poll();
        let orchestrator = RegistrationOrchestrator::new(&backend, &buckets, &provisioning);

        let report = orchestrator.run(&passenger_form()).await.unwrap();
        assert_eq!(report.account_id, "acct-1");
        assert!(report.profile_warning.is_some());
        assert_eq!(report.document_urls.len(), 1);
    }

    #[tokio::test]
    async fn test_profile_provisioning_poll_is_bounded() {
        let backend = FakeBackend {
            profile_never_provisions: true,
            ..FakeBackend::default()
        };
        let buckets = BucketsConfig::default();
        let provisioning = quick_poll();
        let orchestrator = RegistrationOrchestrator::new(&backend, &buckets, &provisioning);

        let report = orchestrator.run(&passenger_form()).await.unwrap();
        assert!(!report.profile_provisioned);
        assert_eq!(backend.probes.load(Ordering::SeqCst), 3);
        // The attempt still went on to the uploads.
        assert_eq!(backend.upload_count(), 1);
    }
}
