//! Configuration for the application core.
//!
//! Everything the services need is collected into one [`AppConfig`] built at
//! process start (from the environment in the console shell) and passed down
//! explicitly; there are no ambient globals.

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level configuration handed to the service constructors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Backend endpoint and credentials.
    pub backend: BackendConfig,

    /// Storage bucket names for identity/vehicle documents.
    pub buckets: BucketsConfig,

    /// Bounded poll for the trigger-created profile record.
    pub provisioning: ProvisioningConfig,

    /// Optional path for persisting the signed-in session between runs.
    pub session_cache_path: Option<PathBuf>,
}

/// Backend collaborator endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the backend, without a trailing slash.
    pub base_url: String,

    /// Publishable API key sent with every request; also the bearer fallback
    /// before any session exists.
    pub anon_key: String,

    /// User agent string.
    pub user_agent: String,

    /// Request timeout in milliseconds.
    pub request_timeout_ms: u64,
}

/// Storage bucket names, one per document kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketsConfig {
    pub valid_id: String,
    pub vehicles: String,
    pub certificates: String,
    pub driver_licenses: String,
}

/// Bounded retry/poll applied while waiting for the backend trigger to create
/// the profile record after signup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisioningConfig {
    /// Maximum number of existence probes before giving up.
    pub max_attempts: u32,

    /// Delay between probes in milliseconds.
    pub retry_delay_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            anon_key: String::new(),
            user_agent: "sakay-app/1.0".to_string(),
            request_timeout_ms: 30_000,
        }
    }
}

impl Default for BucketsConfig {
    fn default() -> Self {
        Self {
            valid_id: "valid-id".to_string(),
            vehicles: "vehicles".to_string(),
            certificates: "certificate-of-registration".to_string(),
            driver_licenses: "driver-id".to_string(),
        }
    }
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_delay_ms: 400,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            buckets: BucketsConfig::default(),
            provisioning: ProvisioningConfig::default(),
            session_cache_path: None,
        }
    }
}

impl AppConfig {
    /// Build configuration from `SAKAY_*` environment variables, falling back
    /// to defaults for everything optional. Missing required values are left
    /// empty and reported by [`AppConfig::validate`].
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = env::var("SAKAY_BACKEND_URL") {
            config.backend.base_url = url.trim_end_matches('/').to_string();
        }
        if let Ok(key) = env::var("SAKAY_BACKEND_ANON_KEY") {
            config.backend.anon_key = key;
        }
        if let Some(timeout) = env_u64("SAKAY_HTTP_TIMEOUT_MS") {
            config.backend.request_timeout_ms = timeout;
        }

        if let Ok(bucket) = env::var("SAKAY_BUCKET_VALID_ID") {
            config.buckets.valid_id = bucket;
        }
        if let Ok(bucket) = env::var("SAKAY_BUCKET_VEHICLES") {
            config.buckets.vehicles = bucket;
        }
        if let Ok(bucket) = env::var("SAKAY_BUCKET_CERTIFICATES") {
            config.buckets.certificates = bucket;
        }
        if let Ok(bucket) = env::var("SAKAY_BUCKET_DRIVER_LICENSES") {
            config.buckets.driver_licenses = bucket;
        }

        if let Some(attempts) = env_u64("SAKAY_PROFILE_POLL_ATTEMPTS") {
            config.provisioning.max_attempts = attempts as u32;
        }
        if let Some(delay) = env_u64("SAKAY_PROFILE_POLL_DELAY_MS") {
            config.provisioning.retry_delay_ms = delay;
        }

        if let Ok(path) = env::var("SAKAY_SESSION_CACHE") {
            if !path.trim().is_empty() {
                config.session_cache_path = Some(PathBuf::from(path));
            }
        }

        config
    }

    /// Validate the configuration, collecting every problem rather than
    /// stopping at the first one.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.backend.base_url.trim().is_empty() {
            errors.push("backend base_url must be set (SAKAY_BACKEND_URL)".to_string());
        } else if !self.backend.base_url.starts_with("http") {
            errors.push(format!(
                "backend base_url must be an http(s) URL, got '{}'",
                self.backend.base_url
            ));
        }

        if self.backend.anon_key.trim().is_empty() {
            errors.push("backend anon_key must be set (SAKAY_BACKEND_ANON_KEY)".to_string());
        }

        if self.backend.request_timeout_ms == 0 {
            errors.push("backend request_timeout_ms must be greater than 0".to_string());
        }

        for (name, bucket) in [
            ("valid_id", &self.buckets.valid_id),
            ("vehicles", &self.buckets.vehicles),
            ("certificates", &self.buckets.certificates),
            ("driver_licenses", &self.buckets.driver_licenses),
        ] {
            if bucket.trim().is_empty() {
                errors.push(format!("bucket name '{}' must not be empty", name));
            }
        }

        if self.provisioning.max_attempts == 0 {
            errors.push("provisioning max_attempts must be greater than 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn env_u64(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|value| value.parse().ok())
}
