use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Current time in seconds since UNIX epoch.
pub(crate) fn current_time_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Role tag carried on every profile record. Immutable after creation by
/// backend convention.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Passenger,
    Driver,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Passenger => "passenger",
            UserRole::Driver => "driver",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backend-managed authenticated identity.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Account {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// One row of the `profiles` table, keyed by account id. Created by a
/// backend trigger on signup and updated by the app afterwards; unknown
/// columns are ignored on read.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Profile {
    pub id: String,
    pub user_type: UserRole,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub contact_no: Option<String>,
    #[serde(default)]
    pub license_number: Option<String>,
    #[serde(default)]
    pub plate_number: Option<String>,
    #[serde(default)]
    pub vehicle_model: Option<String>,
    #[serde(default)]
    pub valid_id_url: Option<String>,
    #[serde(default)]
    pub vehicle_image_url: Option<String>,
    #[serde(default)]
    pub certificate_of_registration_url: Option<String>,
    #[serde(default)]
    pub drivers_license_url: Option<String>,
}

/// Profile attributes forwarded as signup metadata; the backend trigger
/// copies them into the new profile record.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ProfileAttributes {
    pub user_type: UserRole,
    pub first_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    pub last_name: String,
    pub contact_no: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plate_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_model: Option<String>,
}

/// Partial profile update; only the set fields are written.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ProfileChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_id_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_of_registration_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drivers_license_url: Option<String>,
}

impl ProfileChanges {
    pub fn is_empty(&self) -> bool {
        self.valid_id_url.is_none()
            && self.vehicle_image_url.is_none()
            && self.certificate_of_registration_url.is_none()
            && self.drivers_license_url.is_none()
    }
}

/// Account creation request.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CreateAccountRequest {
    pub email: String,
    pub password: String,
    pub attributes: ProfileAttributes,
}

/// Account creation outcome. `tokens` is present only when the backend opens
/// a session immediately (email confirmation disabled); otherwise the account
/// is pending verification.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CreatedAccount {
    pub account_id: String,
    pub email: String,
    pub pending_verification: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<SessionTokens>,
}

/// Transport tokens for an authenticated session. Opaque to the app except
/// for the expiry claim used to evict stale cached sessions.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SessionTokens {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
    pub expires_at: Option<u64>,
}

impl SessionTokens {
    pub fn is_expired(&self) -> bool {
        if let Some(expires_at) = self.expires_at {
            let now = current_time_secs();
            now >= expires_at
        } else {
            false
        }
    }

    pub fn needs_refresh(&self) -> bool {
        if let Some(expires_at) = self.expires_at {
            let now = current_time_secs();
            // Refresh if within 5 minutes of expiry
            now >= expires_at.saturating_sub(300)
        } else {
            false
        }
    }
}

/// Client-held view of "who is currently signed in": the account, its
/// profile record, and the transport tokens backing both.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Session {
    pub account: Account,
    pub profile: Profile,
    pub tokens: SessionTokens,
}

/// A locally picked document: raw bytes plus the original file name. Exists
/// only until upload succeeds, at which point the durable public URL on the
/// profile record replaces it.
#[derive(Debug, Clone)]
pub struct DocumentSource {
    pub file_name: String,
    pub bytes: Bytes,
}

impl DocumentSource {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// Lowercased extension of the source file, defaulting to `jpeg` when the
    /// name carries none. Feeds the deterministic object key, so the same
    /// account and extension always map to the same object.
    pub fn extension(&self) -> String {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.trim().to_ascii_lowercase())
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or_else(|| "jpeg".to_string())
    }

    pub fn content_type(&self) -> String {
        format!("image/{}", self.extension())
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
