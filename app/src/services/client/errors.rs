use thiserror::Error;

/// Credential operation errors surfaced by account creation, sign-in,
/// sign-out, and session restore.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("an account with this email is already registered")]
    DuplicateAccount,

    #[error("password rejected by the credential policy: {message}")]
    WeakCredential { message: String },

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("no profile record found for account {account_id}")]
    ProfileNotFound { account_id: String },

    #[error("network error: {message}")]
    Network { message: String },

    #[error("credential operation rejected: {message}")]
    Rejected { message: String },

    #[error("malformed response from the credential endpoint: {message}")]
    BadResponse { message: String },
}

/// Document upload pipeline errors.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("no document source provided")]
    NoSourceProvided,

    #[error("network error during upload: {message}")]
    Network { message: String },

    #[error("document exceeds the maximum allowed size: {message}")]
    PayloadTooLarge { message: String },

    #[error("bucket policy denied the upload to '{bucket}': {message}")]
    PermissionDenied { bucket: String, message: String },

    #[error("storage bucket '{bucket}' does not exist")]
    BucketNotFound { bucket: String },
}

impl StorageError {
    /// Transient failures the user may simply retry; everything else needs a
    /// caller-side fix (configuration, policy, or payload).
    pub fn is_retryable(&self) -> bool {
        matches!(self, StorageError::Network { .. })
    }
}

/// Profile record read/update errors.
#[derive(Debug, Clone, Error)]
pub enum ProfileError {
    #[error("profile record not found for account {account_id}")]
    NotFound { account_id: String },

    #[error("profile request was not authorized")]
    Unauthorized,

    #[error("network error: {message}")]
    Network { message: String },

    #[error("profile operation rejected: {message}")]
    Rejected { message: String },
}

impl From<ProfileError> for AuthError {
    fn from(err: ProfileError) -> Self {
        match err {
            ProfileError::NotFound { account_id } => AuthError::ProfileNotFound { account_id },
            ProfileError::Network { message } => AuthError::Network { message },
            ProfileError::Unauthorized => AuthError::Rejected {
                message: "profile request was not authorized".to_string(),
            },
            ProfileError::Rejected { message } => AuthError::Rejected { message },
        }
    }
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, AuthError>;
