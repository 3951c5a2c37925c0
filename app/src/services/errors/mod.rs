use std::collections::BTreeMap;

use thiserror::Error;

use crate::services::client::errors::AuthError;

/// Stages of one registration attempt, in execution order. Terminal failures
/// carry the stage they happened in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegistrationStage {
    Validating,
    CreatingAccount,
    UploadingDocuments,
    UpdatingProfile,
    Done,
}

impl std::fmt::Display for RegistrationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RegistrationStage::Validating => "validating",
            RegistrationStage::CreatingAccount => "creating account",
            RegistrationStage::UploadingDocuments => "uploading documents",
            RegistrationStage::UpdatingProfile => "updating profile",
            RegistrationStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Hard failures of a registration attempt. Document upload and profile
/// update problems are deliberately absent: once the account exists they
/// degrade to warnings on the report instead of failing the attempt.
#[derive(Debug, Clone, Error)]
pub enum RegistrationError {
    #[error("{} field(s) failed validation", .field_errors.len())]
    Validation {
        field_errors: BTreeMap<&'static str, String>,
    },

    #[error("account creation failed: {0}")]
    AccountCreation(#[from] AuthError),
}

impl RegistrationError {
    /// The stage the attempt failed in.
    pub fn stage(&self) -> RegistrationStage {
        match self {
            RegistrationError::Validation { .. } => RegistrationStage::Validating,
            RegistrationError::AccountCreation(_) => RegistrationStage::CreatingAccount,
        }
    }

    /// Whether simply re-submitting the same attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RegistrationError::AccountCreation(AuthError::Network { .. })
        )
    }
}
