use anyhow::Result;
use tracing::{error, info, instrument};

use crate::services::client::errors::ProfileError;
use crate::services::client::types::*;
use crate::services::client::BackendClient;

/// Implementation of fetch_profile functionality
/// Reads the profile record keyed by the account id. A missing row is a
/// normal outcome (the backend trigger may not have run yet), so it comes
/// back as `None` rather than an error.
#[instrument(skip(client, tokens), err)]
pub async fn fetch_profile_impl(
    client: &BackendClient,
    account_id: &str,
    tokens: Option<&SessionTokens>,
) -> Result<Option<Profile>, ProfileError> {
    let profiles_url = client.rest_url("profiles");

    let response = client
        .http_client
        .get(&profiles_url)
        .query(&[("id", format!("eq.{}", account_id)), ("select", "*".to_string())])
        .header("apikey", &client.config.anon_key)
        .header(
            "Authorization",
            format!("Bearer {}", client.bearer_token(tokens)),
        )
        .send()
        .await
        .map_err(|e| ProfileError::Network {
            message: format!("Failed to read profile: {}", e),
        })?;

    let status = response.status();
    if status.is_success() {
        let rows: Vec<Profile> = response.json().await.map_err(|e| ProfileError::Network {
            message: format!("Failed to parse profile rows: {}", e),
        })?;
        Ok(rows.into_iter().next())
    } else {
        let error_text = response.text().await.unwrap_or_default();
        error!(
            "Profile read for {} failed with status {}: {}",
            account_id, status, error_text
        );
        Err(map_profile_failure(status.as_u16(), &error_text))
    }
}

/// Implementation of update_profile functionality
/// Partially updates the profile record and returns the updated row; zero
/// matched rows surfaces as `NotFound` instead of a silent no-op.
#[instrument(skip(client, changes, tokens), err)]
pub async fn update_profile_impl(
    client: &BackendClient,
    account_id: &str,
    changes: &ProfileChanges,
    tokens: Option<&SessionTokens>,
) -> Result<Profile, ProfileError> {
    info!("Updating profile record for account: {}", account_id);

    let profiles_url = client.rest_url("profiles");

    let response = client
        .http_client
        .patch(&profiles_url)
        .query(&[("id", format!("eq.{}", account_id))])
        .header("apikey", &client.config.anon_key)
        .header(
            "Authorization",
            format!("Bearer {}", client.bearer_token(tokens)),
        )
        .header("Content-Type", "application/json")
        .header("Prefer", "return=representation")
        .json(changes)
        .send()
        .await
        .map_err(|e| ProfileError::Network {
            message: format!("Failed to update profile: {}", e),
        })?;

    let status = response.status();
    if status.is_success() {
        let rows: Vec<Profile> = response.json().await.map_err(|e| ProfileError::Network {
            message: format!("Failed to parse updated profile: {}", e),
        })?;

        match rows.into_iter().next() {
            Some(profile) => {
                info!("Profile updated for account: {}", account_id);
                Ok(profile)
            }
            None => Err(ProfileError::NotFound {
                account_id: account_id.to_string(),
            }),
        }
    } else {
        let error_text = response.text().await.unwrap_or_default();
        error!(
            "Profile update for {} failed with status {}: {}",
            account_id, status, error_text
        );
        Err(map_profile_failure(status.as_u16(), &error_text))
    }
}

pub(crate) fn map_profile_failure(status: u16, body: &str) -> ProfileError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("msg"))
                .and_then(|m| m.as_str())
                .map(|m| m.to_string())
        })
        .unwrap_or_else(|| body.to_string());

    match status {
        401 | 403 => ProfileError::Unauthorized,
        s if s >= 500 => ProfileError::Network {
            message: format!("status {}: {}", s, message),
        },
        _ => ProfileError::Rejected { message },
    }
}
