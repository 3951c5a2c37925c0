use anyhow::Result;
use serde_json::json;
use tracing::{error, info, instrument};

use crate::services::client::auth::account::parse_session_tokens;
use crate::services::client::errors::AuthError;
use crate::services::client::types::*;
use crate::services::client::BackendClient;

/// Implementation of create_session functionality
/// Password sign-in against the credential endpoint.
#[instrument(skip(client, password), err)]
pub async fn create_session_impl(
    client: &BackendClient,
    email: &str,
    password: &str,
) -> Result<(Account, SessionTokens), AuthError> {
    info!("Creating session for email: {}", email);

    let token_url = client.auth_url("token");
    let request_body = json!({
        "email": email,
        "password": password,
    });

    let response = client
        .http_client
        .post(&token_url)
        .query(&[("grant_type", "password")])
        .header("apikey", &client.config.anon_key)
        .header("Content-Type", "application/json")
        .json(&request_body)
        .send()
        .await
        .map_err(|e| AuthError::Network {
            message: format!("Failed to call token endpoint: {}", e),
        })?;

    let status = response.status();
    if status.is_success() {
        let session_data: serde_json::Value =
            response.json().await.map_err(|e| AuthError::Network {
                message: format!("Failed to parse token response: {}", e),
            })?;

        let tokens = parse_session_tokens(&session_data).ok_or_else(|| AuthError::BadResponse {
            message: "sign-in succeeded but no session tokens were provided".to_string(),
        })?;
        let account = parse_account(session_data.get("user").unwrap_or(&session_data), email)?;

        info!("Sign-in successful for account: {}", account.id);
        Ok((account, tokens))
    } else {
        let error_text = response.text().await.unwrap_or_default();
        error!("Sign-in failed with status {}: {}", status, error_text);
        Err(map_token_failure(status.as_u16(), &error_text))
    }
}

/// Implementation of end_session functionality
/// Invalidates the backend session behind the given tokens.
#[instrument(skip(client, tokens), err)]
pub async fn end_session_impl(
    client: &BackendClient,
    tokens: &SessionTokens,
) -> Result<(), AuthError> {
    let logout_url = client.auth_url("logout");

    let response = client
        .http_client
        .post(&logout_url)
        .header("apikey", &client.config.anon_key)
        .header(
            "Authorization",
            format!("Bearer {}", tokens.access_token),
        )
        .send()
        .await
        .map_err(|e| AuthError::Network {
            message: format!("Failed to call logout: {}", e),
        })?;

    let status = response.status();
    if status.is_success() {
        info!("Session ended");
        Ok(())
    } else {
        let error_text = response.text().await.unwrap_or_default();
        error!("Sign-out failed with status {}: {}", status, error_text);
        Err(AuthError::Rejected {
            message: format!("sign-out failed: {}", error_text),
        })
    }
}

/// Implementation of fetch_account functionality
/// One-shot probe of the identity behind a set of tokens.
#[instrument(skip(client, tokens), err)]
pub async fn fetch_account_impl(
    client: &BackendClient,
    tokens: &SessionTokens,
) -> Result<Account, AuthError> {
    let user_url = client.auth_url("user");

    let response = client
        .http_client
        .get(&user_url)
        .header("apikey", &client.config.anon_key)
        .header(
            "Authorization",
            format!("Bearer {}", tokens.access_token),
        )
        .send()
        .await
        .map_err(|e| AuthError::Network {
            message: format!("Failed to call user endpoint: {}", e),
        })?;

    let status = response.status();
    if status.is_success() {
        let user_data: serde_json::Value =
            response.json().await.map_err(|e| AuthError::Network {
                message: format!("Failed to parse user response: {}", e),
            })?;
        parse_account(&user_data, "")
    } else {
        let error_text = response.text().await.unwrap_or_default();
        Err(AuthError::Rejected {
            message: format!("session probe failed with status {}: {}", status, error_text),
        })
    }
}

fn parse_account(user: &serde_json::Value, fallback_email: &str) -> Result<Account, AuthError> {
    let id = user["id"].as_str().unwrap_or_default().to_string();
    if id.is_empty() {
        return Err(AuthError::BadResponse {
            message: "response carried no account id".to_string(),
        });
    }

    Ok(Account {
        id,
        email: user["email"].as_str().unwrap_or(fallback_email).to_string(),
        phone: user["phone"]
            .as_str()
            .filter(|phone| !phone.is_empty())
            .map(|phone| phone.to_string()),
    })
}

/// Map a sign-in refusal to the credential error taxonomy.
pub(crate) fn map_token_failure(status: u16, body: &str) -> AuthError {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();

    let error_code = parsed
        .as_ref()
        .and_then(|v| {
            v.get("error_code")
                .or_else(|| v.get("error"))
                .and_then(|c| c.as_str())
        })
        .unwrap_or_default()
        .to_string();
    let message = parsed
        .as_ref()
        .and_then(|v| {
            v.get("msg")
                .or_else(|| v.get("message"))
                .or_else(|| v.get("error_description"))
                .and_then(|m| m.as_str())
        })
        .unwrap_or(body)
        .to_string();
    let lowered = message.to_lowercase();

    if error_code == "invalid_grant"
        || error_code == "invalid_credentials"
        || lowered.contains("invalid login credentials")
    {
        return AuthError::InvalidCredentials;
    }

    if status >= 500 {
        return AuthError::Network {
            message: format!("sign-in failed with status {}: {}", status, message),
        };
    }

    AuthError::Rejected {
        message: if message.is_empty() {
            format!("sign-in failed with status {}", status)
        } else {
            message
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_credentials_mapping() {
        let by_code = map_token_failure(
            400,
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
        );
        assert!(matches!(by_code, AuthError::InvalidCredentials));

        let by_message = map_token_failure(400, r#"{"msg":"Invalid login credentials"}"#);
        assert!(matches!(by_message, AuthError::InvalidCredentials));
    }

    #[test]
    fn test_unconfirmed_email_surfaces_backend_text() {
        let err = map_token_failure(400, r#"{"error_code":"email_not_confirmed","msg":"Email not confirmed"}"#);
        match err {
            AuthError::Rejected { message } => assert_eq!(message, "Email not confirmed"),
            other => panic!("expected Rejected, got {:?}", other),
        }
    }

    #[test]
    fn test_server_errors_map_to_network() {
        assert!(matches!(
            map_token_failure(503, "service unavailable"),
            AuthError::Network { .. }
        ));
    }

    #[test]
    fn test_parse_account() {
        let user = serde_json::json!({ "id": "acct-1", "email": "a@b.com", "phone": "" });
        let account = parse_account(&user, "fallback@b.com").unwrap();
        assert_eq!(account.id, "acct-1");
        assert_eq!(account.email, "a@b.com");
        assert!(account.phone.is_none());

        let empty = serde_json::json!({ "email": "a@b.com" });
        assert!(parse_account(&empty, "").is_err());
    }
}
