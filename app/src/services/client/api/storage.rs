//! Document upload pipeline against the bucketed object storage collaborator.
//!
//! Object keys are derived deterministically from the account identifier and
//! the source file's extension, and uploads request overwrite-if-exists, so a
//! retried upload replaces the previous object instead of orphaning it.

use anyhow::Result;
use tracing::{error, info, instrument};

use crate::services::client::errors::StorageError;
use crate::services::client::types::*;
use crate::services::client::BackendClient;

/// Stable object key for a document: `{account_id}.{extension}`. The same
/// account and extension always map to the same object.
pub fn object_key(account_id: &str, source: &DocumentSource) -> String {
    format!("{}.{}", account_id, source.extension())
}

/// Durable public URL for an object key within a bucket.
pub fn public_object_url(base_url: &str, bucket: &str, key: &str) -> String {
    format!("{}/storage/v1/object/public/{}/{}", base_url, bucket, key)
}

/// Implementation of upload_document functionality
/// Transfers the picked document into the named bucket and resolves its
/// public URL. Each invocation handles exactly one document.
#[instrument(skip(client, source, tokens), err)]
pub async fn upload_document_impl(
    client: &BackendClient,
    source: Option<&DocumentSource>,
    bucket: &str,
    account_id: &str,
    tokens: Option<&SessionTokens>,
) -> Result<String, StorageError> {
    let source = source.ok_or(StorageError::NoSourceProvided)?;

    let key = object_key(account_id, source);
    info!(
        "Uploading document to bucket '{}' as '{}', size: {} bytes",
        bucket,
        key,
        source.len()
    );

    let upload_url = client.storage_object_url(bucket, &key);

    let response = client
        .http_client
        .post(&upload_url)
        .header("apikey", &client.config.anon_key)
        .header(
            "Authorization",
            format!("Bearer {}", client.bearer_token(tokens)),
        )
        .header("Content-Type", source.content_type())
        // Overwrite-if-exists keeps retried uploads idempotent.
        .header("x-upsert", "true")
        .body(source.bytes.clone())
        .send()
        .await
        .map_err(|e| StorageError::Network {
            message: format!("Failed to upload document: {}", e),
        })?;

    let status = response.status();
    if status.is_success() {
        let url = public_object_url(&client.config.base_url, bucket, &key);
        info!("Document uploaded successfully: {}", url);
        Ok(url)
    } else {
        let error_text = response.text().await.unwrap_or_default();
        error!(
            "Document upload to '{}' failed with status {}: {}",
            bucket, status, error_text
        );
        Err(map_upload_failure(status.as_u16(), &error_text, bucket))
    }
}

/// Map a storage refusal to the upload error taxonomy.
pub(crate) fn map_upload_failure(status: u16, body: &str, bucket: &str) -> StorageError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("msg"))
                .or_else(|| v.get("error"))
                .and_then(|m| m.as_str())
                .map(|m| m.to_string())
        })
        .unwrap_or_else(|| body.to_string());

    match status {
        413 => StorageError::PayloadTooLarge { message },
        401 | 403 => StorageError::PermissionDenied {
            bucket: bucket.to_string(),
            message,
        },
        404 => StorageError::BucketNotFound {
            bucket: bucket.to_string(),
        },
        400 if message.to_lowercase().contains("bucket not found") => {
            StorageError::BucketNotFound {
                bucket: bucket.to_string(),
            }
        }
        s => StorageError::Network {
            message: format!("status {}: {}", s, message),
        },
    }
}
