use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};

use super::types::{current_time_secs, Session};

/// In-memory store of the currently signed-in session.
///
/// Written on every auth transition (sign-in, signup with an immediate
/// session, restore, sign-out) and read by every screen. Single-writer model:
/// the last successful auth event wins; observers follow along through the
/// watch channel.
#[derive(Clone)]
pub struct SessionStore {
    tx: Arc<watch::Sender<Option<Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Snapshot of the current session, if any.
    pub fn current(&self) -> Option<Session> {
        self.tx.borrow().clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.tx.borrow().is_some()
    }

    pub fn set(&self, session: Session) {
        info!("Session store updated for account: {}", session.account.id);
        self.tx.send_replace(Some(session));
    }

    pub fn clear(&self) {
        self.tx.send_replace(None);
    }

    /// Subscribe to auth transitions.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.tx.subscribe()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Error)]
pub enum SessionCacheError {
    #[error("failed to access the session cache: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize the cached session: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// On-disk persistence for the signed-in session, so a restart can restore
/// "who is signed in" without re-prompting for credentials.
pub struct SessionCache {
    path: PathBuf,
}

impl SessionCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Persist the session as JSON at the configured path.
    pub fn store_session(&self, session: &Session) -> Result<(), SessionCacheError> {
        let session_json = serde_json::to_string(session)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, session_json)?;

        info!("Session cached for account: {}", session.account.id);
        Ok(())
    }

    /// Load the cached session, evicting it when the tokens have expired.
    pub fn load_session(&self) -> Result<Option<Session>, SessionCacheError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let session_json = fs::read_to_string(&self.path)?;
        let session: Session = serde_json::from_str(&session_json)?;

        if session.tokens.is_expired() {
            warn!(
                "Cached session is expired for account: {}",
                session.account.id
            );
            self.clear_session()?;
            return Ok(None);
        }

        Ok(Some(session))
    }

    /// Clear the cached session.
    pub fn clear_session(&self) -> Result<(), SessionCacheError> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        info!("Session cache cleared");
        Ok(())
    }
}

/// JWT token utilities
pub struct JwtUtils;

impl JwtUtils {
    /// Parse JWT expiration time (basic implementation without verification)
    pub fn get_expiration(jwt: &str) -> Option<u64> {
        let parts: Vec<&str> = jwt.split('.').collect();
        if parts.len() != 3 {
            return None;
        }

        // Decode the payload (second part)
        use base64::Engine;
        let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(parts[1])
            .ok()?;
        let payload: serde_json::Value = serde_json::from_slice(&decoded).ok()?;
        payload.get("exp")?.as_u64()
    }

    /// Check if JWT is expired
    pub fn is_expired(jwt: &str) -> bool {
        if let Some(exp) = Self::get_expiration(jwt) {
            let now = current_time_secs();
            now >= exp
        } else {
            true // Assume expired if we can't parse
        }
    }
}
