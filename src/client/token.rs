use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::constants::TOKEN_TTL_DAYS;
use super::error::{ClientError, ClientResult};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/* Persisted access token.
 * The backend issues a bearer token on login; it is kept in a small JSON
 * file with a fixed expiry stamped at save time. An expired token reads
 * as absent and the file is removed.
 */
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    // Saves a token with the fixed 7-day expiry.
    pub fn save(&self, token: &str) -> ClientResult<()> {
        let stored = StoredToken {
            token: token.to_string(),
            expires_at: Utc::now() + Duration::days(TOKEN_TTL_DAYS),
        };
        let body = serde_json::to_string(&stored)
            .map_err(|e| ClientError::Storage(e.to_string()))?;
        fs::write(&self.path, body)?;
        Ok(())
    }

    // Returns the token if present and unexpired. Missing or expired
    // tokens are not an error at this layer.
    pub fn load(&self) -> Option<String> {
        let body = fs::read_to_string(&self.path).ok()?;
        let stored: StoredToken = match serde_json::from_str(&body) {
            Ok(stored) => stored,
            Err(e) => {
                log::warn!("Discarding unreadable token file: {e}");
                self.clear();
                return None;
            }
        };

        if stored.expires_at <= Utc::now() {
            log::info!("Stored access token expired, removing");
            self.clear();
            return None;
        }

        Some(stored.token)
    }

    // Removes the persisted token, if any.
    pub fn clear(&self) {
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!("Failed to remove token file: {e}");
            }
        }
    }
}
