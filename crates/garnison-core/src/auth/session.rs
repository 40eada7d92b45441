use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

/// Strapi issues JWTs valid for 30 days by default.
const TOKEN_EXPIRY_DAYS: i64 = 30;

/// Refresh a little early so a long export never starts on a dying token
const TOKEN_REFRESH_BUFFER_HOURS: i64 = 12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub jwt: String,
    pub user_id: i64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl SessionData {
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + Duration::days(TOKEN_EXPIRY_DAYS)
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at()
    }

    /// Check if the session will expire soon and should be renewed
    pub fn needs_refresh(&self) -> bool {
        Utc::now() > self.expires_at() - Duration::hours(TOKEN_REFRESH_BUFFER_HOURS)
    }

    /// Days remaining until expiry (for display)
    pub fn days_until_expiry(&self) -> i64 {
        (self.expires_at() - Utc::now()).num_days().max(0)
    }
}

/// Session persisted as `session.json` in the cache directory
pub struct Session {
    cache_dir: PathBuf,
    pub data: Option<SessionData>,
}

impl Session {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            data: None,
        }
    }

    /// Load session from disk. Returns false when there is none or it expired.
    pub fn load(&mut self) -> Result<bool> {
        let path = self.session_path();
        if path.exists() {
            let contents = std::fs::read_to_string(&path).context("Failed to read session file")?;
            let data: SessionData =
                serde_json::from_str(&contents).context("Failed to parse session file")?;

            if !data.is_expired() {
                self.data = Some(data);
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn save(&self) -> Result<()> {
        if let Some(ref data) = self.data {
            let path = self.session_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let contents = serde_json::to_string_pretty(data)?;
            std::fs::write(path, contents)?;
        }
        Ok(())
    }

    /// Forget the session, on disk too
    pub fn clear(&mut self) -> Result<()> {
        self.data = None;
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    pub fn update(&mut self, data: SessionData) {
        self.data = Some(data);
    }

    pub fn is_valid(&self) -> bool {
        self.data.as_ref().map(|d| !d.is_expired()).unwrap_or(false)
    }

    /// Valid session data, or an error telling the user to log in
    pub fn require(&self) -> Result<&SessionData> {
        self.data
            .as_ref()
            .filter(|d| !d.is_expired())
            .ok_or_else(|| anyhow::anyhow!("Not logged in. Run `garnison login` first."))
    }

    fn session_path(&self) -> PathBuf {
        self.cache_dir.join(SESSION_FILE)
    }
}
