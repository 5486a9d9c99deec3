// Credential persistence as a JSON file

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use std::path::PathBuf;

use super::types::{expiry_after, Credential, StoredCredential};

/// JSON file holding the last issued credential
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read the persisted credential, `None` when no file exists
    pub fn load(&self) -> Result<Option<Credential>> {
        if !self.path.exists() {
            tracing::debug!("No stored credential at {}", self.path.display());
            return Ok(None);
        }

        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read credential file: {}", self.path.display()))?;
        let stored: StoredCredential = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse credential file: {}", self.path.display()))?;

        Ok(Some(from_stored(stored)))
    }

    /// Persist a credential, replacing whatever was stored before
    pub fn save(&self, credential: &Credential) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let stored = StoredCredential {
            access_token: credential.access_token.clone(),
            refresh_token: credential.refresh_token.clone(),
            token_type: Some("bearer".to_string()),
            expires_in: None,
            expires_at: credential.expires_at.map(|dt| dt.to_rfc3339()),
            created_at: None,
        };

        let json = serde_json::to_string_pretty(&stored).context("Failed to serialize credential")?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write credential file: {}", self.path.display()))?;

        tracing::info!("Credential saved to {}", self.path.display());
        Ok(())
    }

    /// Remove the persisted credential; a missing file is fine
    pub fn discard(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::info!("Discarded stored credential {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to remove credential file: {}", self.path.display())),
        }
    }
}

fn from_stored(stored: StoredCredential) -> Credential {
    let expires_at = match stored.expires_at.as_deref() {
        Some(s) => match parse_datetime(s) {
            Ok(dt) => Some(dt),
            Err(e) => {
                tracing::warn!("Ignoring stored expiry: {}", e);
                None
            }
        },
        // Raw token responses carry created_at + expires_in instead
        None => match (stored.created_at, stored.expires_in) {
            (Some(created), Some(lifetime)) => Utc
                .timestamp_opt(created, 0)
                .single()
                .and_then(|dt| expiry_after(dt, lifetime)),
            _ => None,
        },
    };

    Credential {
        access_token: stored.access_token,
        refresh_token: stored.refresh_token,
        expires_at,
    }
}

/// Parse datetime from ISO 8601, with or without a Z suffix
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
    let normalized = match s.strip_suffix('Z') {
        Some(head) => format!("{}+00:00", head),
        None => s.to_string(),
    };

    DateTime::parse_from_rfc3339(&normalized)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("Failed to parse datetime: {}", s))
}
