// Authentication types

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Safety margin subtracted from the server-reported lifetime
pub const EXPIRY_BUFFER_SECS: i64 = 60;

/// OAuth grant used to obtain a credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantType {
    /// Browser login captured by the loopback callback
    AuthorizationCode,

    /// Application-only token
    ClientCredentials,

    /// Renewal of a previously issued user token
    RefreshToken,
}

impl GrantType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GrantType::AuthorizationCode => "authorization_code",
            GrantType::ClientCredentials => "client_credentials",
            GrantType::RefreshToken => "refresh_token",
        }
    }
}

/// A usable access credential
#[derive(Debug, Clone, PartialEq)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    /// Credential with no known expiry, e.g. a pre-issued token
    pub fn unbounded(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
        }
    }

    /// Build a credential from a token endpoint answer
    pub fn from_response(response: TokenResponse, now: DateTime<Utc>) -> Self {
        let issued_at = response
            .created_at
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
            .unwrap_or(now);

        let expires_at = response
            .expires_in
            .and_then(|secs| expiry_after(issued_at, secs));

        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_at,
        }
    }

    /// True when the credential expires within `threshold_secs`.
    /// A credential without expiry information is never considered expiring.
    pub fn is_expiring(&self, now: DateTime<Utc>, threshold_secs: u64) -> bool {
        let Some(exp) = self.expires_at else {
            return false;
        };

        match i64::try_from(threshold_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|d| now.checked_add_signed(d))
        {
            Some(limit) => exp <= limit,
            // Threshold reaches past the representable range
            None => true,
        }
    }

    /// Short token prefix safe for logs
    pub fn redacted(&self) -> String {
        let prefix: String = self.access_token.chars().take(8).collect();
        format!("{}...", prefix)
    }
}

/// `start + lifetime - EXPIRY_BUFFER_SECS`, or `None` when the lifetime is out of range
pub fn expiry_after(start: DateTime<Utc>, lifetime_secs: u64) -> Option<DateTime<Utc>> {
    let expires_at = i64::try_from(lifetime_secs)
        .ok()
        .and_then(|secs| secs.checked_sub(EXPIRY_BUFFER_SECS))
        .and_then(Duration::try_seconds)
        .and_then(|lifetime| start.checked_add_signed(lifetime));

    if expires_at.is_none() {
        tracing::warn!("Ignoring out-of-range token lifetime: {}s", lifetime_secs);
    }
    expires_at
}

/// `POST /oauth/token` response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub created_at: Option<i64>,
}

/// OAuth error body
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthErrorBody {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// On-disk credential representation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCredential {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}
