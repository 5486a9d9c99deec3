use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use super::callback::{authorize_url, CallbackServer};
use super::grants::{self, ClientAuth};
use super::store::CredentialStore;
use super::types::{Credential, GrantType};
use crate::config::Config;
use crate::error::{Result, SyncError};
use crate::http_client::IntraHttpClient;

/// Endpoint answering 200 for any live token, user or application
const TOKEN_INFO_PATH: &str = "/oauth/token/info";

#[derive(Debug, Deserialize)]
struct TokenInfo {
    #[serde(default)]
    resource_owner_id: Option<u64>,
    #[serde(default)]
    expires_in_seconds: Option<i64>,
}

/// Where the candidate token came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Static,
    Stored,
}

/// Token manager
/// Returns a usable bearer token, acquiring and persisting a new credential
/// when the current one is missing, expired or rejected.
pub struct TokenManager {
    http: Arc<IntraHttpClient>,
    store: CredentialStore,

    api_base: String,
    client_id: Option<String>,
    client_secret: Option<String>,
    static_token: Option<String>,

    /// Seconds before expiry at which a stored token counts as expired
    refresh_threshold: u64,
    validate: bool,

    interactive: bool,
    callback_port: u16,
    callback_timeout: Duration,
    redirect_uri: String,
}

impl TokenManager {
    pub fn new(config: &Config, http: Arc<IntraHttpClient>) -> Self {
        Self {
            http,
            store: CredentialStore::new(config.token_file.clone()),
            api_base: config.api_base.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            static_token: config.static_token.clone(),
            refresh_threshold: config.token_refresh_threshold,
            validate: !config.skip_validation,
            interactive: config.interactive,
            callback_port: config.callback_port,
            callback_timeout: Duration::from_secs(config.callback_timeout),
            redirect_uri: config.redirect_uri(),
        }
    }

    /// Get a valid access token.
    /// A candidate rejected with 401 is discarded and exactly one
    /// re-acquisition is attempted; the new token is not probed again.
    pub async fn get_access_token(&self) -> Result<String> {
        let (candidate, refresh_token) = self.candidate()?;

        if let Some((source, credential)) = candidate {
            if !self.validate {
                tracing::debug!("Token validation disabled, using {:?} token", source);
                return Ok(credential.access_token);
            }

            match self.probe(&credential).await {
                Ok(()) => return Ok(credential.access_token),
                Err(e) if e.is_unauthorized() => {
                    tracing::warn!(
                        "{:?} token {} was rejected (401), re-acquiring",
                        source,
                        credential.redacted()
                    );
                    if source == Source::Stored {
                        self.store.discard()?;
                    }
                }
                Err(e) => return Err(e),
            }
        }

        let credential = self.acquire(refresh_token.as_deref()).await?;
        self.store.save(&credential)?;
        Ok(credential.access_token)
    }

    /// Pick the token to try first, plus any refresh token worth keeping
    fn candidate(&self) -> Result<(Option<(Source, Credential)>, Option<String>)> {
        if let Some(ref token) = self.static_token {
            tracing::info!("Using pre-issued access token");
            return Ok((Some((Source::Static, Credential::unbounded(token.clone()))), None));
        }

        let stored = match self.store.load()? {
            Some(cred) => cred,
            None => {
                tracing::info!("No stored credential found");
                return Ok((None, None));
            }
        };

        let refresh_token = stored.refresh_token.clone();
        if stored.is_expiring(Utc::now(), self.refresh_threshold) {
            tracing::info!(
                "Stored token {} is expired or expiring soon",
                stored.redacted()
            );
            return Ok((None, refresh_token));
        }

        Ok((Some((Source::Stored, stored)), refresh_token))
    }

    /// Live validation against the token info endpoint
    async fn probe(&self, credential: &Credential) -> Result<()> {
        let info: TokenInfo = self
            .http
            .get_json(TOKEN_INFO_PATH, &[], &credential.access_token)
            .await?;

        tracing::info!(
            "✅ Token {} is valid (owner: {:?}, expires in: {:?}s)",
            credential.redacted(),
            info.resource_owner_id,
            info.expires_in_seconds
        );
        Ok(())
    }

    /// Grants in preference order, filtered by what is configured
    fn enabled_grants(&self, has_refresh_token: bool) -> Vec<GrantType> {
        if self.client_id.is_none() || self.client_secret.is_none() {
            return Vec::new();
        }

        let mut grants = Vec::with_capacity(3);
        if self.interactive {
            grants.push(GrantType::AuthorizationCode);
        }
        grants.push(GrantType::ClientCredentials);
        if has_refresh_token {
            grants.push(GrantType::RefreshToken);
        }
        grants
    }

    /// Try each enabled grant in order; the first success wins
    async fn acquire(&self, refresh_token: Option<&str>) -> Result<Credential> {
        let grants = self.enabled_grants(refresh_token.is_some());
        if grants.is_empty() {
            return Err(SyncError::Auth(
                "No usable credential and no grant available (set FT_CLIENT_ID and FT_CLIENT_SECRET)"
                    .to_string(),
            ));
        }

        let mut last_error = None;
        for grant in grants {
            match self.run_grant(grant, refresh_token).await {
                Ok(credential) => return Ok(credential),
                Err(e) => {
                    tracing::warn!("{} grant failed: {}", grant.as_str(), e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| SyncError::Auth("Token acquisition failed".to_string())))
    }

    async fn run_grant(&self, grant: GrantType, refresh_token: Option<&str>) -> Result<Credential> {
        let client = ClientAuth {
            client_id: self.client_id.as_deref().unwrap_or_default(),
            client_secret: self.client_secret.as_deref().unwrap_or_default(),
        };

        match grant {
            GrantType::AuthorizationCode => {
                let server = CallbackServer::bind(self.callback_port).await?;
                let url = authorize_url(&self.api_base, client.client_id, &self.redirect_uri)?;
                tracing::info!("🌐 Open this URL to authorize: {}", url);
                println!("Open this URL in your browser to authorize:\n  {}", url);

                let code = server.wait_for_code(self.callback_timeout).await?;
                grants::authorization_code(&self.http, &client, &code, &self.redirect_uri).await
            }
            GrantType::ClientCredentials => grants::client_credentials(&self.http, &client).await,
            GrantType::RefreshToken => match refresh_token {
                Some(token) => grants::refresh_token(&self.http, &client, token).await,
                None => Err(SyncError::Auth("No refresh token available".to_string())),
            },
        }
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }
}
