use clap::Parser;
use std::path::PathBuf;

use crate::classifier::ClassificationRules;
use crate::error::{Result, SyncError};

/// Default intra API host
pub const DEFAULT_API_BASE: &str = "https://api.intra.42.fr";

/// intra-progress - sync 42 project progress into README sections
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// OAuth application UID
    #[arg(long, env = "FT_CLIENT_ID")]
    pub client_id: Option<String>,

    /// OAuth application secret
    #[arg(long, env = "FT_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Login whose projects are listed; without one the token owner is used,
    /// which needs a user token (FT_ACCESS_TOKEN or --interactive)
    #[arg(short, long, env = "FT_LOGIN")]
    pub login: Option<String>,

    /// Pre-issued access token, bypasses the credential store
    #[arg(long, env = "FT_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Intra API base URL
    #[arg(long, env = "FT_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Path of the persisted credential
    #[arg(long, env = "FT_TOKEN_FILE", default_value = "~/.config/intra-progress/token.json")]
    pub token_file: String,

    /// README file holding the marker sections
    #[arg(short, long, env = "README_FILE", default_value = "README.md")]
    pub readme: PathBuf,

    /// Records requested per page
    #[arg(long, env = "FT_PER_PAGE", default_value = "50")]
    pub per_page: u32,

    /// Total HTTP attempts for retryable failures
    #[arg(long, env = "HTTP_MAX_ATTEMPTS", default_value = "5")]
    pub http_attempts: u32,

    /// HTTP request timeout in seconds
    #[arg(long, env = "HTTP_REQUEST_TIMEOUT", default_value = "30")]
    pub http_timeout: u64,

    /// Seconds before expiry at which a stored token is considered stale
    #[arg(long, env = "TOKEN_REFRESH_THRESHOLD", default_value = "300")]
    pub refresh_threshold: u64,

    /// Cursus id of the main curriculum
    #[arg(long, env = "FT_MAIN_CURSUS_ID", default_value = "21")]
    pub main_cursus_id: u32,

    /// Cursus id of the preparatory pool
    #[arg(long, env = "FT_POOL_CURSUS_ID", default_value = "9")]
    pub pool_cursus_id: u32,

    /// Lowest mark counting a main curriculum project as done
    #[arg(long, env = "FT_MAIN_PASS_MARK", default_value = "1")]
    pub main_pass_mark: i64,

    /// Lowest mark counting a pool project as passed
    #[arg(long, env = "FT_POOL_PASS_MARK", default_value = "50")]
    pub pool_pass_mark: i64,

    /// Allow the browser authorization-code flow
    #[arg(short, long, env = "FT_INTERACTIVE")]
    pub interactive: bool,

    /// Loopback port receiving the OAuth redirect
    #[arg(long, env = "FT_CALLBACK_PORT", default_value = "8080")]
    pub callback_port: u16,

    /// Seconds to wait for the OAuth redirect
    #[arg(long, env = "FT_CALLBACK_TIMEOUT", default_value = "120")]
    pub callback_timeout: u64,

    /// Use the static or stored token without checking it against /oauth/token/info
    #[arg(long, env = "FT_SKIP_VALIDATION")]
    pub skip_validation: bool,

    /// Print the updated README instead of writing it
    #[arg(long, env = "DRY_RUN")]
    pub dry_run: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

#[derive(Clone, Debug)]
pub struct Config {
    // Intra API
    pub api_base: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub login: Option<String>,
    pub static_token: Option<String>,

    // Credential lifecycle
    pub token_file: PathBuf,
    pub token_refresh_threshold: u64,
    pub skip_validation: bool,

    // OAuth callback
    pub interactive: bool,
    pub callback_port: u16,
    pub callback_timeout: u64,

    // HTTP client
    pub per_page: u32,
    pub http_max_attempts: u32,
    pub http_request_timeout: u64,

    // Classification
    pub rules: ClassificationRules,

    // Output
    pub readme_file: PathBuf,
    pub dry_run: bool,
    pub log_level: String,
}

impl Config {
    /// Load configuration from all sources with priority: CLI > ENV > defaults
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let args = CliArgs::parse();
        let mut config = Self::from_args(args);

        // Older setups export the login as FT_USERNAME
        if config.login.is_none() {
            config.login = non_empty(std::env::var("FT_USERNAME").ok());
        }

        Ok(config)
    }

    /// Build configuration from parsed arguments
    pub fn from_args(args: CliArgs) -> Self {
        Config {
            api_base: args.api_base.trim_end_matches('/').to_string(),
            client_id: non_empty(args.client_id),
            client_secret: non_empty(args.client_secret),
            login: non_empty(args.login),
            static_token: non_empty(args.access_token),

            token_file: expand_tilde(&args.token_file),
            token_refresh_threshold: args.refresh_threshold,
            skip_validation: args.skip_validation,

            interactive: args.interactive,
            callback_port: args.callback_port,
            callback_timeout: args.callback_timeout,

            per_page: args.per_page,
            http_max_attempts: args.http_attempts,
            http_request_timeout: args.http_timeout,

            rules: ClassificationRules {
                main_cursus_id: args.main_cursus_id,
                pool_cursus_id: args.pool_cursus_id,
                main_pass_mark: args.main_pass_mark,
                pool_pass_mark: args.pool_pass_mark,
            },

            readme_file: args.readme,
            dry_run: args.dry_run,
            log_level: args.log_level,
        }
    }

    /// Validate configuration before any network call
    pub fn validate(&self) -> Result<()> {
        if self.static_token.is_none() && !self.has_client_credentials() {
            return Err(SyncError::Config(
                "FT_CLIENT_ID and FT_CLIENT_SECRET are required unless FT_ACCESS_TOKEN is set"
                    .to_string(),
            ));
        }

        // Client-credentials tokens have no owner to resolve via /v2/me
        if self.login.is_none() && self.static_token.is_none() && !self.interactive {
            return Err(SyncError::Config(
                "FT_LOGIN is required unless FT_ACCESS_TOKEN or --interactive is set".to_string(),
            ));
        }

        if i64::try_from(self.token_refresh_threshold)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .is_none()
        {
            return Err(SyncError::Config(format!(
                "TOKEN_REFRESH_THRESHOLD is out of range: {}",
                self.token_refresh_threshold
            )));
        }

        if !(1..=100).contains(&self.per_page) {
            return Err(SyncError::Config(format!(
                "FT_PER_PAGE must be between 1 and 100, got {}",
                self.per_page
            )));
        }

        if self.http_max_attempts == 0 {
            return Err(SyncError::Config(
                "HTTP_MAX_ATTEMPTS must be at least 1".to_string(),
            ));
        }

        if !self.readme_file.exists() {
            return Err(SyncError::Config(format!(
                "README file does not exist: {}",
                self.readme_file.display()
            )));
        }

        Ok(())
    }

    /// Whether both halves of the OAuth application credentials are present
    pub fn has_client_credentials(&self) -> bool {
        self.client_id.is_some() && self.client_secret.is_some()
    }

    /// Redirect URI registered for the authorization-code flow
    pub fn redirect_uri(&self) -> String {
        format!("http://localhost:{}/callback", self.callback_port)
    }
}

/// Expand tilde (~) in file paths to user's home directory
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Treat blank values the same as unset ones
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
