// End-to-end flow: token -> fetch -> classify -> render -> rewrite

use std::sync::Arc;

use crate::auth::TokenManager;
use crate::classifier::{classify, Progress};
use crate::config::Config;
use crate::error::{Result, SyncError};
use crate::fetcher::Fetcher;
use crate::http_client::IntraHttpClient;
use crate::readme::{Document, SectionReport};
use crate::render::render_sections;

/// What a run did
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub records: usize,
    pub progress: Progress,
    pub sections: SectionReport,
    pub written: bool,
    /// Updated document, kept for dry runs
    pub document: String,
}

/// Run one sync against the configured API and README
pub async fn run(config: &Config) -> Result<SyncOutcome> {
    let http = Arc::new(IntraHttpClient::new(
        &config.api_base,
        config.http_request_timeout,
        config.http_max_attempts,
    )?);

    tracing::info!("Initializing authentication...");
    let token_manager = TokenManager::new(config, http.clone());
    let token = token_manager.get_access_token().await?;

    let fetcher = Fetcher::new(http, config.login.clone(), config.per_page);
    let records = fetcher.list_records(&token).await?;
    if records.is_empty() {
        return Err(SyncError::EmptyResult);
    }

    let buckets = classify(&records, &config.rules);
    let progress = buckets.progress();
    let sections = render_sections(&buckets);

    let mut document = Document::load(&config.readme_file)?;
    let report = document.apply(&sections);
    if report.updated.is_empty() {
        tracing::warn!(
            "No marker pairs found in {}; nothing to update",
            config.readme_file.display()
        );
    }

    let written = if config.dry_run {
        tracing::info!("Dry run: {} not written", config.readme_file.display());
        false
    } else {
        document.save()?
    };

    Ok(SyncOutcome {
        records: records.len(),
        progress,
        sections: report,
        written,
        document: document.content().to_string(),
    })
}
