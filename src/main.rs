use intra_progress::config::Config;
use intra_progress::error::SyncError;
use intra_progress::sync;

#[tokio::main]
async fn main() {
    // Load configuration first (for log level)
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => fail(e),
    };

    // Initialize logging with a configured level
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_level.to_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("🚀 intra-progress starting...");
    tracing::debug!("README: {}", config.readme_file.display());
    tracing::debug!("Credential store: {}", config.token_file.display());

    // Abort before any network call on bad configuration
    if let Err(e) = config.validate() {
        fail(e);
    }

    match sync::run(&config).await {
        Ok(outcome) => {
            if config.dry_run {
                print!("{}", outcome.document);
            }
            tracing::info!(
                "✅ Done: {} records, level {} / {} ({}%), sections updated: [{}], skipped: [{}]",
                outcome.records,
                outcome.progress.done,
                outcome.progress.total,
                outcome.progress.percentage(),
                outcome.sections.updated.join(", "),
                outcome.sections.skipped.join(", ")
            );
        }
        Err(e) => {
            if let SyncError::Auth(_) = e {
                tracing::error!("🔧 Troubleshooting steps:");
                tracing::error!("   1. Check FT_CLIENT_ID / FT_CLIENT_SECRET");
                tracing::error!("   2. Delete the stored token and run again with --interactive");
            }
            fail(e);
        }
    }
}

/// Log a fatal error and exit with its status code
fn fail(e: SyncError) -> ! {
    tracing::error!("❌ {}", e);
    eprintln!("error: {}", e);
    std::process::exit(e.exit_code());
}
