// src/main.rs — Viral Daily entry point

use clap::Parser;
use std::sync::Arc;

use viral_daily::app::App;
use viral_daily::backend::{Backend, HttpBackend, RetryBackend, RetryConfig};
use viral_daily::cli::{self, Cli, Commands};
use viral_daily::infra::config::Config;
use viral_daily::infra::{logger, paths};
use viral_daily::session::{FileSessionStore, SessionStore};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging (respects RUST_LOG)
    logger::init_logging(if cli.verbose { "debug" } else { "warn" });

    if let Err(e) = run(cli).await {
        tracing::error!("{e:#}");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Load config (falls back to defaults if no config.toml)
    let config = if let Some(ref path) = cli.config {
        Config::load_from(std::path::Path::new(path))?.with_env_overrides()
    } else {
        Config::load()?
    };
    paths::ensure_dirs().await?;

    let app = build_app(&config)?;

    match cli.command.unwrap_or_default() {
        Commands::Feed { platform, watch } => cli::feed::run_feed(&app, platform, watch).await,
        Commands::Plans { cycle } => cli::feed::run_plans(&app, cycle).await,
        Commands::Signup { email } => cli::account::run_signup(&app, &email).await,
        Commands::Whoami => cli::account::run_whoami(&app).await,
        Commands::Upgrade {
            tier,
            cycle,
            method,
            email,
        } => cli::upgrade::run_upgrade(&app, tier, cycle, method, email).await,
        Commands::Logout => cli::account::run_logout(&app),
        Commands::Dashboard => cli::account::run_dashboard(&app).await,
        Commands::Notify {
            email,
            telegram,
            whatsapp,
        } => cli::account::run_notify(&app, email, telegram, whatsapp).await,
    }
}

fn build_app(config: &Config) -> anyhow::Result<App> {
    let http: Arc<dyn Backend> = Arc::new(HttpBackend::new(&config.backend)?);
    let backend: Arc<dyn Backend> = Arc::new(RetryBackend::with_config(
        http,
        RetryConfig::from(&config.retry),
    ));
    let store: Arc<dyn SessionStore> = Arc::new(FileSessionStore::default_location());
    tracing::debug!(
        backend = %config.backend.base_url,
        session = %paths::session_file_path().display(),
        "client ready"
    );
    Ok(App::new(backend, store, config.feed.clone()))
}
