// src/infra/paths.rs — Path management
//
// All paths respect the VIRAL_DAILY_HOME environment variable for isolation.
// When VIRAL_DAILY_HOME is set, config and the stored session live under that
// directory. When unset, they live under ~/.viral-daily/.

use std::path::PathBuf;

/// Storage key of the persisted session record.
pub const SESSION_STORAGE_KEY: &str = "viralDailyUser";

/// Returns the VIRAL_DAILY_HOME override, if set.
fn viral_daily_home() -> Option<PathBuf> {
    std::env::var_os("VIRAL_DAILY_HOME").map(PathBuf::from)
}

/// Configuration directory: $VIRAL_DAILY_HOME/ or ~/.viral-daily/
pub fn config_dir() -> PathBuf {
    if let Some(home) = viral_daily_home() {
        return home;
    }
    dirs_home().join(".viral-daily")
}

/// Home directory
pub fn dirs_home() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Config file path
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Persisted session record path
pub fn session_file_path() -> PathBuf {
    config_dir().join(format!("{SESSION_STORAGE_KEY}.json"))
}

/// Ensure all required directories exist
pub async fn ensure_dirs() -> anyhow::Result<()> {
    tokio::fs::create_dir_all(config_dir()).await?;
    Ok(())
}
