use anyhow::Context as _;
use poise::serenity_prelude as serenity;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_DATABASE_URL: &str = "sqlite://server_management.db?mode=rwc";
const DEFAULT_STAFF_CONFIG_PATH: &str = "config/staff_config.json";

/// Process-wide settings read from the environment (after `.env` is loaded).
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub cloud_backup_url: Option<String>,
    pub staff_config_path: PathBuf,
    pub vip_role_id: Option<serenity::RoleId>,
    pub backup_interval: Duration,
    pub backup_timeout: Duration,
    pub invite_sync_interval: Duration,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        // Runners tick on these, and a zero period is not a valid interval.
        let secs = |key: &str, default: u64| -> anyhow::Result<Duration> {
            let secs = match non_empty(key) {
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .with_context(|| format!("{key} must be a number of seconds"))?,
                None => default,
            };
            anyhow::ensure!(secs > 0, "{key} must be at least 1 second");
            Ok(Duration::from_secs(secs))
        };

        let vip_role_id = match non_empty("VIP_ROLE_ID") {
            Some(raw) => {
                let id: u64 = raw.trim().parse().context("VIP_ROLE_ID must be a role id")?;
                // `0` is how an unset role used to be spelled.
                (id != 0).then(|| serenity::RoleId::new(id))
            }
            None => None,
        };

        Ok(Self {
            database_url: non_empty("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.into()),
            cloud_backup_url: non_empty("CLOUD_BACKUP_URL")
                .map(|url| url.trim().trim_end_matches('/').to_string()),
            staff_config_path: non_empty("STAFF_CONFIG_PATH")
                .unwrap_or_else(|| DEFAULT_STAFF_CONFIG_PATH.into())
                .into(),
            vip_role_id,
            backup_interval: secs("BACKUP_INTERVAL_SECS", 1800)?,
            backup_timeout: secs("BACKUP_TIMEOUT_SECS", 30)?,
            invite_sync_interval: secs("INVITE_SYNC_INTERVAL_SECS", 3600)?,
        })
    }
}
