use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

const DEFAULT_CONFIG_PATH: &str = "/opt/job-not-finished/config.json";

const DEFAULT_DB_PATH: &str = "/opt/job-not-finished/data/jnf.db";
const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";
const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:3000";

const DEFAULT_GITHUB_API_BASE_URL: &str = "https://api.github.com";
const DEFAULT_GITHUB_OAUTH_BASE_URL: &str = "https://github.com";

const DEFAULT_RESEND_API_BASE_URL: &str = "https://api.resend.com";
const DEFAULT_MAIL_FROM_ADDRESS: &str = "Job Not Finished <noreply@job-not-finished.local>";

const DEFAULT_REMINDER_INTERVAL_HOURS: u64 = 7 * 24;
const MAX_REMINDER_INTERVAL_HOURS: u64 = 365 * 24;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub database_path: Option<String>,
    pub bind_address: Option<String>,
    pub public_base_url: Option<String>,
    pub github: GitHubConfig,
    pub mail: MailConfig,
    pub reminders: ReminderConfig,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub api_token: Option<String>,
    pub api_base_url: Option<String>,
    pub oauth_base_url: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub resend_api_key: Option<String>,
    pub api_base_url: Option<String>,
    pub from_address: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ReminderConfig {
    pub enabled: Option<bool>,
    pub interval_hours: Option<u64>,
    pub cron_secret: Option<String>,
}

impl DashboardConfig {
    /// Loads the config file named by `JNF_CONFIG_PATH`, falling back to defaults when absent.
    ///
    /// # Errors
    ///
    /// This function will return an error if the config file exists but cannot be read or parsed
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("JNF_CONFIG_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

        let path = Path::new(&config_path);
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {config_path}"))?;

        let config = serde_json::from_str::<Self>(&raw)
            .with_context(|| format!("Failed to parse config JSON: {config_path}"))?;

        Ok(config)
    }

    #[must_use]
    pub fn database_path(&self) -> String {
        self.database_path
            .as_deref()
            .unwrap_or(DEFAULT_DB_PATH)
            .trim()
            .to_string()
    }

    #[must_use]
    pub fn bind_address(&self) -> String {
        self.bind_address
            .as_deref()
            .unwrap_or(DEFAULT_BIND_ADDRESS)
            .trim()
            .to_string()
    }

    #[must_use]
    pub fn public_base_url(&self) -> String {
        non_empty_or_env(self.public_base_url.as_deref(), "JNF_PUBLIC_BASE_URL")
            .map(|value| value.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_PUBLIC_BASE_URL.to_string())
    }

    #[must_use]
    pub fn github_client_id(&self) -> Option<String> {
        non_empty_or_env(self.github.client_id.as_deref(), "JNF_GITHUB_CLIENT_ID")
    }

    #[must_use]
    pub fn github_client_secret(&self) -> Option<String> {
        non_empty_or_env(
            self.github.client_secret.as_deref(),
            "JNF_GITHUB_CLIENT_SECRET",
        )
    }

    #[must_use]
    pub fn github_api_token(&self) -> Option<String> {
        non_empty_or_env(self.github.api_token.as_deref(), "JNF_GITHUB_TOKEN")
    }

    #[must_use]
    pub fn github_api_base_url(&self) -> String {
        base_url_or_default(
            self.github.api_base_url.as_deref(),
            DEFAULT_GITHUB_API_BASE_URL,
        )
    }

    #[must_use]
    pub fn github_oauth_base_url(&self) -> String {
        base_url_or_default(
            self.github.oauth_base_url.as_deref(),
            DEFAULT_GITHUB_OAUTH_BASE_URL,
        )
    }

    #[must_use]
    pub fn resend_api_key(&self) -> Option<String> {
        non_empty_or_env(self.mail.resend_api_key.as_deref(), "JNF_RESEND_API_KEY")
    }

    #[must_use]
    pub fn resend_api_base_url(&self) -> String {
        base_url_or_default(
            self.mail.api_base_url.as_deref(),
            DEFAULT_RESEND_API_BASE_URL,
        )
    }

    #[must_use]
    pub fn mail_from_address(&self) -> String {
        self.mail
            .from_address
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_MAIL_FROM_ADDRESS)
            .to_string()
    }

    #[must_use]
    pub fn reminders_enabled(&self) -> bool {
        self.reminders.enabled.unwrap_or(false)
            || std::env::var("JNF_REMINDERS_ENABLED")
                .ok()
                .is_some_and(|value| {
                    value.trim().eq_ignore_ascii_case("true") || value.trim() == "1"
                })
    }

    #[must_use]
    pub fn reminder_interval(&self) -> Duration {
        let hours = self
            .reminders
            .interval_hours
            .filter(|hours| *hours > 0)
            .unwrap_or(DEFAULT_REMINDER_INTERVAL_HOURS)
            .min(MAX_REMINDER_INTERVAL_HOURS);
        Duration::from_secs(hours * 60 * 60)
    }

    #[must_use]
    pub fn cron_secret(&self) -> Option<String> {
        non_empty_or_env(self.reminders.cron_secret.as_deref(), "JNF_CRON_SECRET")
    }
}

fn non_empty_or_env(value: Option<&str>, env_key: &str) -> Option<String> {
    value
        .map(ToString::to_string)
        .or_else(|| std::env::var(env_key).ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn base_url_or_default(value: Option<&str>, default: &str) -> String {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(default)
        .trim_end_matches('/')
        .to_string()
}
