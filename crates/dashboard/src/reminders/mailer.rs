use std::fmt;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::DashboardConfig;

const REQUEST_TIMEOUT_SECONDS: u64 = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail delivery is not configured")]
    NotConfigured,

    #[error("mail provider unreachable: {0}")]
    Transport(String),

    #[error("mail provider rejected the message ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("invalid response from mail provider: {0}")]
    Decode(String),
}

/// Delivers one rendered email and returns the provider's message id.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<String, MailError>;
}

#[derive(Debug, Deserialize)]
struct ResendSendResponse {
    id: String,
}

/// Resend HTTP API client.
#[derive(Clone)]
pub struct ResendMailer {
    http: reqwest::Client,
    api_base_url: String,
    api_key: Option<String>,
}

impl fmt::Debug for ResendMailer {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ResendMailer")
            .field("api_base_url", &self.api_base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .finish_non_exhaustive()
    }
}

impl ResendMailer {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(api_base_url: &str, api_key: Option<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .build()
            .context("failed to build Resend HTTP client")?;

        Ok(Self {
            http,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &DashboardConfig) -> anyhow::Result<Self> {
        let mailer = Self::new(&config.resend_api_base_url(), config.resend_api_key())?;
        if mailer.api_key.is_none() {
            tracing::warn!("no Resend API key configured; reminder emails will fail");
        }
        Ok(mailer)
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<String, MailError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(MailError::NotConfigured);
        };

        let body =
            serde_json::to_vec(email).map_err(|error| MailError::Decode(error.to_string()))?;

        let response = self
            .http
            .post(format!("{}/emails", self.api_base_url))
            .header(AUTHORIZATION, format!("Bearer {api_key}"))
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|error| MailError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let sent = response
            .json::<ResendSendResponse>()
            .await
            .map_err(|error| MailError::Decode(error.to_string()))?;

        Ok(sent.id)
    }
}
