//! Weekly reminder emails.
//!
//! For every user with an email address and at least one reminder-enabled
//! project, look up each project's recent activity on GitHub, turn it into a
//! roast and send one email. A failure for one project or one email never
//! stops the batch.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::dashboard::days_since;
use crate::db::{DbClient, ProjectRecord, ReminderRecipient};
use crate::github::RepositoryFetcher;
use crate::roast::{email_roast, unavailable_roast};

mod email;
mod mailer;
mod scheduler;

pub use email::{escape_html, format_date, render_reminder_email, ProjectRoast, SUBJECT};
pub use mailer::{MailError, Mailer, OutgoingEmail, ResendMailer};
pub use scheduler::ReminderScheduler;

const GITHUB_HOST: &str = "github.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRef {
    pub owner: String,
    pub name: String,
}

/// Works out which GitHub repository a stored project points at. The cached
/// name may be a full GitHub URL or `owner/name`; anything else is taken as a
/// bare repository name owned by `owner_login`.
#[must_use]
pub fn resolve_repository(cached_name: &str, owner_login: &str) -> RepositoryRef {
    let trimmed = cached_name.trim();

    if let Some(position) = trimmed.find(GITHUB_HOST) {
        let mut parts = trimmed[position + GITHUB_HOST.len()..]
            .split(['/', '?', '#'])
            .filter(|part| !part.is_empty());
        if let (Some(owner), Some(name)) = (parts.next(), parts.next()) {
            return RepositoryRef {
                owner: owner.to_string(),
                name: name.trim_end_matches(".git").to_string(),
            };
        }
    } else if let Some((owner, rest)) = trimmed.split_once('/') {
        let name = rest.split('/').next().unwrap_or_default();
        if !owner.is_empty() && !name.is_empty() {
            return RepositoryRef {
                owner: owner.to_string(),
                name: name.to_string(),
            };
        }
    }

    RepositoryRef {
        owner: owner_login.to_string(),
        name: trimmed.to_string(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Delivery {
    pub github_login: String,
    pub email: String,
    pub success: bool,
    pub message_id: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReminderRunSummary {
    pub total_emails: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub deliveries: Vec<Delivery>,
}

#[derive(Clone)]
pub struct ReminderRunner {
    db: DbClient,
    fetcher: Arc<dyn RepositoryFetcher>,
    mailer: Arc<dyn Mailer>,
    from_address: String,
    site_url: String,
}

impl std::fmt::Debug for ReminderRunner {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ReminderRunner")
            .field("from_address", &self.from_address)
            .field("site_url", &self.site_url)
            .finish_non_exhaustive()
    }
}

impl ReminderRunner {
    #[must_use]
    pub fn new(
        db: DbClient,
        fetcher: Arc<dyn RepositoryFetcher>,
        mailer: Arc<dyn Mailer>,
        from_address: String,
        site_url: String,
    ) -> Self {
        Self {
            db,
            fetcher,
            mailer,
            from_address,
            site_url,
        }
    }

    /// Sends one email per recipient.
    ///
    /// # Errors
    /// Returns an error only when the recipient list cannot be loaded.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<ReminderRunSummary> {
        let recipients = self
            .db
            .list_reminder_recipients()
            .await
            .context("failed to load reminder recipients")?;

        tracing::info!(recipients = recipients.len(), "reminder run started");
        if recipients.is_empty() {
            return Ok(ReminderRunSummary::default());
        }

        let mut summary = ReminderRunSummary::default();
        for recipient in recipients {
            let delivery = self.deliver(&recipient, now).await;
            if delivery.success {
                summary.success_count += 1;
            } else {
                summary.failure_count += 1;
            }
            summary.deliveries.push(delivery);
        }
        summary.total_emails = summary.deliveries.len();

        tracing::info!(
            sent = summary.success_count,
            failed = summary.failure_count,
            "reminder run finished"
        );

        Ok(summary)
    }

    async fn deliver(&self, recipient: &ReminderRecipient, now: DateTime<Utc>) -> Delivery {
        let mut roasts = Vec::with_capacity(recipient.projects.len());
        for project in &recipient.projects {
            roasts.push(self.roast_project(project, &recipient.github_login, now).await);
        }

        let email = OutgoingEmail {
            from: self.from_address.clone(),
            to: vec![recipient.email.clone()],
            subject: SUBJECT.to_string(),
            html: render_reminder_email(&recipient.github_login, &roasts, now, &self.site_url),
        };

        match self.mailer.send(&email).await {
            Ok(message_id) => {
                tracing::info!(login = %recipient.github_login, message_id = %message_id, "reminder email sent");
                Delivery {
                    github_login: recipient.github_login.clone(),
                    email: recipient.email.clone(),
                    success: true,
                    message_id: Some(message_id),
                    error: None,
                }
            }
            Err(error) => {
                tracing::warn!(login = %recipient.github_login, error = %error, "reminder email failed");
                Delivery {
                    github_login: recipient.github_login.clone(),
                    email: recipient.email.clone(),
                    success: false,
                    message_id: None,
                    error: Some(error.to_string()),
                }
            }
        }
    }

    async fn roast_project(
        &self,
        project: &ProjectRecord,
        owner_login: &str,
        now: DateTime<Utc>,
    ) -> ProjectRoast {
        let repository = resolve_repository(&project.name, owner_login);

        match self
            .fetcher
            .fetch_activity(&repository.owner, &repository.name)
            .await
        {
            Ok(activity) => {
                let days = activity
                    .pushed_at
                    .map_or(0, |pushed_at| days_since(pushed_at, now));

                ProjectRoast {
                    roast: email_roast(
                        &repository.name,
                        days,
                        activity.size_kb,
                        activity.open_issues,
                    ),
                    name: repository.name,
                    url: Some(activity.url),
                    days_since_activity: Some(days),
                    stars: Some(activity.stars),
                    unavailable: false,
                }
            }
            Err(error) => {
                tracing::warn!(
                    owner = %repository.owner,
                    repo = %repository.name,
                    error = %error,
                    "could not analyse repository for reminder"
                );

                ProjectRoast {
                    roast: unavailable_roast(&repository.name),
                    name: repository.name,
                    url: None,
                    days_since_activity: None,
                    stars: None,
                    unavailable: true,
                }
            }
        }
    }
}
