use serde::Serialize;

use crate::github::RemoteRepositorySummary;

pub const MAX_PROGRESS: u8 = 100;

/// Local annotation row for one remote repository, scoped to one owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectRecord {
    pub id: String,
    pub owner_username: String,
    pub name: String,
    pub progress: u8,
    pub reminder_enabled: bool,
}

impl ProjectRecord {
    /// A fresh record for a repository seen for the first time: no progress, no reminder.
    #[must_use]
    pub fn untracked(owner_username: &str, remote: &RemoteRepositorySummary) -> Self {
        Self {
            id: remote.id.to_string(),
            owner_username: owner_username.to_string(),
            name: remote.name.clone(),
            progress: 0,
            reminder_enabled: false,
        }
    }
}

/// Partial update for the two user-driven annotation fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectUpdate {
    pub progress: Option<u8>,
    pub reminder_enabled: Option<bool>,
}

impl ProjectUpdate {
    #[must_use]
    pub fn progress(value: i64) -> Self {
        Self {
            progress: Some(clamp_progress(value)),
            reminder_enabled: None,
        }
    }

    #[must_use]
    pub fn reminder(enabled: bool) -> Self {
        Self {
            progress: None,
            reminder_enabled: Some(enabled),
        }
    }
}

#[must_use]
pub fn clamp_progress(value: i64) -> u8 {
    u8::try_from(value.clamp(0, i64::from(MAX_PROGRESS))).unwrap_or(0)
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub github_login: String,
    pub github_user_id: Option<i64>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub github_login: String,
    pub github_user_id: Option<i64>,
    pub display_name: Option<String>,
    pub email: Option<String>,
}

impl UserRecord {
    #[must_use]
    pub fn has_email(&self) -> bool {
        self.email
            .as_deref()
            .is_some_and(|email| !email.trim().is_empty())
    }
}

/// An owner with a contact email and every project they asked to be reminded about.
#[derive(Debug, Clone)]
pub struct ReminderRecipient {
    pub github_login: String,
    pub email: String,
    pub projects: Vec<ProjectRecord>,
}
