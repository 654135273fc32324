use serde::{Deserialize, Serialize};

use crate::reminders::ReminderRunSummary;

#[derive(Debug, Serialize)]
pub(super) struct SessionResponse {
    pub(super) authenticated: bool,
    pub(super) github_login: Option<String>,
    pub(super) email_collected: bool,
}

#[derive(Debug, Deserialize)]
pub(super) struct EmailRequest {
    pub(super) email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ProgressRequest {
    pub(super) progress: i64,
}

#[derive(Debug, Serialize)]
pub(super) struct ProjectResponse {
    pub(super) id: String,
    pub(super) name: String,
    pub(super) progress: u8,
    pub(super) reminder_enabled: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct ReminderToggleResponse {
    pub(super) id: String,
    pub(super) reminder_enabled: bool,
}

#[derive(Debug, Deserialize)]
pub(super) struct GitHubCallbackQuery {
    pub(super) code: String,
    pub(super) state: String,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct CronQuery {
    pub(super) secret: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct ReminderRunResponse {
    pub(super) success: bool,
    pub(super) data: ReminderRunSummary,
}

#[derive(Debug, Serialize)]
pub(super) struct ErrorResponse {
    pub(super) error: String,
}
