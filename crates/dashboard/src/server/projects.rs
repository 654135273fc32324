use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tower_sessions::Session;

use crate::db::ProjectUpdate;
use crate::store::ProjectStore;

use super::api_types::{ProgressRequest, ProjectResponse, ReminderToggleResponse};
use super::auth::require_login;
use super::AppState;

pub(super) async fn update_progress(
    State(state): State<AppState>,
    session: Session,
    Path(project_id): Path<String>,
    Json(payload): Json<ProgressRequest>,
) -> Result<Json<ProjectResponse>, (StatusCode, String)> {
    let github_login = require_login(&session).await?;

    let updated = ProjectStore::update_project(
        &state.db,
        &github_login,
        &project_id,
        ProjectUpdate::progress(payload.progress),
    )
    .await
    .map_err(|error| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to update progress: {error}"),
        )
    })?;
    if !updated {
        return Err((StatusCode::NOT_FOUND, "Project not found".to_string()));
    }

    let project = state
        .db
        .get_project(&github_login, &project_id)
        .await
        .map_err(|error| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to load project: {error}"),
            )
        })?
        .ok_or((StatusCode::NOT_FOUND, "Project not found".to_string()))?;

    Ok(Json(ProjectResponse {
        id: project.id,
        name: project.name,
        progress: project.progress,
        reminder_enabled: project.reminder_enabled,
    }))
}

pub(super) async fn toggle_reminder(
    State(state): State<AppState>,
    session: Session,
    Path(project_id): Path<String>,
) -> Result<Json<ReminderToggleResponse>, (StatusCode, String)> {
    let github_login = require_login(&session).await?;

    let reminder_enabled = state
        .db
        .toggle_project_reminder(&github_login, &project_id)
        .await
        .map_err(|error| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to toggle reminder: {error}"),
            )
        })?
        .ok_or((StatusCode::NOT_FOUND, "Project not found".to_string()))?;

    Ok(Json(ReminderToggleResponse {
        id: project_id,
        reminder_enabled,
    }))
}
