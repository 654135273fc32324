use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use tower_sessions::Session;

use crate::dashboard::{build_page, DashboardPage, DashboardQuery};
use crate::reconcile::{reconcile, ReconcileError};

use super::auth::require_login;
use super::AppState;

pub(super) async fn list_repositories(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<DashboardPage>, (StatusCode, String)> {
    let github_login = require_login(&session).await?;

    let email_collected = state
        .db
        .find_user(&github_login)
        .await
        .map_err(|error| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to load user: {error}"),
            )
        })?
        .is_some_and(|user| user.has_email());
    if !email_collected {
        return Err((
            StatusCode::PRECONDITION_REQUIRED,
            "A contact email is required before viewing the dashboard".to_string(),
        ));
    }

    let reconciliation = reconcile(state.fetcher.as_ref(), &state.db, &github_login)
        .await
        .map_err(|error| {
            tracing::error!(login = %github_login, error = %error, "reconciliation failed");
            match error {
                ReconcileError::EmptyOwner => {
                    (StatusCode::UNAUTHORIZED, "Authentication required".to_string())
                }
                ReconcileError::StoreRead { .. } => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to load your projects".to_string(),
                ),
                ReconcileError::StoreWrite { .. } => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to save new projects".to_string(),
                ),
            }
        })?;

    Ok(Json(build_page(&reconciliation, &query, Utc::now())))
}
