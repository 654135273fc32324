use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use regex::Regex;
use tower_sessions::Session;

use super::api_types::EmailRequest;
use super::auth::require_login;
use super::AppState;

const MAX_EMAIL_LENGTH: usize = 254;

pub(super) async fn set_email(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<EmailRequest>,
) -> Result<StatusCode, (StatusCode, String)> {
    let github_login = require_login(&session).await?;

    let email = payload
        .email
        .as_deref()
        .map(str::trim)
        .filter(|email| !email.is_empty())
        .ok_or((StatusCode::BAD_REQUEST, "Email is required".to_string()))?;

    validate_email(email).map_err(|message| (StatusCode::BAD_REQUEST, message))?;

    let updated = state
        .db
        .set_user_email(&github_login, email)
        .await
        .map_err(|error| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to save email: {error}"),
            )
        })?;

    if !updated {
        return Err((StatusCode::UNAUTHORIZED, "Unknown user".to_string()));
    }

    tracing::info!(login = %github_login, "contact email collected");
    Ok(StatusCode::OK)
}

fn validate_email(email: &str) -> Result<(), String> {
    let regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$")
        .map_err(|error| format!("invalid email validator: {error}"))?;

    if email.len() > MAX_EMAIL_LENGTH || !regex.is_match(email) {
        return Err("Email address is not valid".to_string());
    }

    Ok(())
}
