use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use tower_sessions::Session;

use super::api_types::SessionResponse;
use super::AppState;

pub(super) const SESSION_LOGIN_KEY: &str = "github_login";

pub(super) async fn auth_session(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<SessionResponse>, StatusCode> {
    let Some(github_login) = session_login(&session).await? else {
        return Ok(Json(SessionResponse {
            authenticated: false,
            github_login: None,
            email_collected: false,
        }));
    };

    let email_collected = state
        .db
        .find_user(&github_login)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .is_some_and(|user| user.has_email());

    Ok(Json(SessionResponse {
        authenticated: true,
        github_login: Some(github_login),
        email_collected,
    }))
}

pub(super) async fn auth_logout(session: Session) -> Result<StatusCode, StatusCode> {
    session
        .flush()
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(StatusCode::NO_CONTENT)
}

async fn session_login(session: &Session) -> Result<Option<String>, StatusCode> {
    session
        .get::<String>(SESSION_LOGIN_KEY)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

pub(super) async fn current_login(session: &Session) -> Result<String, StatusCode> {
    session_login(session)
        .await?
        .filter(|login| !login.trim().is_empty())
        .ok_or(StatusCode::UNAUTHORIZED)
}

pub(super) async fn require_login(session: &Session) -> Result<String, (StatusCode, String)> {
    current_login(session).await.map_err(|status| {
        let message = if status == StatusCode::UNAUTHORIZED {
            "Authentication required"
        } else {
            "Session unavailable"
        };
        (status, message.to_string())
    })
}
