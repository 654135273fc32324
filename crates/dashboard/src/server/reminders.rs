use axum::extract::{Query, State};
use axum::http::header::{AUTHORIZATION, CACHE_CONTROL};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;

use super::api_types::{CronQuery, ErrorResponse, ReminderRunResponse};
use super::oauth::subtle_compare;
use super::AppState;

const NO_STORE: &str = "no-store, no-cache, must-revalidate, proxy-revalidate";

pub(super) async fn send_reminder_emails(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CronQuery>,
) -> Response {
    if !is_authorized(state.cron_secret.as_deref(), &headers, &query) {
        tracing::warn!("unauthorized reminder trigger");
        return no_store(
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "Unauthorized access".to_string(),
            }),
        );
    }

    match state.reminders.run(Utc::now()).await {
        Ok(summary) => no_store(
            StatusCode::OK,
            Json(ReminderRunResponse {
                success: true,
                data: summary,
            }),
        ),
        Err(error) => {
            tracing::error!(error = %format!("{error:#}"), "reminder run failed");
            no_store(
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("{error:#}"),
                }),
            )
        }
    }
}

fn no_store(status: StatusCode, body: impl IntoResponse) -> Response {
    (status, [(CACHE_CONTROL, NO_STORE)], body).into_response()
}

/// Accepts `Authorization: Bearer <secret>` or `?secret=<secret>`. Query
/// decoding turns `+` into a space, so spaces are read back as `+`.
fn is_authorized(expected: Option<&str>, headers: &HeaderMap, query: &CronQuery) -> bool {
    let Some(expected) = expected.filter(|secret| !secret.is_empty()) else {
        return false;
    };

    let bearer_matches = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|token| subtle_compare(token.as_bytes(), expected.as_bytes()));

    let query_matches = query
        .secret
        .as_deref()
        .map(|secret| secret.replace(' ', "+"))
        .is_some_and(|secret| subtle_compare(secret.as_bytes(), expected.as_bytes()));

    bearer_matches || query_matches
}
