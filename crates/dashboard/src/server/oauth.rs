use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::Context;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Redirect;
use hmac::Mac;
use serde::Deserialize;
use tower_sessions::Session;
use uuid::Uuid;

use crate::config::DashboardConfig;
use crate::db::NewUser;

use super::api_types::GitHubCallbackQuery;
use super::auth::SESSION_LOGIN_KEY;
use super::AppState;

const OAUTH_STATE_TTL_SECONDS: u64 = 15 * 60;
const OAUTH_NONCE_KEY: &str = "oauth_nonce";
const OAUTH_SCOPE: &str = "read:user";
const USER_AGENT: &str = "job-not-finished";
const REQUEST_TIMEOUT_SECONDS: u64 = 20;

const DASHBOARD_PATH: &str = "/dashboard";
const COLLECT_EMAIL_PATH: &str = "/collect-email";

/// GitHub sign-in: authorize redirect, signed `state`, code exchange.
#[derive(Clone)]
pub struct OAuthService {
    client_id: Option<String>,
    client_secret: Option<String>,
    oauth_base_url: String,
    api_base_url: String,
    public_base_url: String,
    http: reqwest::Client,
}

impl fmt::Debug for OAuthService {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("OAuthService")
            .field("client_id", &self.client_id.as_ref().map(|_| "***"))
            .field("client_secret", &self.client_secret.as_ref().map(|_| "***"))
            .field("oauth_base_url", &self.oauth_base_url)
            .field("api_base_url", &self.api_base_url)
            .field("public_base_url", &self.public_base_url)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct OAuthTokenResponse {
    access_token: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubUserResponse {
    id: i64,
    login: String,
    name: Option<String>,
}

impl OAuthService {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        client_id: Option<String>,
        client_secret: Option<String>,
        oauth_base_url: &str,
        api_base_url: &str,
        public_base_url: &str,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .build()
            .context("failed to build GitHub OAuth HTTP client")?;

        Ok(Self {
            client_id,
            client_secret,
            oauth_base_url: oauth_base_url.trim_end_matches('/').to_string(),
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &DashboardConfig) -> anyhow::Result<Self> {
        Self::new(
            config.github_client_id(),
            config.github_client_secret(),
            &config.github_oauth_base_url(),
            &config.github_api_base_url(),
            &config.public_base_url(),
        )
    }

    pub(super) fn is_configured(&self) -> bool {
        self.client_id.is_some() && self.client_secret.is_some()
    }

    fn callback_url(&self) -> String {
        format!("{}/api/auth/github/callback", self.public_base_url)
    }

    fn authorize_url(&self, state_token: &str) -> String {
        format!(
            "{}/login/oauth/authorize?client_id={}&redirect_uri={}&scope={}&state={}",
            self.oauth_base_url,
            urlencoding::encode(self.client_id.as_deref().unwrap_or_default()),
            urlencoding::encode(&self.callback_url()),
            urlencoding::encode(OAUTH_SCOPE),
            urlencoding::encode(state_token),
        )
    }

    fn signer(&self) -> Result<hmac::Hmac<sha2::Sha256>, (StatusCode, String)> {
        let secret = self.client_secret.as_deref().ok_or((
            StatusCode::INTERNAL_SERVER_ERROR,
            "GitHub OAuth secret is not configured".to_string(),
        ))?;

        <hmac::Hmac<sha2::Sha256> as Mac>::new_from_slice(secret.as_bytes()).map_err(|error| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("unable to initialize oauth signer: {error}"),
            )
        })
    }

    pub(super) fn build_state(
        &self,
        nonce: &str,
        issued_at: u64,
    ) -> Result<String, (StatusCode, String)> {
        let payload = format!("{nonce}:{issued_at}");
        let mut mac = self.signer()?;
        mac.update(payload.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        Ok(format!("{payload}.{signature}"))
    }

    /// Checks signature and age; returns the nonce the state was issued for.
    pub(super) fn verify_state(
        &self,
        state: &str,
        now: u64,
    ) -> Result<String, (StatusCode, String)> {
        let invalid = || (StatusCode::UNAUTHORIZED, "Invalid OAuth state".to_string());

        let (payload, provided_signature) = state.rsplit_once('.').ok_or_else(invalid)?;

        let mut mac = self.signer()?;
        mac.update(payload.as_bytes());
        let expected_signature = hex::encode(mac.finalize().into_bytes());
        if !subtle_compare(expected_signature.as_bytes(), provided_signature.as_bytes()) {
            return Err(invalid());
        }

        let (nonce, issued_at_raw) = payload.split_once(':').ok_or_else(invalid)?;
        if nonce.is_empty() || issued_at_raw.contains(':') {
            return Err(invalid());
        }

        let issued_at = issued_at_raw.parse::<u64>().map_err(|_| invalid())?;
        if now.saturating_sub(issued_at) > OAUTH_STATE_TTL_SECONDS {
            return Err((StatusCode::UNAUTHORIZED, "OAuth state expired".to_string()));
        }

        Ok(nonce.to_string())
    }

    async fn exchange_code(&self, code: &str, state: &str) -> Result<String, (StatusCode, String)> {
        let token_payload = serde_json::json!({
            "client_id": self.client_id.clone().unwrap_or_default(),
            "client_secret": self.client_secret.clone().unwrap_or_default(),
            "code": code,
            "redirect_uri": self.callback_url(),
            "state": state,
        });

        let token_response = self
            .http
            .post(format!("{}/login/oauth/access_token", self.oauth_base_url))
            .header("Accept", "application/json")
            .json(&token_payload)
            .send()
            .await
            .map_err(|error| {
                (
                    StatusCode::BAD_GATEWAY,
                    format!("GitHub OAuth exchange failed: {error}"),
                )
            })?
            .json::<OAuthTokenResponse>()
            .await
            .map_err(|error| {
                (
                    StatusCode::BAD_GATEWAY,
                    format!("Invalid token response: {error}"),
                )
            })?;

        token_response.access_token.ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                format!(
                    "GitHub sign-in was rejected: {}",
                    token_response.error.as_deref().unwrap_or("no access token")
                ),
            )
        })
    }

    async fn fetch_user(&self, access_token: &str) -> Result<GitHubUserResponse, (StatusCode, String)> {
        self.http
            .get(format!("{}/user", self.api_base_url))
            .header("Authorization", format!("Bearer {access_token}"))
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .map_err(|error| {
                (
                    StatusCode::BAD_GATEWAY,
                    format!("GitHub user lookup failed: {error}"),
                )
            })?
            .error_for_status()
            .map_err(|error| {
                (
                    StatusCode::BAD_GATEWAY,
                    format!("GitHub user lookup failed: {error}"),
                )
            })?
            .json::<GitHubUserResponse>()
            .await
            .map_err(|error| {
                (
                    StatusCode::BAD_GATEWAY,
                    format!("Invalid user response: {error}"),
                )
            })
    }
}

pub(super) async fn github_start(
    State(state): State<AppState>,
    session: Session,
) -> Result<Redirect, (StatusCode, String)> {
    if !state.oauth.is_configured() {
        return Err((
            StatusCode::FAILED_DEPENDENCY,
            "GitHub sign-in is not configured".to_string(),
        ));
    }

    let nonce = Uuid::new_v4().simple().to_string();
    session
        .insert(OAUTH_NONCE_KEY, nonce.clone())
        .await
        .map_err(|_| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Session unavailable".to_string(),
            )
        })?;

    let state_token = state.oauth.build_state(&nonce, unix_now()?)?;
    Ok(Redirect::to(&state.oauth.authorize_url(&state_token)))
}

pub(super) async fn github_callback(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<GitHubCallbackQuery>,
) -> Result<Redirect, (StatusCode, String)> {
    let nonce = state.oauth.verify_state(&query.state, unix_now()?)?;

    let expected_nonce = session
        .remove::<String>(OAUTH_NONCE_KEY)
        .await
        .map_err(|_| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Session unavailable".to_string(),
            )
        })?
        .ok_or((
            StatusCode::UNAUTHORIZED,
            "OAuth session expired".to_string(),
        ))?;
    if !subtle_compare(expected_nonce.as_bytes(), nonce.as_bytes()) {
        return Err((StatusCode::UNAUTHORIZED, "Invalid OAuth state".to_string()));
    }

    let access_token = state.oauth.exchange_code(&query.code, &query.state).await?;
    let github_user = state.oauth.fetch_user(&access_token).await?;

    state
        .db
        .upsert_user(&NewUser {
            github_login: github_user.login.clone(),
            github_user_id: Some(github_user.id),
            display_name: github_user.name,
        })
        .await
        .map_err(|error| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to save user: {error}"),
            )
        })?;

    session.cycle_id().await.map_err(|_| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Session unavailable".to_string(),
        )
    })?;
    session
        .insert(SESSION_LOGIN_KEY, github_user.login.clone())
        .await
        .map_err(|_| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Session unavailable".to_string(),
            )
        })?;

    let email_collected = state
        .db
        .find_user(&github_user.login)
        .await
        .map_err(|error| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to load user: {error}"),
            )
        })?
        .is_some_and(|user| user.has_email());

    tracing::info!(login = %github_user.login, email_collected, "GitHub sign-in completed");

    if email_collected {
        Ok(Redirect::to(DASHBOARD_PATH))
    } else {
        Ok(Redirect::to(COLLECT_EMAIL_PATH))
    }
}

fn unix_now() -> Result<u64, (StatusCode, String)> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .map_err(|error| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("system clock error: {error}"),
            )
        })
}

pub(super) fn subtle_compare(left: &[u8], right: &[u8]) -> bool {
    if left.len() != right.len() {
        return false;
    }
    let mut mismatch = 0_u8;
    for (left_value, right_value) in left.iter().zip(right.iter()) {
        mismatch |= left_value ^ right_value;
    }
    mismatch == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(client_secret: Option<&str>) -> OAuthService {
        OAuthService::new(
            Some("client-123".to_string()),
            client_secret.map(ToString::to_string),
            "https://github.com/",
            "https://api.github.com",
            "https://jnf.example.com",
        )
        .expect("oauth service")
    }

    #[test]
    fn subtle_compare_requires_equal_inputs() {
        assert!(subtle_compare(b"abc", b"abc"));
        assert!(!subtle_compare(b"abc", b"abd"));
        assert!(!subtle_compare(b"abc", b"ab"));
    }

    #[test]
    fn state_round_trips_within_ttl() {
        let oauth = service(Some("shh"));
        let token = oauth.build_state("nonce-1", 1_000).expect("state");

        assert_eq!(
            oauth.verify_state(&token, 1_000 + 60).expect("valid"),
            "nonce-1"
        );
    }

    #[test]
    fn expired_or_tampered_state_is_rejected() {
        let oauth = service(Some("shh"));
        let token = oauth.build_state("nonce-1", 1_000).expect("state");

        let expired = oauth
            .verify_state(&token, 1_000 + OAUTH_STATE_TTL_SECONDS + 1)
            .expect_err("expired");
        assert_eq!(expired.1, "OAuth state expired");

        let tampered = token.replacen("nonce-1", "nonce-2", 1);
        assert_eq!(
            oauth.verify_state(&tampered, 1_000).expect_err("tampered").0,
            StatusCode::UNAUTHORIZED
        );

        let other_secret = service(Some("different"));
        assert!(other_secret.verify_state(&token, 1_000).is_err());
        assert!(oauth.verify_state("no-signature", 1_000).is_err());
    }

    #[test]
    fn authorize_url_carries_client_callback_and_state() {
        let oauth = service(Some("shh"));
        let url = oauth.authorize_url("abc:1.sig");

        assert!(url.starts_with("https://github.com/login/oauth/authorize?client_id=client-123"));
        assert!(url.contains(
            "redirect_uri=https%3A%2F%2Fjnf.example.com%2Fapi%2Fauth%2Fgithub%2Fcallback"
        ));
        assert!(url.contains("state=abc%3A1.sig"));
    }

    #[test]
    fn configuration_requires_client_id_and_secret() {
        assert!(service(Some("shh")).is_configured());
        assert!(!service(None).is_configured());

        let rendered = format!("{:?}", service(Some("shh")));
        assert!(!rendered.contains("shh"));
        assert!(!rendered.contains("client-123"));
    }

    #[test]
    fn from_config_builds_client_and_uses_public_base_url() {
        let config = DashboardConfig {
            public_base_url: Some("https://jnf.example.com/".to_string()),
            ..DashboardConfig::default()
        };

        let oauth = OAuthService::from_config(&config).expect("oauth service");
        assert_eq!(
            oauth.callback_url(),
            "https://jnf.example.com/api/auth/github/callback"
        );
    }
}
