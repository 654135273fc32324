use std::fmt;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;
use tower_sessions::cookie::SameSite;
use tower_sessions::SessionManagerLayer;
use tower_sessions_sqlx_store::SqliteStore;

use crate::config::DashboardConfig;
use crate::db::DbClient;
use crate::github::{GitHubClient, RepositoryFetcher};
use crate::reminders::{Mailer, ReminderRunner, ReminderScheduler, ResendMailer};
use crate::request_logging::log_request;

mod api_types;
mod auth;
mod oauth;
mod projects;
mod reminders;
mod repositories;
mod users;

pub use oauth::OAuthService;

#[derive(Clone)]
pub struct AppState {
    pub db: DbClient,
    pub fetcher: Arc<dyn RepositoryFetcher>,
    pub reminders: Arc<ReminderRunner>,
    pub oauth: Arc<OAuthService>,
    pub cron_secret: Option<String>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AppState")
            .field("db", &self.db)
            .field("reminders", &self.reminders)
            .field("oauth", &self.oauth)
            .field("cron_secret", &self.cron_secret.as_ref().map(|_| "***"))
            .finish_non_exhaustive()
    }
}

/// Collaborators shared by the HTTP server and the one-shot reminder command.
pub struct Services {
    pub db: DbClient,
    pub fetcher: Arc<dyn RepositoryFetcher>,
    pub runner: Arc<ReminderRunner>,
}

impl Services {
    /// # Errors
    /// Returns an error if the database or an HTTP client cannot be set up.
    pub async fn from_config(config: &DashboardConfig) -> Result<Self> {
        let db = DbClient::initialize(&config.database_path()).await?;
        let fetcher: Arc<dyn RepositoryFetcher> = Arc::new(GitHubClient::new(
            &config.github_api_base_url(),
            config.github_api_token(),
        )?);
        let mailer: Arc<dyn Mailer> = Arc::new(ResendMailer::from_config(config)?);
        let runner = Arc::new(ReminderRunner::new(
            db.clone(),
            fetcher.clone(),
            mailer,
            config.mail_from_address(),
            config.public_base_url(),
        ));

        Ok(Self {
            db,
            fetcher,
            runner,
        })
    }
}

pub(crate) fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/github/start", get(oauth::github_start))
        .route("/api/auth/github/callback", get(oauth::github_callback))
        .route("/api/auth/logout", post(auth::auth_logout))
        .route("/api/auth/session", get(auth::auth_session))
        .route("/api/user/email", post(users::set_email))
        .route("/api/repositories", get(repositories::list_repositories))
        .route("/api/projects/:id/progress", put(projects::update_progress))
        .route(
            "/api/projects/:id/reminder/toggle",
            post(projects::toggle_reminder),
        )
        .route(
            "/api/reminder/send-email",
            get(reminders::send_reminder_emails).post(reminders::send_reminder_emails),
        )
        .route_layer(middleware::from_fn(log_request))
}

/// # Errors
/// Returns an error if the session table cannot be migrated.
pub async fn build_app(state: AppState, secure_cookies: bool) -> Result<Router> {
    let session_store = SqliteStore::new(state.db.pool());
    session_store
        .migrate()
        .await
        .context("failed to migrate session store")?;

    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(secure_cookies)
        .with_same_site(SameSite::Lax);

    Ok(api_routes().layer(session_layer).with_state(state))
}

/// # Errors
/// Returns an error if startup fails or the listener stops with an error.
pub async fn run(config: &DashboardConfig) -> Result<()> {
    let services = Services::from_config(config).await?;

    if config.reminders_enabled() {
        ReminderScheduler::new(services.runner.clone(), config.reminder_interval()).spawn();
    } else {
        tracing::info!("reminder scheduler disabled");
    }

    let oauth = OAuthService::from_config(config)?;
    if !oauth.is_configured() {
        tracing::warn!("GitHub OAuth client is not configured; sign-in is unavailable");
    }

    let state = AppState {
        db: services.db,
        fetcher: services.fetcher,
        reminders: services.runner,
        oauth: Arc::new(oauth),
        cron_secret: config.cron_secret(),
    };

    let public_base_url = config.public_base_url();
    let app = build_app(state, public_base_url.starts_with("https://")).await?;

    let bind_address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {bind_address}"))?;

    tracing::info!(
        database = %config.database_path(),
        bind = %bind_address,
        public_base_url = %public_base_url,
        "dashboard listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
