//! Anteroom is a small user registration and directory API.
//!
//! Accounts are created inactive and receive an activation token by mail;
//! only activated accounts appear in the public directory.

#[forbid(unsafe_code)]
#[deny(unused_mut)]
mod crypto;
mod database;
mod mail;
mod pagination;
mod router;
mod user;

pub mod catalog;
pub mod config;
pub mod error;
pub mod telemetry;

use std::sync::Arc;
use std::time::Duration;

use axum::http::{Method, header};
use axum::{Router, middleware as AxumMiddleware};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::sensitive_headers::SetSensitiveHeadersLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{
    DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer,
};

use crate::catalog::MessageCatalog;
use crate::crypto::Crypto;
use crate::mail::{MailManager, Notifier};
use crate::user::{PostgresRepository, UserRepository, UserService};

/// Bound on any single request, dispatch attempts included.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// State sharing between routes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Configuration>,
    pub repo: Arc<dyn UserRepository>,
    pub users: UserService,
    pub catalog: Arc<MessageCatalog>,
}

/// Create router.
pub fn app(state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        // Add high level tracing/logging to all requests.
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(tracing::Level::INFO))
                .on_request(DefaultOnRequest::new())
                .on_response(DefaultOnResponse::new()),
        )
        // Set a timeout.
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        // Remove sensitive headers from trace.
        .layer(SetSensitiveHeadersLayer::new([
            header::AUTHORIZATION,
            header::COOKIE,
        ]))
        // Add CORS preflight support.
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers(Any),
        );

    Router::new()
        .nest("/users", router::router())
        // finish error responses with the `{path, timestamp, message}`
        // envelope, localized per request.
        .layer(AxumMiddleware::from_fn_with_state(
            state.clone(),
            error::envelope,
        ))
        .layer(middleware)
        .with_state(state)
}

/// Initialize the application state.
pub async fn initialize_state() -> Result<AppState, Box<dyn std::error::Error>>
{
    // read configuration file. let it in memory.
    let config = config::Configuration::default().read()?;

    let db = match config.postgres {
        Some(ref config) => {
            database::Database::new(
                &config.address,
                &config
                    .username
                    .clone()
                    .unwrap_or(database::DEFAULT_CREDENTIALS.into()),
                &config
                    .password
                    .clone()
                    .unwrap_or(database::DEFAULT_CREDENTIALS.into()),
                &config
                    .database
                    .clone()
                    .unwrap_or(database::DEFAULT_DATABASE_NAME.into()),
                config.pool_size.unwrap_or(database::DEFAULT_POOL_SIZE),
            )
            .await?
        },
        None => {
            tracing::error!("missing `postgres` entry on `config.yaml` file");
            std::process::exit(0);
        },
    };

    // execute migrations scripts on start.
    sqlx::migrate!().run(&db.postgres).await?;

    let crypto = Arc::new(Crypto::new(config.argon2.clone())?);

    // handle mail sender.
    let notifier: Arc<dyn Notifier> = match &config.mail {
        Some(cfg) => Arc::new(MailManager::new(cfg).await?),
        None => Arc::new(MailManager::default()),
    };

    let repo: Arc<dyn UserRepository> =
        Arc::new(PostgresRepository::new(db.postgres.clone()));
    let users =
        UserService::new(Arc::clone(&repo), crypto, Arc::clone(&notifier));

    Ok(AppState {
        config,
        repo,
        users,
        catalog: Arc::new(MessageCatalog::default()),
    })
}

/// MUST NEVER be used in production.
#[cfg(test)]
pub async fn make_request(
    app: Router,
    method: Method,
    path: &str,
    body: String,
) -> axum::http::Response<axum::body::Body> {
    make_localized_request(app, method, path, body, "en").await
}

#[cfg(test)]
pub async fn make_localized_request(
    app: Router,
    method: Method,
    path: &str,
    body: String,
    accept_language: &str,
) -> axum::http::Response<axum::body::Body> {
    use axum::extract::Request;
    use tower::util::ServiceExt;

    app.oneshot(
        Request::builder()
            .method(method)
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT_LANGUAGE, accept_language)
            .body(axum::body::Body::from(body))
            .unwrap(),
    )
    .await
    .unwrap()
}

/// State over in-memory doubles, with fast argon2 parameters.
#[cfg(test)]
pub(crate) fn test_state() -> (
    AppState,
    user::MemoryRepository,
    Arc<mail::MockNotifier>,
) {
    let repo = user::MemoryRepository::default();
    let notifier = Arc::new(mail::MockNotifier::default());
    let crypto = Arc::new(
        Crypto::new(Some(config::Argon2 {
            memory_cost: 1024,
            iterations: 1,
            parallelism: 1,
            hash_length: 32,
        }))
        .expect("argon2 test parameters are valid"),
    );

    let repo_dyn: Arc<dyn UserRepository> = Arc::new(repo.clone());
    let users = UserService::new(
        Arc::clone(&repo_dyn),
        crypto,
        Arc::clone(&notifier) as Arc<dyn Notifier>,
    );

    let state = AppState {
        config: Arc::new(config::Configuration::default()),
        repo: repo_dyn,
        users,
        catalog: Arc::new(MessageCatalog::default()),
    };

    (state, repo, notifier)
}
