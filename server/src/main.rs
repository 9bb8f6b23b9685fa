mod auth;
mod rate_limit;
mod store;

use crate::auth::SessionStore;
use crate::rate_limit::{RateLimiter, COMMENT_LIMITS, LOGIN_LIMITS};
use crate::store::{CommentStore, StoredComment};
use anyhow::Context;
use axum::extract::{ConnectInfo, Query, State};
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{body::Body, Form, Json, Router};
use dotenvy::Error as DotenvError;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::Mutex;
use tower::service_fn;
use tower::ServiceExt;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

const DEFAULT_MAX_COMMENT_CHARS: usize = 500;
const LOGIN_ROUTE: &str = "/login";
const LOGOUT_ROUTE: &str = "/logout";
const AFTER_AUTH_REDIRECT: &str = "/#comments-";
const LOGIN_FORM_HTML: &str = r#"<!doctype html>
<html lang="en">
<head><meta charset="utf-8"><title>Sign in to comment</title></head>
<body>
<form method="get" action="/login">
    <label for="name">Display name</label>
    <input id="name" name="name" maxlength="40" required autofocus>
    <button type="submit">Sign in</button>
</form>
</body>
</html>
"#;

#[derive(Clone)]
struct AppState {
    sessions: Arc<SessionStore>,
    comments: CommentStore,
    comment_limiter: Arc<Mutex<RateLimiter>>,
    login_limiter: Arc<Mutex<RateLimiter>>,
    max_comment_chars: usize,
}

struct ServerConfig {
    host: String,
    port: u16,
    static_dir: PathBuf,
    database_path: PathBuf,
    max_comment_chars: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    logged_in: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    login_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    logout_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginQuery {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommentForm {
    #[serde(default)]
    comment: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    reason: &'static str,
    detail: String,
}

struct ApiError {
    status: StatusCode,
    reason: &'static str,
    detail: String,
}

impl ApiError {
    fn new(status: StatusCode, reason: &'static str, detail: impl Into<String>) -> Self {
        Self {
            status,
            reason,
            detail: detail.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            reason: self.reason,
            detail: self.detail,
        };
        (self.status, Json(body)).into_response()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_env_files();
    configure_tracing();

    let config = ServerConfig::from_env()?;
    let comments = CommentStore::open(config.database_path.clone())
        .await
        .with_context(|| format!("Failed to open comment database {:?}", config.database_path))?;
    let state = Arc::new(AppState {
        sessions: Arc::new(SessionStore::new()),
        comments,
        comment_limiter: Arc::new(Mutex::new(RateLimiter::new(COMMENT_LIMITS))),
        login_limiter: Arc::new(Mutex::new(RateLimiter::new(LOGIN_LIMITS))),
        max_comment_chars: config.max_comment_chars,
    });

    let static_root = Arc::new(config.static_dir.clone());
    let static_service = service_fn(move |req: Request<Body>| {
        let dir =
            ServeDir::new(static_root.as_ref().clone()).append_index_html_on_directories(true);
        async move {
            match dir.oneshot(req).await {
                Ok(response) => Ok::<Response, Infallible>(response.into_response()),
                Err(err) => Ok((
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Static file error: {err}"),
                )
                    .into_response()),
            }
        }
    });

    let router = app(state)
        .fallback_service(static_service)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid HOST/PORT combination")?;

    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind TCP listener")?;
    let bound = listener
        .local_addr()
        .context("Failed to read listener address")?;
    info!(
        listening = %bound,
        static_dir = %config.static_dir.display(),
        msg = "server ready"
    );

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/auth", get(handle_auth))
        .route(LOGIN_ROUTE, get(handle_login))
        .route(LOGOUT_ROUTE, get(handle_logout))
        .route("/comment", get(list_comments).post(post_comment))
        .with_state(state)
}

impl ServerConfig {
    fn from_env() -> anyhow::Result<Self> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = match std::env::var("PORT") {
            Ok(value) => value.parse().context("PORT must be a port number")?,
            Err(_) => 3000,
        };
        let static_dir =
            PathBuf::from(std::env::var("STATIC_DIR").unwrap_or_else(|_| "static".to_string()));
        let database_path = PathBuf::from(
            std::env::var("DATABASE_PATH").unwrap_or_else(|_| "comments.sqlite3".to_string()),
        );
        let max_comment_chars = match std::env::var("COMMENT_MAX_LEN") {
            Ok(value) => value
                .parse()
                .context("COMMENT_MAX_LEN must be a positive integer")?,
            Err(_) => DEFAULT_MAX_COMMENT_CHARS,
        };

        Ok(Self {
            host,
            port,
            static_dir,
            database_path,
            max_comment_chars,
        })
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, msg = "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(error = %err, msg = "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("msg" = "shutdown signal received");
}

fn configure_tracing() {
    let default_filter = "info";
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();
}

fn load_env_files() {
    fn load(file: &str) {
        match dotenvy::from_filename(file) {
            Ok(_) => {}
            Err(DotenvError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => eprintln!("Warning: unable to load {file}: {err}"),
        }
    }

    load(".env.local");
    load(".env");
}

async fn handle_auth(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Json<AuthResponse> {
    let logged_in = state.sessions.user_for(&headers).await.is_some();
    Json(AuthResponse {
        logged_in,
        login_url: (!logged_in).then(|| LOGIN_ROUTE.to_string()),
        logout_url: logged_in.then(|| LOGOUT_ROUTE.to_string()),
    })
}

async fn handle_login(
    State(state): State<Arc<AppState>>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    Query(query): Query<LoginQuery>,
) -> Response {
    let Some(name) = query.name.as_deref().and_then(auth::normalize_name) else {
        return Html(LOGIN_FORM_HTML).into_response();
    };

    let ip = remote.ip().to_string();
    if let Err(limit) = state.login_limiter.lock().await.check_and_record(&ip) {
        let (status, reason, detail) = limit.describe();
        warn!(ip = %ip, reason, msg = "login rate limited");
        return ApiError::new(status, reason, detail).into_response();
    }

    let token = state.sessions.create(&name).await;
    let active = state.sessions.active_count().await;
    info!(ip = %ip, user = %name, active_sessions = active, msg = "session started");
    (
        [(SET_COOKIE, auth::session_cookie(&token))],
        Redirect::to(AFTER_AUTH_REDIRECT),
    )
        .into_response()
}

async fn handle_logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Some(token) = auth::session_token(&headers) {
        if let Some(user) = state.sessions.remove(&token).await {
            info!(user = %user, msg = "session ended");
        }
    }
    (
        [(SET_COOKIE, auth::expired_session_cookie())],
        Redirect::to(AFTER_AUTH_REDIRECT),
    )
        .into_response()
}

async fn list_comments(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<StoredComment>>, ApiError> {
    match state.comments.list().await {
        Ok(comments) => Ok(Json(comments)),
        Err(err) => {
            error!(error = %err, msg = "failed to list comments");
            Err(ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "store_unavailable",
                "Comments are unavailable right now.",
            ))
        }
    }
}

async fn post_comment(
    State(state): State<Arc<AppState>>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Form(form): Form<CommentForm>,
) -> Result<(StatusCode, Json<StoredComment>), ApiError> {
    let ip = remote.ip().to_string();

    let Some(user) = state.sessions.user_for(&headers).await else {
        warn!(ip = %ip, reason = "not_logged_in", msg = "comment rejected");
        return Err(ApiError::new(
            StatusCode::UNAUTHORIZED,
            "not_logged_in",
            "Sign in before posting a comment.",
        ));
    };

    let text = form.comment.trim();
    if text.is_empty() {
        warn!(ip = %ip, user = %user, reason = "empty_comment", msg = "comment rejected");
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "empty_comment",
            "Comment text is required.",
        ));
    }
    if text.chars().count() > state.max_comment_chars {
        warn!(ip = %ip, user = %user, reason = "comment_too_long", msg = "comment rejected");
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "comment_too_long",
            format!(
                "Comments are limited to {} characters.",
                state.max_comment_chars
            ),
        ));
    }

    {
        let mut limiter = state.comment_limiter.lock().await;
        if let Err(limit) = limiter.check_and_record(&ip) {
            let (status, reason, detail) = limit.describe();
            let usage = limiter.usage_snapshot(&ip);
            warn!(
                ip = %ip,
                user = %user,
                reason,
                burst = usage.burst,
                hour = usage.hour,
                day = usage.day,
                msg = "comment rate limited"
            );
            return Err(ApiError::new(status, reason, detail));
        }
    }

    let comment = StoredComment {
        user,
        text: text.to_string(),
        timestamp: chrono::Utc::now().timestamp_millis(),
    };
    if let Err(err) = state.comments.insert(comment.clone()).await {
        error!(ip = %ip, error = %err, msg = "failed to store comment");
        return Err(ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "store_unavailable",
            "The comment could not be saved.",
        ));
    }

    info!(ip = %ip, user = %comment.user, chars = text.chars().count(), msg = "comment stored");
    Ok((StatusCode::CREATED, Json(comment)))
}
