use crate::config::Config;
use crate::identity::{self, UserStore};
use crate::tmdb::{TmdbApi, TmdbClient};
use crate::{admin, auth, movies, views};
use anyhow::{Context, Result};
use axum::{
    http::StatusCode,
    middleware,
    response::{Html, IntoResponse, Redirect},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::info;

const MAX_BODY_BYTES: usize = 64 * 1024; // forms only

#[derive(Clone)]
pub struct AppState {
    pub tmdb: Arc<dyn TmdbApi>,
    pub users: Arc<UserStore>,
    pub session_secret: Arc<[u8]>,
}

impl AppState {
    pub fn new(tmdb: Arc<dyn TmdbApi>, users: Arc<UserStore>, session_secret: &str) -> Self {
        Self {
            tmdb,
            users,
            session_secret: Arc::from(session_secret.as_bytes()),
        }
    }
}

pub async fn run_server(config: Config) -> Result<()> {
    let tmdb = TmdbClient::new(&config.tmdb_api_key)?;
    info!("TMDB client using {} authentication", tmdb.auth_mode());

    let users = Arc::new(UserStore::new());
    identity::seed_roles_and_admin(
        &users,
        &config.admin_email,
        config.admin_password.as_deref(),
    )
    .await
    .context("Failed to seed roles and admin account")?;

    let state = AppState::new(Arc::new(tmdb), users, &config.session_secret);
    let app = build_router(state);

    info!("Listening on {}", config.addr);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    let movie_routes = Router::new()
        .route("/movies", get(movies::index))
        .route("/movies/trending", get(movies::trending_partial))
        .route("/movies/search", get(movies::search))
        .route("/movies/:id", get(movies::details))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_user,
        ));

    let admin_routes = Router::new()
        .route("/admin", get(admin::index))
        .route("/admin/movies", get(admin::movies))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_admin,
        ));

    Router::new()
        .route("/", get(root))
        .route("/login", get(auth::login_form).post(auth::login))
        .route("/register", get(auth::register_form).post(auth::register))
        .route("/logout", post(auth::logout))
        .route("/health", get(health))
        .merge(movie_routes)
        .merge(admin_routes)
        .fallback(not_found)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> Redirect {
    Redirect::to("/login")
}

async fn health() -> &'static str {
    "OK"
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Html(views::not_found_page(None)))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        term.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}
