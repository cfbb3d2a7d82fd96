/// Application state and router builder
///
/// Every core component is constructed once here from [`Config`] and a
/// storage backend, then shared with handlers through [`AppState`].
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use tasktrack_api::{app::{build_router, AppState}, config::Config};
/// use tasktrack_shared::store::memory::MemoryStore;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let state = AppState::with_store(config, Arc::new(MemoryStore::new()), None)?;
/// let app = build_router(state);
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    middleware::{security::SecurityHeadersLayer, session::require_session},
};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tasktrack_shared::{
    auth::{
        gate::{GateConfig, OwnershipGate},
        password::PasswordHasher,
        session::{SessionConfig, SessionManager},
    },
    store::{AccountStore, SessionStore, TaskStore},
    tasks::TaskService,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor; every field
/// is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Registration, login, logout
    pub sessions: Arc<SessionManager>,

    /// Token to identity resolution
    pub gate: Arc<OwnershipGate>,

    /// Owner-scoped task operations
    pub tasks: Arc<TaskService>,

    /// Database pool, when the PostgreSQL backend is in use
    pub db: Option<PgPool>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Wires the core components to one backend implementing every store
    ///
    /// # Errors
    ///
    /// Fails if the configured hashing cost or session validity is rejected.
    pub fn with_store<S>(config: Config, store: Arc<S>, db: Option<PgPool>) -> anyhow::Result<Self>
    where
        S: AccountStore + SessionStore + TaskStore + 'static,
    {
        let hasher = PasswordHasher::new(config.hasher)?;

        let sessions = SessionManager::new(
            store.clone(),
            store.clone(),
            hasher,
            SessionConfig {
                validity: config.session_validity(),
            },
        )?;

        let gate = OwnershipGate::new(
            store.clone(),
            GateConfig {
                enforce_expiry: config.session.enforce_expiry,
            },
        );

        Ok(Self {
            sessions: Arc::new(sessions),
            gate: Arc::new(gate),
            tasks: Arc::new(TaskService::new(store)),
            db,
            config: Arc::new(config),
        })
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

/// Builds the complete Axum router with all routes and middleware
///
/// ```text
/// /
/// ├── GET /health                  # public
/// └── /v1/
///     ├── /auth/                   # public
///     │   ├── POST /register
///     │   ├── POST /login
///     │   └── POST /logout         # token checked by the handler
///     └── /tasks/                  # gate middleware
///         ├── GET    /
///         ├── POST   /
///         ├── GET    /:id
///         ├── PUT    /:id
///         ├── DELETE /:id
///         └── POST   /:id/done
/// ```
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/logout", post(routes::auth::logout));

    let task_routes = Router::new()
        .route(
            "/",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/:id",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route("/:id/done", post(routes::tasks::mark_task_done))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    let v1_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/tasks", task_routes);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config.api.cors_origins))
        .layer(SecurityHeadersLayer::new(state.config.session.cookie_secure))
        .with_state(state)
}
