use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef},
    middleware,
    routing::get,
};
use medimart_auth::{JwtService, generate_secret};
use medimart_db_postgres::PostgresStorage;
use medimart_storage::{DocumentStorage, DynStorage};
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, services::ServeDir, trace::TraceLayer,
};

use crate::{
    blog_generator::{self, BlogGenerator},
    bootstrap,
    config::{AppConfig, StorageBackend},
    handlers,
    locks::KeyedLocks,
    middleware as app_middleware, routes,
};

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub storage: DynStorage,
    pub jwt: Arc<JwtService>,
    pub config: Arc<AppConfig>,
    pub blog_generator: Arc<dyn BlogGenerator>,
    pub locks: Arc<KeyedLocks>,
}

impl AppState {
    pub fn storage(&self) -> &dyn DocumentStorage {
        self.storage.as_ref()
    }
}

impl FromRef<AppState> for Arc<JwtService> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

pub struct MedimartServer {
    addr: SocketAddr,
    app: Router,
}

async fn create_storage(cfg: &AppConfig) -> anyhow::Result<DynStorage> {
    match cfg.storage.backend {
        StorageBackend::Memory => {
            tracing::info!("using in-memory storage; data is lost on restart");
            Ok(medimart_db_memory::create_storage())
        }
        StorageBackend::Postgres => {
            let pg = PostgresStorage::new(cfg.storage.postgres.to_backend_config()).await?;
            tracing::info!("using postgres storage");
            Ok(Arc::new(pg))
        }
    }
}

fn create_jwt(cfg: &AppConfig) -> JwtService {
    let secret = match &cfg.auth.jwt_secret {
        Some(secret) => secret.clone(),
        None => {
            tracing::warn!(
                "auth.jwt_secret is not set; using a random secret, tokens will not survive a restart"
            );
            generate_secret()
        }
    };
    JwtService::new(&secret, cfg.auth.issuer.clone(), cfg.auth.token_ttl())
}

/// Connects storage and builds the services handlers depend on.
pub async fn build_state(cfg: &AppConfig) -> anyhow::Result<AppState> {
    let storage = create_storage(cfg).await?;

    if let Some(admin) = &cfg.bootstrap.admin_user {
        bootstrap::bootstrap_admin_user(storage.as_ref(), admin).await?;
    }

    let generator = blog_generator::from_config(&cfg.blog_generator)?;
    tracing::info!(source = generator.source(), "blog generator ready");

    Ok(AppState {
        storage,
        jwt: Arc::new(create_jwt(cfg)),
        config: Arc::new(cfg.clone()),
        blog_generator: Arc::from(generator),
        locks: Arc::new(KeyedLocks::new()),
    })
}

pub fn router(state: AppState) -> Router {
    let body_limit = state.config.server.body_limit_bytes;
    let uploads_dir = state.config.uploads.dir.clone();
    let api = routes::api_router(&state.config);

    Router::new()
        // Health and info endpoints
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .route("/metrics", get(handlers::metrics))
        .nest("/api", api)
        .nest_service("/uploads", ServeDir::new(uploads_dir))
        // Middleware stack (outermost last: request id -> trace -> cors/compression -> metrics -> body limit)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(app_middleware::http_metrics))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    let req_id = req
                        .extensions()
                        .get::<axum::http::HeaderValue>()
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        http.status_code = Empty,
                        request_id = %req_id
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(middleware::from_fn(app_middleware::request_id))
        .with_state(state)
}

pub async fn build_app(cfg: &AppConfig) -> anyhow::Result<Router> {
    crate::metrics::init_metrics();
    let state = build_state(cfg).await?;
    Ok(router(state))
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    pub async fn build(self) -> anyhow::Result<MedimartServer> {
        let app = build_app(&self.config).await?;
        Ok(MedimartServer {
            addr: self.addr,
            app,
        })
    }
}

impl MedimartServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
