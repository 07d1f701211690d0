mod error;
mod routes;

use std::sync::{Arc, Mutex};

use anyhow::Result;
use ecobuddy_core::backend::{self, Backend};
use ecobuddy_core::chat::{Chatbot, Conversation};
use ecobuddy_core::config::EcoConfig;
use ecobuddy_core::local::LocalKv;
use ecobuddy_core::model::CommunityPost;
use ecobuddy_core::scope::ViewScope;
use ecobuddy_core::seed;
use ecobuddy_core::store::AppStore;
use ecobuddy_core::sync::{SharedStore, SyncAdapter};
use tokio_util::sync::CancellationToken;

/// One local user per process: one store, one transcript.
pub struct AppState {
    pub store: SharedStore,
    pub sync: SyncAdapter,
    pub chatbot: Chatbot,
    pub conversation: Mutex<Conversation>,
    pub posts: Mutex<Vec<CommunityPost>>,
    pub config: EcoConfig,
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: EcoConfig, backend: Backend, kv: LocalKv) -> Self {
        let store = AppStore::new(seed::catalog(), kv).with_policy(config.challenges.completion_policy());
        Self {
            store: Mutex::new(store),
            sync: SyncAdapter::new(backend),
            chatbot: Chatbot::from_config(&config.chat),
            conversation: Mutex::new(Conversation::new()),
            posts: Mutex::new(seed::community_posts()),
            config,
            shutdown: CancellationToken::new(),
        }
    }

    /// Scope for one request; cancelled at shutdown.
    pub fn scope(&self) -> ViewScope {
        ViewScope::child_of(&self.shutdown)
    }

    /// Pull reference data from the backend. Failures keep the bundled catalog.
    pub async fn refresh_catalog(&self) {
        match self.sync.load_catalog(&self.scope(), &self.store).await {
            Ok(posts) if !posts.is_empty() => {
                if let Ok(mut cached) = self.posts.lock() {
                    *cached = posts;
                }
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("catalog load failed, using bundled data: {e}"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ecobuddy_web=info".parse().unwrap()),
        )
        .init();

    let cwd = std::env::current_dir().ok();
    let config = EcoConfig::load(cwd.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("{e}; using default config");
        EcoConfig::default_config()
    });

    let backend = backend::create_backend(&config)?;
    let kv = LocalKv::open_default(config.local.path.as_deref())?;
    tracing::info!(backend = backend.kind(), local = %kv.path().display(), "storage ready");

    let state = Arc::new(AppState::new(config.clone(), backend, kv));
    state.refresh_catalog().await;

    let app = routes::router()
        .with_state(state.clone())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::cors::CorsLayer::permissive());

    let addr = format!("{}:{}", config.web.host, config.web.port);
    tracing::info!("ecobuddy-web listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let shutdown = state.shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutting down");
            shutdown.cancel();
        }
    });

    let ct = state.shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { ct.cancelled().await })
        .await?;

    Ok(())
}
