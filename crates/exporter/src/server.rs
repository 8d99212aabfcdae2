//! Endpoint HTTP: `GET /metrics` e redirect de `/`.
//!
//! Cada pull tira um snapshot do store, aplica o projetor e codifica em texto.
//! Pulls concorrentes só disputam o lock do snapshot.

use crate::exposition::{self, BuildInfo};
use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use govee_core::{MetricsProjector, ReadingStore};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Estado compartilhado pelos handlers.
#[derive(Clone)]
pub struct MetricsState {
    store: ReadingStore,
    projector: Arc<MetricsProjector>,
    prefix: Arc<str>,
    build: Arc<BuildInfo>,
}

impl MetricsState {
    pub fn new(
        store: ReadingStore,
        projector: MetricsProjector,
        prefix: impl Into<Arc<str>>,
        build: BuildInfo,
    ) -> Self {
        Self {
            store,
            projector: Arc::new(projector),
            prefix: prefix.into(),
            build: Arc::new(build),
        }
    }

    /// Corpo de um pull no instante `now`.
    pub fn render(&self, now: SystemTime) -> String {
        let snapshot = self.store.snapshot();
        let samples = self.projector.project(&snapshot, now);
        exposition::encode_text(&self.prefix, &samples, &self.build)
    }
}

pub fn router(state: MetricsState) -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .route("/", get(root))
        .with_state(state)
}

async fn metrics(State(state): State<MetricsState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, exposition::content_type())],
        state.render(SystemTime::now()),
    )
}

async fn root() -> impl IntoResponse {
    (StatusCode::FOUND, [(header::LOCATION, "/metrics")])
}

/// Serve até Ctrl-C ou SIGTERM.
pub async fn serve(listen_addr: &str, state: MetricsState) -> anyhow::Result<()> {
    let listener = TcpListener::bind(listen_addr).await?;
    info!("Escutando em http://{}/metrics", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Falha ao escutar Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Falha ao escutar SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Ctrl-C recebido, encerrando"),
        _ = terminate => info!("SIGTERM recebido, encerrando"),
    }
}
