//! # Govee Exporter
//!
//! Recebe broadcasts de termo-higrômetros Govee, guarda a leitura mais
//! recente de cada sensor e exporta como métricas Prometheus.
//!
//! ## Uso
//! ```bash
//! govee_exporter                    # usa config.toml ao lado do executável
//! govee_exporter /etc/govee.toml    # config explícito
//! ```
//!
//! Com `scanner.mode = "stdin"`, cada linha da entrada é um broadcast:
//! `<nome> <endereço> <manufacturer data em hex>`.

mod exposition;
mod ingest;
mod scanner;
mod server;

use exposition::BuildInfo;
use govee_core::config::{AppConfig, ConfigError};
use govee_core::{MetricsProjector, ReadingStore};
use ingest::Ingestor;
use server::MetricsState;
use std::path::PathBuf;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Config ──
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(AppConfig::default_path);
    let loaded = AppConfig::try_load(&config_path);
    let config = loaded.as_ref().cloned().unwrap_or_default();

    // ── Logging ──
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.as_str().into()),
        )
        .init();

    match loaded {
        Ok(_) => info!("Configuração carregada de {}", config_path.display()),
        Err(ConfigError::Read { .. }) if !config_path.exists() => {
            info!("Usando configuração padrão");
            // Salva config padrão se não existir
            if let Err(e) = config.save(&config_path) {
                warn!("Não foi possível salvar config padrão: {e}");
            }
        }
        Err(e) => warn!("{e}. Usando configuração padrão"),
    }

    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            error!("Configuração inválida: {e}");
        }
        anyhow::bail!("{} erro(s) em {}", errors.len(), config_path.display());
    }

    let targets = config.targets()?;
    if targets.is_empty() {
        warn!("Nenhum sensor configurado em {}; só build_info será exportado", config_path.display());
    }
    for t in &targets {
        info!("Sensor: {} ({} / {})", t.identity, t.labels.name, t.labels.mac_address);
    }

    // ── Store + pipeline de ingestão ──
    let store = ReadingStore::new();
    let rx = scanner::spawn_scanner_thread(&config.scanner)?;
    let ingest_handle = ingest::spawn_ingest_thread(rx, Ingestor::new(store.clone(), config.identify_by))?;

    // ── Banner ──
    info!(
        "Exporter iniciado | política: {:?} | prefixo: {:?} | entrada: {:?}",
        config.freshness_policy(),
        config.metric_prefix,
        config.scanner.mode
    );

    // ── HTTP ──
    let projector = MetricsProjector::new(targets, config.freshness_policy());
    let state = MetricsState::new(
        store,
        projector,
        config.metric_prefix.clone(),
        BuildInfo::current(),
    );
    server::serve(&config.listen_addr, state).await?;

    if ingest_handle.is_finished() {
        warn!("Ingestão tinha parado antes do shutdown; as métricas estavam congeladas");
    }

    info!("Shutdown completo.");
    Ok(())
}
