//! # Govee Core
//!
//! Crate compartilhada com o pipeline decodificar-e-guardar dos sensores
//! Govee: decodificação do manufacturer data, store da leitura mais recente
//! por dispositivo e projeção em métricas com política de frescor.
//!
//! ## Módulos
//! - [`types`] – Identidade do dispositivo e leitura decodificada
//! - [`protocol`] – Decode binário do payload de broadcast
//! - [`store`] – Mapa concorrente last-write-wins
//! - [`projector`] – Snapshot → amostras de gauge
//! - [`config`] – Configuração unificada via TOML

pub mod types;
pub mod protocol;
pub mod store;
pub mod projector;
pub mod config;

// Re-exports convenientes
pub use types::{DeviceIdentity, Reading};
pub use protocol::{decode_payload, DecodeError};
pub use store::{ReadingStore, Snapshot};
pub use projector::{FreshnessPolicy, MetricKind, MetricsProjector, Sample};
pub use config::AppConfig;
