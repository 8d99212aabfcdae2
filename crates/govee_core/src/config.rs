//! Configuração unificada via TOML.
//!
//! Um único `config.toml` ao lado do executável (ou passado como primeiro
//! argumento) define endpoint, política de frescor, origem dos broadcasts e
//! a lista de sensores exportados.

use crate::projector::{DeviceLabels, FreshnessPolicy, Target};
use crate::types::{DeviceIdentity, IdentityError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Erros de leitura/escrita da configuração.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Erro ao ler {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Erro ao parsear {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Erro ao serializar configuração: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Erro ao escrever {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// O que leituras velhas fazem com as métricas de valor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StalePolicy {
    /// Esconde temperatura/umidade/bateria após `stale_duration_secs`
    Suppress,
    /// Sempre reporta a última leitura
    Always,
}

/// Qual campo do broadcast identifica o dispositivo no store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifyBy {
    Name,
    Address,
}

/// Origem das linhas de advertisement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScannerMode {
    Stdin,
    Udp,
}

/// Configuração da entrada de broadcasts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// "stdin" ou "udp"
    pub mode: ScannerMode,
    /// Só nomes anunciados com este prefixo são processados
    pub name_prefix: String,
    /// Porta UDP (modo "udp")
    pub udp_port: u16,
    /// Capacidade do channel entre scanner e ingestão
    pub channel_capacity: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            mode: ScannerMode::Stdin,
            name_prefix: "GV".into(),
            udp_port: 5005,
            channel_capacity: 256,
        }
    }
}

/// Um sensor exportado.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Nome anunciado (ex: "GVH5075_1A2B")
    pub name: String,
    /// Endereço Bluetooth (ex: "A4:C1:38:1A:2B:3C")
    pub mac_address: String,
}

/// Configuração raiz do exporter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Filtro de log padrão (RUST_LOG tem prioridade)
    pub log_level: String,
    /// Endereço do endpoint HTTP
    pub listen_addr: String,
    /// Prefixo de todas as métricas
    pub metric_prefix: String,
    /// Idade a partir da qual uma leitura é considerada velha
    pub stale_duration_secs: u64,
    /// "suppress" ou "always"
    pub stale_policy: StalePolicy,
    /// "name" ou "address"
    pub identify_by: IdentifyBy,
    pub scanner: ScannerConfig,
    pub sensors: Vec<SensorConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            listen_addr: "0.0.0.0:9294".into(),
            metric_prefix: "govee_".into(),
            stale_duration_secs: 300,
            stale_policy: StalePolicy::Suppress,
            identify_by: IdentifyBy::Name,
            scanner: ScannerConfig::default(),
            sensors: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Lê e parseia um arquivo TOML.
    pub fn try_load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Salva configuração em arquivo TOML.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Configuração salva em {}", path.display());
        Ok(())
    }

    /// Retorna o caminho padrão do config.toml.
    pub fn default_path() -> PathBuf {
        let exe_dir = std::env::current_exe()
            .map(|p| p.parent().unwrap_or(Path::new(".")).to_path_buf())
            .unwrap_or_else(|_| PathBuf::from("."));
        exe_dir.join("config.toml")
    }

    pub fn stale_duration(&self) -> Duration {
        Duration::from_secs(self.stale_duration_secs)
    }

    pub fn freshness_policy(&self) -> FreshnessPolicy {
        match self.stale_policy {
            StalePolicy::Suppress => FreshnessPolicy::SuppressStale {
                stale_after: self.stale_duration(),
            },
            StalePolicy::Always => FreshnessPolicy::AlwaysReport,
        }
    }

    /// Chave no store de um sensor configurado, conforme `identify_by`.
    pub fn sensor_key<'a>(&self, sensor: &'a SensorConfig) -> &'a str {
        match self.identify_by {
            IdentifyBy::Name => &sensor.name,
            IdentifyBy::Address => &sensor.mac_address,
        }
    }

    /// Sensores configurados como alvos do projetor.
    pub fn targets(&self) -> Result<Vec<Target>, IdentityError> {
        self.sensors
            .iter()
            .map(|s| -> Result<Target, IdentityError> {
                Ok(Target {
                    identity: DeviceIdentity::new(self.sensor_key(s))?,
                    labels: DeviceLabels {
                        mac_address: s.mac_address.clone(),
                        name: s.name.clone(),
                    },
                })
            })
            .collect()
    }

    /// Valida a configuração e retorna lista de erros.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            errors.push(format!("listen_addr inválido: {:?}", self.listen_addr));
        }
        if !is_valid_metric_prefix(&self.metric_prefix) {
            errors.push(format!("metric_prefix inválido: {:?}", self.metric_prefix));
        }
        if self.stale_policy == StalePolicy::Suppress && self.stale_duration_secs == 0 {
            errors.push("stale_duration_secs não pode ser 0 com stale_policy = \"suppress\"".into());
        }
        if self.scanner.mode == ScannerMode::Udp && self.scanner.udp_port == 0 {
            errors.push("Porta UDP do scanner não pode ser 0".into());
        }
        if self.scanner.channel_capacity == 0 {
            errors.push("channel_capacity não pode ser 0".into());
        }

        let mut seen = HashSet::new();
        for (i, sensor) in self.sensors.iter().enumerate() {
            let key = self.sensor_key(sensor);
            if key.trim().is_empty() {
                errors.push(format!("Sensor #{i} sem {:?}", self.identify_by));
            } else if !seen.insert(key) {
                errors.push(format!("Sensor duplicado: {key}"));
            }
        }

        errors
    }
}

/// `[a-zA-Z_:][a-zA-Z0-9_:]*`, ou vazio.
fn is_valid_metric_prefix(prefix: &str) -> bool {
    let mut chars = prefix.chars();
    match chars.next() {
        None => true,
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
        }
        Some(_) => false,
    }
}
