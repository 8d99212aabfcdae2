//! Tipos de domínio: identidade do dispositivo e leitura decodificada.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

// ──────────────────────────────────────────────
// Identidade
// ──────────────────────────────────────────────

/// Erro ao construir uma [`DeviceIdentity`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("Identidade de dispositivo vazia")]
    Empty,
}

/// Chave estável de um sensor físico (nome anunciado ou endereço).
///
/// Nunca é vazia: o construtor rejeita strings vazias, então nenhuma
/// leitura pode ser gravada sob uma chave vazia.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceIdentity(String);

impl DeviceIdentity {
    pub fn new(key: impl Into<String>) -> Result<Self, IdentityError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(IdentityError::Empty);
        }
        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ──────────────────────────────────────────────
// Leitura
// ──────────────────────────────────────────────

/// Uma amostra decodificada de um broadcast.
///
/// Imutável depois de construída. `received_at` é o instante de recepção:
/// o protocolo não carrega horário de transmissão.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// Temperatura (°C), uma casa decimal
    pub temperature: f64,
    /// Umidade relativa (%), uma casa decimal, sem clamp
    pub humidity: f64,
    /// Bateria (%), byte cru
    pub battery: u8,
    /// Instante de recepção (relógio de parede)
    pub received_at: SystemTime,
}

impl Reading {
    /// Segundos Unix inteiros de `received_at`.
    pub fn received_unix_secs(&self) -> i64 {
        match self.received_at.duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_secs() as i64,
            Err(e) => -(e.duration().as_secs() as i64),
        }
    }
}
