//! Decodificador do manufacturer data dos broadcasts Govee.
//!
//! Formato do payload (sem campo de tamanho, sem versão):
//!
//! ```text
//! ┌────────────┬──────────────────────────┬─────────────┐
//! │ Header (2) │ Temp+Umidade (3, BE)     │ Bateria (1) │
//! └────────────┴──────────────────────────┴─────────────┘
//! ```
//!
//! - Header: marcador de fabricante/tipo, consumido sem validação
//! - Valor empacotado `v` de 24 bits: bit `0x800000` = temperatura negativa;
//!   nesse caso só os 20 bits baixos formam a magnitude
//! - `temperatura = trunc(magnitude / 1000) / 10`, `umidade = (magnitude % 1000) / 10`
//! - Bateria em percentual, byte cru
//!
//! A umidade usa a mesma magnitude mascarada da temperatura.

use crate::types::Reading;
use std::time::SystemTime;

/// Tamanho mínimo do payload.
pub const PAYLOAD_LEN: usize = 6;

/// Tamanho do header opaco.
const HEADER_SIZE: usize = 2;

/// Bit de sinal da temperatura no valor empacotado.
const SIGN_BIT: u32 = 0x80_0000;

/// Máscara da magnitude quando a temperatura é negativa (20 bits).
const NEGATIVE_MAGNITUDE_MASK: u32 = 0x0F_FFFF;

/// Erros de decodificação.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("Payload truncado ({len} bytes, mínimo {PAYLOAD_LEN})")]
    Truncated { len: usize },
}

/// Decodifica o manufacturer data em uma [`Reading`].
///
/// Função pura: não valida plausibilidade física, só aritmética.
/// Bytes extras após o sexto são ignorados.
pub fn decode_payload(data: &[u8], received_at: SystemTime) -> Result<Reading, DecodeError> {
    if data.len() < PAYLOAD_LEN {
        return Err(DecodeError::Truncated { len: data.len() });
    }

    let packed = &data[HEADER_SIZE..HEADER_SIZE + 3];
    let raw = u32::from_be_bytes([0, packed[0], packed[1], packed[2]]);
    let battery = data[HEADER_SIZE + 3];

    let (negative, magnitude) = split_sign(raw);

    let mut temperature = f64::from(magnitude / 1000) / 10.0;
    if negative {
        temperature = -temperature;
    }
    let humidity = f64::from(magnitude % 1000) / 10.0;

    Ok(Reading {
        temperature,
        humidity,
        battery,
        received_at,
    })
}

fn split_sign(raw: u32) -> (bool, u32) {
    if raw & SIGN_BIT != 0 {
        (true, raw & NEGATIVE_MAGNITUDE_MASK)
    } else {
        (false, raw)
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
