//! Loop de ingestão: único dono da escrita no store.
//!
//! Consome o channel do scanner, decodifica cada payload e grava a leitura.
//! Payloads inválidos são logados e descartados sem tocar no store.

use crate::scanner::Advertisement;
use crossbeam_channel::Receiver;
use govee_core::config::IdentifyBy;
use govee_core::protocol::{DecodeError, decode_payload};
use govee_core::types::{DeviceIdentity, IdentityError, Reading};
use govee_core::ReadingStore;
use std::io;
use std::thread::JoinHandle;
use std::time::SystemTime;
use tracing::{debug, warn};

/// Motivos para descartar um broadcast.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("{0}")]
    Identity(#[from] IdentityError),

    #[error("{0}")]
    Decode(#[from] DecodeError),
}

/// Decodifica broadcasts e grava no store.
#[derive(Debug, Clone)]
pub struct Ingestor {
    store: ReadingStore,
    identify_by: IdentifyBy,
}

impl Ingestor {
    pub fn new(store: ReadingStore, identify_by: IdentifyBy) -> Self {
        Self { store, identify_by }
    }

    /// Processa um broadcast recebido em `received_at`.
    pub fn ingest(
        &self,
        adv: &Advertisement,
        received_at: SystemTime,
    ) -> Result<(DeviceIdentity, Reading), IngestError> {
        let key = match self.identify_by {
            IdentifyBy::Name => &adv.name,
            IdentifyBy::Address => &adv.address,
        };
        let identity = DeviceIdentity::new(key.as_str())?;
        let reading = decode_payload(&adv.manufacturer_data, received_at)?;

        self.store.put(identity.clone(), reading);
        Ok((identity, reading))
    }

    /// Roda até todos os senders serem dropados.
    pub fn run(&self, rx: &Receiver<Advertisement>) {
        for adv in rx.iter() {
            match self.ingest(&adv, SystemTime::now()) {
                Ok((identity, r)) => {
                    debug!(
                        "{identity} [{}] Temp: {:.1}°C | Umidade: {:.1}% | Bateria: {}%",
                        adv.address, r.temperature, r.humidity, r.battery
                    );
                }
                Err(e) => {
                    debug!(
                        "Descartando broadcast de {} [{}] ({}): {e}",
                        adv.name,
                        adv.address,
                        hex::encode_upper(&adv.manufacturer_data)
                    );
                }
            }
        }
        warn!("Channel de advertisements fechado, ingestão encerrada");
    }
}

/// Inicia a thread de ingestão.
pub fn spawn_ingest_thread(
    rx: Receiver<Advertisement>,
    ingestor: Ingestor,
) -> io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("ingest".into())
        .spawn(move || ingestor.run(&rx))
}
