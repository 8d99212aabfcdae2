//! Thread de entrada que recebe advertisements e envia para a ingestão via channel.
//!
//! O scan Bluetooth em si fica fora do processo: uma ferramenta externa
//! escreve uma linha por broadcast, em stdin ou em datagramas UDP:
//!
//! ```text
//! <nome> <endereço> <manufacturer data em hex>
//! GVH5075_1A2B A4:C1:38:1A:2B:3C 88ec00037064
//! ```

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use govee_core::config::{ScannerConfig, ScannerMode};
use std::io::{self, BufRead};
use std::net::UdpSocket;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Um broadcast recebido: identidade anunciada + payload cru.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    pub name: String,
    pub address: String,
    pub manufacturer_data: Vec<u8>,
}

/// Erros ao interpretar uma linha de advertisement.
#[derive(Debug, thiserror::Error)]
pub enum AdvertisementError {
    #[error("Campo ausente: {0}")]
    MissingField(&'static str),

    #[error("Manufacturer data inválido: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

/// Interpreta `<nome> <endereço> <hex>`.
pub fn parse_line(line: &str) -> Result<Advertisement, AdvertisementError> {
    let mut fields = line.split_whitespace();
    let name = fields.next().ok_or(AdvertisementError::MissingField("nome"))?;
    let address = fields
        .next()
        .ok_or(AdvertisementError::MissingField("endereço"))?;
    let data = fields
        .next()
        .ok_or(AdvertisementError::MissingField("manufacturer data"))?;

    Ok(Advertisement {
        name: name.to_string(),
        address: address.to_string(),
        manufacturer_data: hex::decode(data)?,
    })
}

/// Resultado de repassar uma linha para o channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Forward {
    Continue,
    Disconnected,
}

/// Filtra pelo prefixo do nome e envia sem bloquear.
fn forward_line(line: &str, name_prefix: &str, tx: &Sender<Advertisement>) -> Forward {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Forward::Continue;
    }

    let adv = match parse_line(line) {
        Ok(adv) => adv,
        Err(e) => {
            debug!("Linha inválida {line:?}: {e}");
            return Forward::Continue;
        }
    };

    if !adv.name.starts_with(name_prefix) {
        debug!("Ignorando {} (prefixo esperado: {name_prefix})", adv.name);
        return Forward::Continue;
    }

    // Non-blocking send: se a ingestão está atrasada, descarta o broadcast
    match tx.try_send(adv) {
        Ok(()) => Forward::Continue,
        Err(TrySendError::Full(adv)) => {
            debug!("Channel cheio, descartando broadcast de {}", adv.name);
            Forward::Continue
        }
        Err(TrySendError::Disconnected(_)) => Forward::Disconnected,
    }
}

/// Lê linhas até EOF (ou até a ingestão encerrar).
/// Linhas que não são UTF-8 são descartadas; só EOF ou erro de I/O encerram.
pub fn read_lines<R: BufRead>(mut reader: R, name_prefix: &str, tx: &Sender<Advertisement>) {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => return,
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!("Erro ao ler entrada: {e}");
                return;
            }
        }

        let Ok(line) = std::str::from_utf8(&buf) else {
            debug!("Linha ignorada: não é UTF-8 ({} bytes)", buf.len());
            continue;
        };
        if forward_line(line, name_prefix, tx) == Forward::Disconnected {
            return;
        }
    }
}

/// Inicia a thread de entrada. Retorna o receiver do channel.
pub fn spawn_scanner_thread(config: &ScannerConfig) -> io::Result<Receiver<Advertisement>> {
    let (tx, rx) = bounded::<Advertisement>(config.channel_capacity);
    let prefix = config.name_prefix.clone();

    match config.mode {
        ScannerMode::Stdin => {
            std::thread::Builder::new()
                .name("adv-stdin".into())
                .spawn(move || {
                    info!("Lendo advertisements de stdin (prefixo {prefix:?})");
                    read_lines(io::stdin().lock(), &prefix, &tx);
                    info!("Entrada stdin encerrada");
                })?;
        }
        ScannerMode::Udp => {
            let port = config.udp_port;
            std::thread::Builder::new()
                .name("adv-udp".into())
                .spawn(move || udp_loop(&tx, port, &prefix))?;
        }
    }

    Ok(rx)
}

fn udp_loop(tx: &Sender<Advertisement>, port: u16, name_prefix: &str) {
    loop {
        match UdpSocket::bind(format!("0.0.0.0:{port}")) {
            Ok(sock) => {
                info!("Escutando advertisements em 0.0.0.0:{port} (prefixo {name_prefix:?})");

                let mut buf = [0u8; 65536];
                loop {
                    match sock.recv_from(&mut buf) {
                        Ok((size, addr)) => {
                            let Ok(text) = std::str::from_utf8(&buf[..size]) else {
                                debug!("Datagrama não-UTF-8 de {addr}");
                                continue;
                            };
                            for line in text.lines() {
                                if forward_line(line, name_prefix, tx) == Forward::Disconnected {
                                    info!("Ingestão encerrada, parando listener UDP");
                                    return;
                                }
                            }
                        }
                        Err(e) => {
                            warn!("Erro ao receber UDP: {e}");
                        }
                    }
                }
            }
            Err(e) => {
                error!("Falha ao bind porta {port}: {e}. Tentando novamente em 2s...");
                std::thread::sleep(Duration::from_secs(2));
            }
        }
    }
}
