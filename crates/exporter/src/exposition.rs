//! Codificação das amostras no formato texto do Prometheus.
//!
//! ```text
//! # HELP govee_temperature_celsius Ambient temperature in celsius.
//! # TYPE govee_temperature_celsius gauge
//! govee_temperature_celsius{macaddress="A4:C1:38:1A:2B:3C",name="GVH5075_1A2B"} 22.5
//! ```
//!
//! Cada pull monta seu próprio [`Registry`]: nada de registry global.
//! Famílias sem amostras são omitidas pelo `gather`.

use govee_core::projector::{MetricKind, Sample};
use prometheus::{Encoder, Gauge, GaugeVec, Opts, Registry, TextEncoder};
use std::collections::BTreeMap;
use tracing::warn;

/// Labels variáveis de todos os gauges por dispositivo.
const DEVICE_LABELS: [&str; 2] = ["macaddress", "name"];

/// Informações de build exportadas como `<prefix>build_info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInfo {
    pub version: String,
    pub commit: String,
    pub date: String,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").into(),
            commit: option_env!("GOVEE_BUILD_COMMIT").unwrap_or("none").into(),
            date: option_env!("GOVEE_BUILD_DATE").unwrap_or("unknown").into(),
        }
    }
}

/// Content-Type da exposição texto.
pub fn content_type() -> String {
    TextEncoder::new().format_type().to_owned()
}

fn register_build_info(
    registry: &Registry,
    prefix: &str,
    build: &BuildInfo,
) -> prometheus::Result<()> {
    let opts = Opts::new(
        format!("{prefix}build_info"),
        "Contains build information as labels. Value set to 1.",
    )
    .const_label("version", build.version.as_str())
    .const_label("commit", build.commit.as_str())
    .const_label("date", build.date.as_str());
    let gauge = Gauge::with_opts(opts)?;
    gauge.set(1.0);
    registry.register(Box::new(gauge))
}

fn register_device_gauge(
    registry: &Registry,
    prefix: &str,
    kind: MetricKind,
) -> prometheus::Result<GaugeVec> {
    let gauge = GaugeVec::new(
        Opts::new(format!("{prefix}{}", kind.suffix()), kind.help()),
        &DEVICE_LABELS,
    )?;
    registry.register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

/// Gera o corpo de `/metrics`. Métricas que o cliente Prometheus recusa
/// são logadas e puladas; o resto do pull segue.
pub fn encode_text(prefix: &str, samples: &[Sample], build: &BuildInfo) -> String {
    let registry = Registry::new();

    if let Err(e) = register_build_info(&registry, prefix, build) {
        warn!("Não foi possível criar {prefix}build_info: {e}");
    }

    let mut gauges = BTreeMap::new();
    for kind in MetricKind::ALL {
        match register_device_gauge(&registry, prefix, kind) {
            Ok(gauge) => {
                gauges.insert(kind, gauge);
            }
            Err(e) => warn!("Não foi possível criar {prefix}{}: {e}", kind.suffix()),
        }
    }

    for sample in samples {
        let Some(gauge) = gauges.get(&sample.kind) else {
            continue;
        };
        let labels = [
            sample.labels.mac_address.as_str(),
            sample.labels.name.as_str(),
        ];
        match gauge.get_metric_with_label_values(&labels) {
            Ok(g) => g.set(sample.value),
            Err(e) => warn!("Não foi possível criar métrica de {}: {e}", sample.labels.name),
        }
    }

    let mut buffer = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&registry.gather(), &mut buffer) {
        warn!("Erro ao codificar métricas: {e}");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
