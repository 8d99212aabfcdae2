//! Projeção do snapshot do store em amostras de métricas.
//!
//! Para cada sensor configurado:
//! 1. Sem leitura → só `up = 0`
//! 2. Com leitura → `up = 1` e `updated_timestamp`
//! 3. Leitura fresca (ou política [`FreshnessPolicy::AlwaysReport`]) →
//!    também `battery_percent`, `temperature_celsius`, `humidity_percent`
//!
//! Leituras velhas escondem as métricas de valor em vez de anotá-las;
//! `up` continua 1 enquanto existir qualquer leitura.

use crate::store::Snapshot;
use crate::types::{DeviceIdentity, Reading};
use std::time::{Duration, SystemTime};
use tracing::debug;

/// Gauges exportados por dispositivo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetricKind {
    Up,
    UpdatedTimestamp,
    BatteryPercent,
    TemperatureCelsius,
    HumidityPercent,
}

impl MetricKind {
    /// Ordem de exposição.
    pub const ALL: [MetricKind; 5] = [
        MetricKind::Up,
        MetricKind::UpdatedTimestamp,
        MetricKind::BatteryPercent,
        MetricKind::TemperatureCelsius,
        MetricKind::HumidityPercent,
    ];

    /// Nome sem prefixo.
    pub fn suffix(self) -> &'static str {
        match self {
            MetricKind::Up => "up",
            MetricKind::UpdatedTimestamp => "updated_timestamp",
            MetricKind::BatteryPercent => "battery_percent",
            MetricKind::TemperatureCelsius => "temperature_celsius",
            MetricKind::HumidityPercent => "humidity_percent",
        }
    }

    pub fn help(self) -> &'static str {
        match self {
            MetricKind::Up => "Shows if data could be successfully retrieved by the collector.",
            MetricKind::UpdatedTimestamp => {
                "Contains the timestamp when the last communication with the Bluetooth device happened."
            }
            MetricKind::BatteryPercent => "Battery level in percent.",
            MetricKind::TemperatureCelsius => "Ambient temperature in celsius.",
            MetricKind::HumidityPercent => "Ambient humidity in percent.",
        }
    }
}

/// Política de frescor aplicada a cada pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreshnessPolicy {
    /// Esconde temperatura/umidade/bateria quando `idade >= stale_after`.
    SuppressStale { stale_after: Duration },
    /// Reporta toda leitura armazenada, sem checar idade.
    AlwaysReport,
}

impl FreshnessPolicy {
    pub fn is_stale(&self, age: Duration) -> bool {
        match *self {
            FreshnessPolicy::SuppressStale { stale_after } => age >= stale_after,
            FreshnessPolicy::AlwaysReport => false,
        }
    }
}

/// Labels `macaddress` e `name` de um sensor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceLabels {
    pub mac_address: String,
    pub name: String,
}

/// Sensor conhecido: chave no store + labels expostos.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub identity: DeviceIdentity,
    pub labels: DeviceLabels,
}

/// Uma amostra de gauge pronta para exposição.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub kind: MetricKind,
    pub labels: DeviceLabels,
    pub value: f64,
}

/// Projeção pura sobre (snapshot, relógio, política).
#[derive(Debug, Clone)]
pub struct MetricsProjector {
    targets: Vec<Target>,
    policy: FreshnessPolicy,
}

impl MetricsProjector {
    pub fn new(targets: Vec<Target>, policy: FreshnessPolicy) -> Self {
        Self { targets, policy }
    }

    /// Gera as amostras de um pull, na ordem dos sensores configurados.
    pub fn project(&self, snapshot: &Snapshot, now: SystemTime) -> Vec<Sample> {
        let mut samples = Vec::with_capacity(self.targets.len() * MetricKind::ALL.len());
        for target in &self.targets {
            self.project_target(&mut samples, target, snapshot.get(&target.identity), now);
        }
        samples
    }

    fn project_target(
        &self,
        out: &mut Vec<Sample>,
        target: &Target,
        reading: Option<&Reading>,
        now: SystemTime,
    ) {
        let mut emit = |kind: MetricKind, value: f64| {
            out.push(Sample {
                kind,
                labels: target.labels.clone(),
                value,
            });
        };

        let Some(reading) = reading else {
            emit(MetricKind::Up, 0.0);
            return;
        };

        emit(MetricKind::Up, 1.0);
        emit(MetricKind::UpdatedTimestamp, reading.received_unix_secs() as f64);

        // Relógio voltando no tempo conta como leitura recém-chegada
        let age = now.duration_since(reading.received_at).unwrap_or_default();
        if self.policy.is_stale(age) {
            debug!(
                "Dados de {} estão velhos: {:?} >= {:?}",
                target.identity, age, self.policy
            );
            return;
        }

        emit(MetricKind::BatteryPercent, f64::from(reading.battery));
        emit(MetricKind::TemperatureCelsius, reading.temperature);
        emit(MetricKind::HumidityPercent, reading.humidity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::UNIX_EPOCH;

    const STALE: Duration = Duration::from_secs(300);

    fn target(name: &str) -> Target {
        Target {
            identity: DeviceIdentity::new(name).unwrap(),
            labels: DeviceLabels {
                mac_address: "A4:C1:38:00:00:01".into(),
                name: name.into(),
            },
        }
    }

    fn reading_at(secs: u64) -> Reading {
        Reading {
            temperature: -3.2,
            humidity: 71.5,
            battery: 64,
            received_at: UNIX_EPOCH + Duration::from_secs(secs),
        }
    }

    fn snapshot_with(name: &str, reading: Reading) -> Snapshot {
        let mut snap = Snapshot::new();
        snap.insert(DeviceIdentity::new(name).unwrap(), reading);
        snap
    }

    fn kinds(samples: &[Sample]) -> Vec<MetricKind> {
        samples.iter().map(|s| s.kind).collect()
    }

    fn now_plus(base: u64, age: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(base + age)
    }

    #[test]
    fn unknown_device_only_reports_down() {
        let projector = MetricsProjector::new(
            vec![target("GVH5075_0001")],
            FreshnessPolicy::SuppressStale { stale_after: STALE },
        );
        let samples = projector.project(&Snapshot::new(), now_plus(1000, 0));
        assert_eq!(kinds(&samples), vec![MetricKind::Up]);
        assert_eq!(samples[0].value, 0.0);
        assert_eq!(samples[0].labels.name, "GVH5075_0001");
    }

    #[test]
    fn fresh_reading_reports_everything() {
        let projector = MetricsProjector::new(
            vec![target("GV1")],
            FreshnessPolicy::SuppressStale { stale_after: STALE },
        );
        let snap = snapshot_with("GV1", reading_at(1000));
        let samples = projector.project(&snap, now_plus(1000, 299));

        assert_eq!(kinds(&samples), MetricKind::ALL.to_vec());
        let values: Vec<f64> = samples.iter().map(|s| s.value).collect();
        assert_eq!(values, vec![1.0, 1000.0, 64.0, -3.2, 71.5]);
    }

    #[test]
    fn stale_reading_hides_values_but_stays_up() {
        let projector = MetricsProjector::new(
            vec![target("GV1")],
            FreshnessPolicy::SuppressStale { stale_after: STALE },
        );
        let snap = snapshot_with("GV1", reading_at(1000));

        for age in [300, 301, 86_400] {
            let samples = projector.project(&snap, now_plus(1000, age));
            assert_eq!(
                kinds(&samples),
                vec![MetricKind::Up, MetricKind::UpdatedTimestamp],
                "idade {age}s"
            );
            assert_eq!(samples[0].value, 1.0);
            assert_eq!(samples[1].value, 1000.0);
        }
    }

    #[test]
    fn always_report_ignores_age() {
        let projector = MetricsProjector::new(vec![target("GV1")], FreshnessPolicy::AlwaysReport);
        let snap = snapshot_with("GV1", reading_at(1000));
        let samples = projector.project(&snap, now_plus(1000, 86_400 * 30));
        assert_eq!(kinds(&samples), MetricKind::ALL.to_vec());
    }

    #[test]
    fn reading_from_the_future_counts_as_fresh() {
        let projector = MetricsProjector::new(
            vec![target("GV1")],
            FreshnessPolicy::SuppressStale { stale_after: STALE },
        );
        let snap = snapshot_with("GV1", reading_at(5000));
        let samples = projector.project(&snap, now_plus(1000, 0));
        assert_eq!(samples.len(), 5);
    }

    #[test]
    fn unconfigured_devices_are_not_projected() {
        let projector = MetricsProjector::new(
            vec![target("GV1"), target("GV2")],
            FreshnessPolicy::SuppressStale { stale_after: STALE },
        );
        let mut snap = snapshot_with("GV2", reading_at(1000));
        snap.insert(DeviceIdentity::new("GV9").unwrap(), reading_at(1000));

        let samples = projector.project(&snap, now_plus(1000, 10));
        let names: Vec<&str> = samples.iter().map(|s| s.labels.name.as_str()).collect();
        assert_eq!(names, vec!["GV1", "GV2", "GV2", "GV2", "GV2", "GV2"]);
        assert_eq!(samples[0].value, 0.0);
    }

    #[test]
    fn zero_threshold_makes_everything_stale() {
        let policy = FreshnessPolicy::SuppressStale {
            stale_after: Duration::ZERO,
        };
        assert!(policy.is_stale(Duration::ZERO));
        assert!(!FreshnessPolicy::AlwaysReport.is_stale(Duration::MAX));
    }
}
