//! CPU utilization check.
//!
//! Two algorithms, chosen by device family. The Windows family has no
//! load-average concept, so the check reports the mean of the per-core
//! instantaneous utilization. Everyone else uses the 5-minute load
//! average divided by core count, expressed as an overload (or idle)
//! percentage; the 5-minute figure avoids verdict flapping on transient
//! spikes.

use crate::{round1, Check, CheckError, HostContext};
use async_trait::async_trait;
use serde_json::json;
use snmpoll_common::config::{ConfigError, Layers};
use snmpoll_common::types::{ConfigMap, HostReport};
use snmpoll_probe::oids::cpu as oids;
use snmpoll_probe::{Platform, ProbeError, ProbeSession};

const DEFAULT_WARN_AT: f64 = 80.0;

#[derive(Debug, Clone)]
pub struct CpuSettings {
    pub warn_at: f64,
}

/// Raw sample shaped by the collector, evaluated without further I/O.
#[derive(Debug, Clone, PartialEq)]
pub enum CpuSample {
    /// Windows family: one instantaneous utilization value per core.
    Utilization { loads: Vec<f64> },
    /// net-snmp family: load averages plus the core count.
    LoadAverage {
        count: usize,
        load1: f64,
        load5: f64,
        load15: f64,
    },
}

pub struct CpuCheck {
    defaults: ConfigMap,
}

impl CpuCheck {
    pub fn new(defaults: ConfigMap) -> Self {
        Self { defaults }
    }

    pub fn settings(&self, node: &ConfigMap) -> Result<CpuSettings, ConfigError> {
        let layers = Layers::new(vec![node, &self.defaults]);
        Ok(CpuSettings {
            warn_at: layers.get_f64("warn_at")?.unwrap_or(DEFAULT_WARN_AT),
        })
    }
}

pub async fn collect(
    session: &mut dyn ProbeSession,
    platform: Platform,
) -> Result<CpuSample, ProbeError> {
    let cores = session.walk(oids::PROCESSOR_LOAD).await?;
    match platform {
        Platform::Windows => Ok(CpuSample::Utilization {
            loads: cores.iter().filter_map(|v| v.as_f64()).collect(),
        }),
        Platform::NetSnmp => {
            // laLoad rows 1..=3 are the 1, 5, and 15 minute averages.
            let averages = session.walk(oids::LOAD).await?;
            let avg = |idx: usize| averages.get(idx).and_then(|v| v.as_f64()).unwrap_or(0.0);
            Ok(CpuSample::LoadAverage {
                count: cores.len(),
                load1: avg(0),
                load5: avg(1),
                load15: avg(2),
            })
        }
    }
}

/// Derive the usage figure and verdict from a sample.
pub fn evaluate(sample: &CpuSample, settings: &CpuSettings) -> HostReport {
    let mut report = HostReport::new();

    let usage = match sample {
        CpuSample::Utilization { loads } => {
            let count = loads.len();
            let usage = if count == 0 {
                0.0
            } else {
                loads.iter().sum::<f64>() / count as f64
            };
            report.set("cpu", json!({ "count": count, "usage": usage }));
            report.set("message", json!(format!("System is {usage:.1}% in use.")));
            usage
        }
        CpuSample::LoadAverage {
            count,
            load1,
            load5,
            load15,
        } => {
            let cores = (*count).max(1) as f64;
            let percentage = round1(((load5 / cores) - 1.0) * 100.0);
            let usage = if percentage < 0.0 {
                report.set(
                    "message",
                    json!(format!("System is {:.1}% idle.", percentage.abs())),
                );
                percentage + 100.0
            } else {
                report.set(
                    "message",
                    json!(format!("System is {percentage:.1}% overloaded.")),
                );
                percentage
            };
            report.set("cpu", json!({ "count": count, "usage": usage }));
            report.set(
                "load",
                json!({ "load1": load1, "load5": load5, "load15": load15 }),
            );
            usage
        }
    };

    if usage >= settings.warn_at {
        report.warning = Some(format!(
            "{usage:.1} utilization exceeds {:.1} percent",
            settings.warn_at
        ));
    }
    report
}

#[async_trait]
impl Check for CpuCheck {
    fn name(&self) -> &'static str {
        "cpu"
    }

    async fn poll(
        &self,
        session: &mut dyn ProbeSession,
        host: &HostContext<'_>,
    ) -> Result<HostReport, CheckError> {
        let settings = self.settings(host.config)?;
        let sample = collect(session, host.platform).await?;
        Ok(evaluate(&sample, &settings))
    }
}
