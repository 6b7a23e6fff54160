//! Swap-in-use check.
//!
//! Reports the percentage of swap currently in use as `swap_in_use` and
//! errors when it crosses the configured ceiling.

use crate::{Check, CheckError, HostContext};
use async_trait::async_trait;
use serde_json::json;
use snmpoll_common::config::{ConfigError, Layers};
use snmpoll_common::types::{ConfigMap, HostReport};
use snmpoll_probe::oids::swap as oids;
use snmpoll_probe::{ProbeError, ProbeSession};

const DEFAULT_ERROR_AT: f64 = 95.0;

#[derive(Debug, Clone)]
pub struct SwapSettings {
    pub error_at: f64,
}

pub struct SwapCheck {
    defaults: ConfigMap,
}

impl SwapCheck {
    pub fn new(defaults: ConfigMap) -> Self {
        Self { defaults }
    }

    pub fn settings(&self, node: &ConfigMap) -> Result<SwapSettings, ConfigError> {
        let layers = Layers::new(vec![node, &self.defaults]);
        Ok(SwapSettings {
            error_at: layers.get_f64("error_at")?.unwrap_or(DEFAULT_ERROR_AT),
        })
    }
}

/// Percentage of swap in use. A host with no swap configured reports zero
/// rather than a division fault.
pub async fn collect(session: &mut dyn ProbeSession) -> Result<f64, ProbeError> {
    let total = session.get(oids::TOTAL).await?.as_f64().unwrap_or(0.0);
    let avail = session.get(oids::AVAILABLE).await?.as_f64().unwrap_or(0.0);
    if total == 0.0 {
        return Ok(0.0);
    }
    Ok(((avail / total * 100.0) - 100.0).abs())
}

pub fn evaluate(swap_in_use: f64, settings: &SwapSettings) -> HostReport {
    let mut report = HostReport::new();
    report.set("swap_in_use", json!(swap_in_use));
    if swap_in_use >= settings.error_at {
        report.error = Some(format!("{swap_in_use:.1}% swap in use"));
    }
    report
}

#[async_trait]
impl Check for SwapCheck {
    fn name(&self) -> &'static str {
        "swap"
    }

    async fn poll(
        &self,
        session: &mut dyn ProbeSession,
        host: &HostContext<'_>,
    ) -> Result<HostReport, CheckError> {
        let settings = self.settings(host.config)?;
        let swap_in_use = collect(session).await?;
        Ok(evaluate(swap_in_use, &settings))
    }
}
