//! Bare 5-minute load check.
//!
//! Lighter sibling of the cpu mode for hosts where only the raw load
//! figure matters: reports `load5` and errors when it crosses the
//! configured ceiling.

use crate::{Check, CheckError, HostContext};
use async_trait::async_trait;
use serde_json::json;
use snmpoll_common::config::{ConfigError, Layers};
use snmpoll_common::types::{ConfigMap, HostReport};
use snmpoll_probe::oids::load as oids;
use snmpoll_probe::{ProbeError, ProbeSession};

const DEFAULT_ERROR_AT: f64 = 7.0;

#[derive(Debug, Clone)]
pub struct LoadSettings {
    pub error_at: f64,
}

pub struct LoadCheck {
    defaults: ConfigMap,
}

impl LoadCheck {
    pub fn new(defaults: ConfigMap) -> Self {
        Self { defaults }
    }

    pub fn settings(&self, node: &ConfigMap) -> Result<LoadSettings, ConfigError> {
        let layers = Layers::new(vec![node, &self.defaults]);
        Ok(LoadSettings {
            error_at: layers.get_f64("error_at")?.unwrap_or(DEFAULT_ERROR_AT),
        })
    }
}

pub async fn collect(session: &mut dyn ProbeSession) -> Result<f64, ProbeError> {
    let value = session.get(oids::FIVE_MINUTE).await?;
    Ok(value.as_f64().unwrap_or(0.0))
}

pub fn evaluate(load5: f64, settings: &LoadSettings) -> HostReport {
    let mut report = HostReport::new();
    report.set("load5", json!(load5));
    if load5 >= settings.error_at {
        report.error = Some(format!(
            "Load has exceeded {:.2} over a 5 minute average",
            settings.error_at
        ));
    }
    report
}

#[async_trait]
impl Check for LoadCheck {
    fn name(&self) -> &'static str {
        "load"
    }

    async fn poll(
        &self,
        session: &mut dyn ProbeSession,
        host: &HostContext<'_>,
    ) -> Result<HostReport, CheckError> {
        let settings = self.settings(host.config)?;
        let load5 = collect(session).await?;
        Ok(evaluate(load5, &settings))
    }
}
