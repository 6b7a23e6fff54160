//! UPS battery health check.
//!
//! Several independent sub-checks combine into one warning list: whether
//! the UPS is running on battery, a non-nominal status code, remaining
//! capacity below threshold, and temperature above threshold. Any subset
//! can fire at once; all firing messages are reported together.

use crate::{Check, CheckError, HostContext};
use async_trait::async_trait;
use serde_json::json;
use snmpoll_common::config::{ConfigError, Layers};
use snmpoll_common::types::{ConfigMap, HostReport};
use snmpoll_probe::oids::battery as oids;
use snmpoll_probe::{ProbeError, ProbeSession, ProbeValue};

const DEFAULT_CAPACITY_WARN_AT: f64 = 60.0;
const DEFAULT_TEMPERATURE_WARN_AT: f64 = 50.0;

/// upsBatteryStatus value for a healthy battery.
const STATUS_NORMAL: i64 = 2;

fn status_text(status: i64) -> &'static str {
    match status {
        2 => "Battery is OK.",
        3 => "Battery is Low.",
        4 => "Battery is Depleted.",
        _ => "Battery status is Unknown.",
    }
}

#[derive(Debug, Clone)]
pub struct BatterySettings {
    pub capacity_warn_at: f64,
    pub temperature_warn_at: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatteryInfo {
    pub status: i64,
    pub capacity: f64,
    pub temperature: f64,
    pub minutes_remaining: i64,
    pub seconds_on_battery: i64,
    pub in_use: bool,
    /// Omitted when the UPS does not expose them.
    pub voltage: Option<f64>,
    pub current: Option<f64>,
}

pub struct BatteryCheck {
    defaults: ConfigMap,
}

impl BatteryCheck {
    pub fn new(defaults: ConfigMap) -> Self {
        Self { defaults }
    }

    pub fn settings(&self, node: &ConfigMap) -> Result<BatterySettings, ConfigError> {
        let layers = Layers::new(vec![node, &self.defaults]);
        Ok(BatterySettings {
            capacity_warn_at: layers
                .get_f64("capacity_warn_at")?
                .unwrap_or(DEFAULT_CAPACITY_WARN_AT),
            temperature_warn_at: layers
                .get_f64("temperature_warn_at")?
                .unwrap_or(DEFAULT_TEMPERATURE_WARN_AT),
        })
    }
}

/// A scalar the device may legitimately not expose: absence is `None`,
/// transport failures still propagate.
async fn optional_scalar(
    session: &mut dyn ProbeSession,
    oid: &str,
) -> Result<Option<ProbeValue>, ProbeError> {
    match session.get(oid).await {
        Ok(value) if value.is_missing() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(ProbeError::NoSuchObject(_)) => Ok(None),
        Err(err) => Err(err),
    }
}

pub async fn collect(session: &mut dyn ProbeSession) -> Result<BatteryInfo, ProbeError> {
    let status = session.get(oids::STATUS).await?.as_i64().unwrap_or(1);
    let capacity = session
        .get(oids::EST_CHARGE_REMAINING)
        .await?
        .as_f64()
        .unwrap_or(0.0);
    let temperature = session
        .get(oids::TEMPERATURE)
        .await?
        .as_f64()
        .unwrap_or(0.0);
    let minutes_remaining = session
        .get(oids::EST_MINUTES_REMAINING)
        .await?
        .as_i64()
        .unwrap_or(0);

    let voltage = optional_scalar(session, oids::VOLTAGE)
        .await?
        .and_then(|v| v.as_f64())
        .map(|v| v / 10.0);
    let current = optional_scalar(session, oids::CURRENT)
        .await?
        .and_then(|v| v.as_f64())
        .map(|v| v / 10.0);

    let seconds_on_battery = optional_scalar(session, oids::SECONDS_ON_BATTERY)
        .await?
        .and_then(|v| v.as_i64())
        .unwrap_or(0);

    Ok(BatteryInfo {
        status,
        capacity,
        temperature,
        minutes_remaining,
        seconds_on_battery,
        in_use: seconds_on_battery != 0,
        voltage,
        current,
    })
}

pub fn evaluate(info: &BatteryInfo, settings: &BatterySettings) -> HostReport {
    let mut warnings = Vec::new();

    if info.in_use {
        warnings.push(format!(
            "UPS on battery - {} minute(s) remaining.",
            info.minutes_remaining
        ));
    }
    if info.status != STATUS_NORMAL {
        warnings.push(status_text(info.status).to_string());
    }
    if info.capacity <= settings.capacity_warn_at {
        warnings.push(format!(
            "Battery remaining capacity {:.1}% less than {:.1} percent",
            info.capacity, settings.capacity_warn_at
        ));
    }
    if info.temperature >= settings.temperature_warn_at {
        warnings.push(format!(
            "Battery temperature {}C greater than {}C",
            info.temperature as i64, settings.temperature_warn_at as i64
        ));
    }

    let mut battery = serde_json::Map::new();
    battery.insert("status".to_string(), json!(info.status));
    battery.insert("capacity".to_string(), json!(info.capacity));
    battery.insert("temperature".to_string(), json!(info.temperature));
    battery.insert(
        "minutes_remaining".to_string(),
        json!(info.minutes_remaining),
    );
    battery.insert(
        "seconds_on_battery".to_string(),
        json!(info.seconds_on_battery),
    );
    battery.insert("in_use".to_string(), json!(info.in_use));
    if let Some(voltage) = info.voltage {
        battery.insert("voltage".to_string(), json!(voltage));
    }
    if let Some(current) = info.current {
        battery.insert("current".to_string(), json!(current));
    }

    let mut report = HostReport::new();
    report.set("battery", serde_json::Value::Object(battery));
    if !warnings.is_empty() {
        report.warning = Some(warnings.join("\n"));
    }
    report
}

#[async_trait]
impl Check for BatteryCheck {
    fn name(&self) -> &'static str {
        "battery"
    }

    async fn poll(
        &self,
        session: &mut dyn ProbeSession,
        host: &HostContext<'_>,
    ) -> Result<HostReport, CheckError> {
        let settings = self.settings(host.config)?;
        let info = collect(session).await?;
        Ok(evaluate(&info, &settings))
    }
}
