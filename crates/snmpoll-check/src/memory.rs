//! Memory and swap utilization check.
//!
//! Reports `usage` (percent) and `available` for both physical memory and
//! swap. By default only swap usage warns, since that is the better
//! indicator of real pressure; set `physical_warn_at` to also warn on RAM
//! usage for hosts without virtual memory.

use crate::{round2, Check, CheckError, HostContext};
use async_trait::async_trait;
use serde_json::json;
use snmpoll_common::config::{ConfigError, Layers};
use snmpoll_common::types::{ConfigMap, HostReport};
use snmpoll_probe::oids::memory as oids;
use snmpoll_probe::oids::swap as swap_oids;
use snmpoll_probe::{Platform, ProbeError, ProbeSession};

const DEFAULT_SWAP_WARN_AT: f64 = 60.0;

#[derive(Debug, Clone)]
pub struct MemorySettings {
    /// Unset by default: memory usage alone is rarely actionable.
    pub physical_warn_at: Option<f64>,
    pub swap_warn_at: f64,
}

/// Usage percentage plus remaining amount for one memory pool.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoolUsage {
    pub usage: f64,
    pub available: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryInfo {
    pub memory: PoolUsage,
    pub swap: PoolUsage,
}

pub struct MemoryCheck {
    defaults: ConfigMap,
}

impl MemoryCheck {
    pub fn new(defaults: ConfigMap) -> Self {
        Self { defaults }
    }

    pub fn settings(&self, node: &ConfigMap) -> Result<MemorySettings, ConfigError> {
        let layers = Layers::new(vec![node, &self.defaults]);
        Ok(MemorySettings {
            physical_warn_at: layers.get_f64("physical_warn_at")?,
            swap_warn_at: layers
                .get_f64("swap_warn_at")?
                .unwrap_or(DEFAULT_SWAP_WARN_AT),
        })
    }
}

pub async fn collect(
    session: &mut dyn ProbeSession,
    platform: Platform,
) -> Result<MemoryInfo, ProbeError> {
    match platform {
        Platform::Windows => windows_memory(session).await,
        Platform::NetSnmp => Ok(MemoryInfo {
            memory: pool(session, oids::TOTAL, oids::AVAILABLE).await?,
            swap: pool(session, swap_oids::TOTAL, swap_oids::AVAILABLE).await?,
        }),
    }
}

/// UCD pools report total and available in KB; `available` comes back in
/// MB. A zero total (or a pool the agent reports as empty) yields a zero
/// record rather than a division fault.
async fn pool(
    session: &mut dyn ProbeSession,
    total_oid: &str,
    avail_oid: &str,
) -> Result<PoolUsage, ProbeError> {
    let avail = session.get(avail_oid).await?.as_f64().unwrap_or(0.0);
    let total = session.get(total_oid).await?.as_f64().unwrap_or(0.0);
    if total == 0.0 || avail == 0.0 {
        return Ok(PoolUsage::default());
    }
    let used = total - avail;
    Ok(PoolUsage {
        usage: round2(used / total * 100.0),
        available: round2(avail / 1024.0),
    })
}

/// Windows appends physical and virtual memory to the end of the storage
/// table. Walk the labels to find both row indices, then fetch each row's
/// units/total/used scalars by index suffix.
async fn windows_memory(session: &mut dyn ProbeSession) -> Result<MemoryInfo, ProbeError> {
    let labels = session.walk(oids::WINDOWS_LABEL).await?;

    let mut mem_idx = None;
    let mut swap_idx = None;
    for (i, label) in labels.iter().enumerate() {
        let Some(label) = label.as_text() else { continue };
        let lower = label.to_lowercase();
        if lower.contains("physical memory") {
            mem_idx = Some(i + 1);
        }
        if lower.contains("virtual memory") {
            swap_idx = Some(i + 1);
        }
    }
    let Some(mem_idx) = mem_idx else {
        return Ok(MemoryInfo::default());
    };

    Ok(MemoryInfo {
        memory: windows_pool(session, mem_idx).await?,
        swap: match swap_idx {
            Some(idx) => windows_pool(session, idx).await?,
            None => PoolUsage::default(),
        },
    })
}

async fn windows_pool(
    session: &mut dyn ProbeSession,
    idx: usize,
) -> Result<PoolUsage, ProbeError> {
    let units = session
        .get(&format!("{}.{idx}", oids::WINDOWS_UNITS))
        .await?
        .as_f64()
        .unwrap_or(0.0);
    let total = session
        .get(&format!("{}.{idx}", oids::WINDOWS_TOTAL))
        .await?
        .as_f64()
        .unwrap_or(0.0)
        * units;
    let used = session
        .get(&format!("{}.{idx}", oids::WINDOWS_USED))
        .await?
        .as_f64()
        .unwrap_or(0.0)
        * units;
    if total == 0.0 {
        return Ok(PoolUsage::default());
    }
    Ok(PoolUsage {
        usage: round2(used / total * 100.0),
        available: round2((total - used) / 1024.0 / 1024.0),
    })
}

pub fn evaluate(info: &MemoryInfo, settings: &MemorySettings) -> HostReport {
    let mut report = HostReport::new();
    report.set(
        "memory",
        json!({ "usage": info.memory.usage, "available": info.memory.available }),
    );
    report.set(
        "swap",
        json!({ "usage": info.swap.usage, "available": info.swap.available }),
    );

    let mut warnings = Vec::new();
    if let Some(warn_at) = settings.physical_warn_at {
        if info.memory.usage >= warn_at {
            warnings.push(format!(
                "{:.1} memory utilization exceeds {warn_at:.1} percent",
                info.memory.usage
            ));
        }
    }
    if info.swap.usage >= settings.swap_warn_at {
        warnings.push(format!(
            "{:.1} swap utilization exceeds {:.1} percent",
            info.swap.usage, settings.swap_warn_at
        ));
    }
    if !warnings.is_empty() {
        report.warning = Some(warnings.join(", "));
    }
    report
}

#[async_trait]
impl Check for MemoryCheck {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn poll(
        &self,
        session: &mut dyn ProbeSession,
        host: &HostContext<'_>,
    ) -> Result<HostReport, CheckError> {
        let settings = self.settings(host.config)?;
        let info = collect(session, host.platform).await?;
        Ok(evaluate(&info, &settings))
    }
}
