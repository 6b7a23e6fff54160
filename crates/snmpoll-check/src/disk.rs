//! Disk capacity check.
//!
//! Reports every configured mount with its usage percentage under a
//! `mounts` field. A mount seen on a previous run but absent from the
//! current walk is reported with a null value so the manager can observe
//! the removal.

use crate::{round1, Check, CheckError, HostContext};
use async_trait::async_trait;
use regex::{Regex, RegexSet};
use serde_json::{json, Value};
use snmpoll_common::config::{ConfigError, Layers};
use snmpoll_common::types::{ConfigMap, HostReport};
use snmpoll_probe::oids::disk as oids;
use snmpoll_probe::{Platform, ProbeError, ProbeSession};
use std::collections::{BTreeMap, HashMap};

/// Fallback warning capacity, in percent.
const DEFAULT_WARN_AT: f64 = 90.0;

/// Mounts skipped unless the node overrides the exclude list.
const DEFAULT_EXCLUDE: &[&str] = &[
    "^/dev(/.+)?$",
    "/dev$",
    "^/net(/.+)?$",
    "/proc$",
    "^/run$",
    "^/sys/",
    "/sys$",
];

/// hrFSAccess value for a read-only mount.
const ACCESS_READONLY: i64 = 2;

/// A capacity threshold: one number for every mount, or a per-path map
/// falling back to the mode default for unlisted paths.
#[derive(Debug, Clone)]
pub enum Threshold {
    Flat(f64),
    PerPath(HashMap<String, f64>),
}

impl Threshold {
    fn for_path(&self, path: &str, fallback: f64) -> f64 {
        match self {
            Self::Flat(value) => *value,
            Self::PerPath(map) => map.get(path).copied().unwrap_or(fallback),
        }
    }
}

/// Whether a read-only mount is an error, globally or per path.
#[derive(Debug, Clone)]
pub enum ReadonlyPolicy {
    Flat(bool),
    PerPath(HashMap<String, bool>),
}

impl ReadonlyPolicy {
    fn for_path(&self, path: &str) -> bool {
        match self {
            Self::Flat(value) => *value,
            Self::PerPath(map) => map.get(path).copied().unwrap_or(false),
        }
    }
}

/// Effective disk settings for one host.
#[derive(Debug, Clone)]
pub struct DiskSettings {
    pub warn_at: Threshold,
    pub warn_fallback: f64,
    pub alert_readonly: ReadonlyPolicy,
    pub include: Option<RegexSet>,
    pub exclude: RegexSet,
}

/// One row of the current mount table.
#[derive(Debug, Clone, PartialEq)]
pub struct MountStat {
    pub capacity: f64,
    pub access: Option<i64>,
}

pub type MountTable = BTreeMap<String, MountStat>;

pub struct DiskCheck {
    defaults: ConfigMap,
}

impl DiskCheck {
    /// `defaults` is the check-mode layer of the config resolution;
    /// recognized keys are `warn_at`, `alert_readonly`, `include`, and
    /// `exclude`.
    pub fn new(defaults: ConfigMap) -> Self {
        Self { defaults }
    }

    pub fn settings(&self, node: &ConfigMap) -> Result<DiskSettings, ConfigError> {
        let layers = Layers::new(vec![node, &self.defaults]);

        // The per-path form falls back to the mode-level flat number, so
        // resolve that first from the defaults layer alone.
        let mode = Layers::new(vec![&self.defaults]);
        let warn_fallback = match mode.get("warn_at") {
            Some(value) if value.is_f64() || value.is_i64() || value.is_u64() => {
                value.as_f64().unwrap_or(DEFAULT_WARN_AT)
            }
            _ => DEFAULT_WARN_AT,
        };

        let warn_at = match layers.get("warn_at") {
            None => Threshold::Flat(DEFAULT_WARN_AT),
            Some(Value::Object(map)) => {
                let mut per_path = HashMap::with_capacity(map.len());
                for (path, value) in map {
                    let pct = value.as_f64().ok_or_else(|| ConfigError::InvalidValue {
                        key: format!("warn_at.{path}"),
                        expected: "a number",
                    })?;
                    per_path.insert(path.clone(), pct);
                }
                Threshold::PerPath(per_path)
            }
            Some(value) => Threshold::Flat(value.as_f64().ok_or(ConfigError::InvalidValue {
                key: "warn_at".to_string(),
                expected: "a number or per-path map",
            })?),
        };

        let alert_readonly = match layers.get("alert_readonly") {
            None => ReadonlyPolicy::Flat(false),
            Some(Value::Bool(flag)) => ReadonlyPolicy::Flat(*flag),
            Some(Value::Object(map)) => {
                let mut per_path = HashMap::with_capacity(map.len());
                for (path, value) in map {
                    let flag = value.as_bool().ok_or_else(|| ConfigError::InvalidValue {
                        key: format!("alert_readonly.{path}"),
                        expected: "a boolean",
                    })?;
                    per_path.insert(path.clone(), flag);
                }
                ReadonlyPolicy::PerPath(per_path)
            }
            Some(_) => {
                return Err(ConfigError::InvalidValue {
                    key: "alert_readonly".to_string(),
                    expected: "a boolean or per-path map",
                })
            }
        };

        let include = match layers.get_str_list("include")? {
            Some(patterns) if !patterns.is_empty() => Some(compile("include", &patterns)?),
            _ => None,
        };
        let exclude = match layers.get_str_list("exclude")? {
            Some(patterns) => compile("exclude", &patterns)?,
            None => {
                let defaults: Vec<String> =
                    DEFAULT_EXCLUDE.iter().map(|s| s.to_string()).collect();
                compile("exclude", &defaults)?
            }
        };

        Ok(DiskSettings {
            warn_at,
            warn_fallback,
            alert_readonly,
            include,
            exclude,
        })
    }
}

/// Compile a pattern list, reporting the offending pattern on failure.
fn compile(key: &str, patterns: &[String]) -> Result<RegexSet, ConfigError> {
    for pattern in patterns {
        Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
            key: key.to_string(),
            pattern: pattern.clone(),
            source,
        })?;
    }
    RegexSet::new(patterns).map_err(|source| ConfigError::InvalidPattern {
        key: key.to_string(),
        pattern: patterns.join(", "),
        source,
    })
}

/// Walk the platform's storage table into a path -> usage map.
///
/// Parallel columns are index-aligned positionally; a row whose sibling
/// column is shorter or answers no-such-instance is skipped.
pub async fn collect(
    session: &mut dyn ProbeSession,
    platform: Platform,
) -> Result<MountTable, ProbeError> {
    match platform {
        Platform::Windows => windows_mounts(session).await,
        Platform::NetSnmp => net_snmp_mounts(session).await,
    }
}

async fn net_snmp_mounts(session: &mut dyn ProbeSession) -> Result<MountTable, ProbeError> {
    let paths = session.walk(oids::NET_SNMP_PATH).await?;
    let percents = session.walk(oids::NET_SNMP_PERCENT).await?;
    let accesses = session.walk(oids::NET_SNMP_ACCESS).await?;

    let mut mounts = MountTable::new();
    for (idx, path) in paths.iter().enumerate() {
        let Some(path) = path.as_text() else { continue };
        let Some(capacity) = percents.get(idx).and_then(|v| v.as_f64()) else {
            continue;
        };
        let access = accesses.get(idx).and_then(|v| v.as_i64());
        mounts.insert(path.to_string(), MountStat { capacity, access });
    }
    Ok(mounts)
}

async fn windows_mounts(session: &mut dyn ProbeSession) -> Result<MountTable, ProbeError> {
    let types = session.walk(oids::WINDOWS_TYPE).await?;
    let paths = session.walk(oids::WINDOWS_PATH).await?;
    let totals = session.walk(oids::WINDOWS_TOTAL).await?;
    let used = session.walk(oids::WINDOWS_USED).await?;

    let mut mounts = MountTable::new();
    for (idx, path) in paths.iter().enumerate() {
        let Some(path) = path.as_text() else { continue };
        let local = types
            .get(idx)
            .and_then(|v| v.as_text())
            .is_some_and(|oid| oids::WINDOWS_LOCAL_DEVICES.contains(&oid));
        if !local {
            continue;
        }
        let Some(total) = totals.get(idx).and_then(|v| v.as_f64()) else {
            continue;
        };
        if total == 0.0 {
            continue;
        }
        let Some(used) = used.get(idx).and_then(|v| v.as_f64()) else {
            continue;
        };
        mounts.insert(
            path.to_string(),
            MountStat {
                capacity: round1(used / total * 100.0),
                access: None,
            },
        );
    }
    Ok(mounts)
}

/// Pure threshold evaluation over the current mount table.
///
/// A mount at or above its warn threshold but below 100% is a warning;
/// at or above 100% it is an error. Read-only mounts are a separate error
/// when the policy asks for it, regardless of capacity.
pub fn evaluate(
    mounts: &MountTable,
    prior: Option<&ConfigMap>,
    settings: &DiskSettings,
) -> HostReport {
    let kept: Vec<(&String, &MountStat)> = mounts
        .iter()
        .filter(|(path, _)| {
            if settings.exclude.is_match(path) {
                return false;
            }
            match &settings.include {
                Some(include) => include.is_match(path),
                None => true,
            }
        })
        .collect();

    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    for (path, stat) in &kept {
        let warn = settings.warn_at.for_path(path, settings.warn_fallback);
        if stat.capacity >= warn {
            let line = format!("{} at {}% capacity", path, stat.capacity as i64);
            if stat.capacity >= 100.0 {
                errors.push(line);
            } else {
                warnings.push(line);
            }
        }
        if settings.alert_readonly.for_path(path) && stat.access == Some(ACCESS_READONLY) {
            errors.push(format!("{path} is mounted read-only."));
        }
    }

    // Previously reported mounts start out cleared; anything still present
    // in the current walk overwrites its entry.
    let mut reported = ConfigMap::new();
    if let Some(prior) = prior {
        for path in prior.keys() {
            reported.insert(path.clone(), Value::Null);
        }
    }
    for (path, stat) in &kept {
        reported.insert((*path).clone(), json!(stat.capacity));
    }

    let mut report = HostReport::new();
    report.set("mounts", Value::Object(reported));
    if !errors.is_empty() {
        report.error = Some(errors.join(", "));
    }
    if !warnings.is_empty() {
        report.warning = Some(warnings.join(", "));
    }
    report
}

#[async_trait]
impl Check for DiskCheck {
    fn name(&self) -> &'static str {
        "disk"
    }

    async fn poll(
        &self,
        session: &mut dyn ProbeSession,
        host: &HostContext<'_>,
    ) -> Result<HostReport, CheckError> {
        let settings = self.settings(host.config)?;
        let mounts = collect(session, host.platform).await?;
        tracing::debug!(host = host.address, mounts = mounts.len(), "collected mount table");
        Ok(evaluate(&mounts, host.prior_mounts, &settings))
    }
}
