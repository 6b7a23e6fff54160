//! Running-process presence check.
//!
//! Builds the list of userland process command lines (binary plus
//! arguments) and requires at least one match for every configured
//! pattern. Patterns are regular expressions, compiled at settings
//! resolution so a bad pattern fails before any polling happens.

use crate::{Check, CheckError, HostContext};
use async_trait::async_trait;
use regex::Regex;
use serde_json::json;
use snmpoll_common::config::{ConfigError, Layers};
use snmpoll_common::types::{ConfigMap, HostReport};
use snmpoll_probe::oids::process as oids;
use snmpoll_probe::{Platform, ProbeError, ProbeSession};

/// One configured pattern with its original source text, kept for the
/// error message.
#[derive(Debug, Clone)]
pub struct ProcessPattern {
    pub source: String,
    pub regex: Regex,
}

#[derive(Debug, Clone, Default)]
pub struct ProcessSettings {
    pub patterns: Vec<ProcessPattern>,
}

pub struct ProcessCheck {
    defaults: ConfigMap,
}

impl ProcessCheck {
    pub fn new(defaults: ConfigMap) -> Self {
        Self { defaults }
    }

    pub fn settings(&self, node: &ConfigMap) -> Result<ProcessSettings, ConfigError> {
        let layers = Layers::new(vec![node, &self.defaults]);
        let sources = layers.get_str_list("processes")?.unwrap_or_default();

        let mut patterns = Vec::with_capacity(sources.len());
        for source in sources {
            let regex = Regex::new(&source).map_err(|err| ConfigError::InvalidPattern {
                key: "processes".to_string(),
                pattern: source.clone(),
                source: err,
            })?;
            patterns.push(ProcessPattern { source, regex });
        }
        Ok(ProcessSettings { patterns })
    }
}

/// Walk the platform's process table into full command lines. Rows with
/// an empty binary path are kernel threads and are skipped.
pub async fn collect(
    session: &mut dyn ProbeSession,
    platform: Platform,
) -> Result<Vec<String>, ProbeError> {
    match platform {
        Platform::Windows => windows_processes(session).await,
        Platform::NetSnmp => net_snmp_processes(session).await,
    }
}

async fn net_snmp_processes(session: &mut dyn ProbeSession) -> Result<Vec<String>, ProbeError> {
    let paths = session.walk(oids::NET_SNMP_LIST).await?;
    let args = session.walk(oids::NET_SNMP_ARGS).await?;

    let mut processes = Vec::new();
    for (idx, path) in paths.iter().enumerate() {
        let Some(path) = path.as_text() else { continue };
        if path.is_empty() {
            continue;
        }
        let mut line = path.to_string();
        if let Some(arg) = args.get(idx).and_then(|v| v.as_text()) {
            if !arg.is_empty() {
                line.push(' ');
                line.push_str(arg);
            }
        }
        processes.push(line);
    }
    Ok(processes)
}

async fn windows_processes(session: &mut dyn ProbeSession) -> Result<Vec<String>, ProbeError> {
    let names = session.walk(oids::WINDOWS_LIST).await?;
    let paths = session.walk(oids::WINDOWS_PATH).await?;
    let args = session.walk(oids::WINDOWS_ARGS).await?;

    let mut processes = Vec::new();
    for (idx, path) in paths.iter().enumerate() {
        let Some(path) = path.as_text() else { continue };
        if path.is_empty() {
            continue;
        }
        let name = names.get(idx).and_then(|v| v.as_text()).unwrap_or("");
        let mut line = format!("{path}{name}");
        if let Some(arg) = args.get(idx).and_then(|v| v.as_text()) {
            if !arg.is_empty() {
                line.push(' ');
                line.push_str(arg);
            }
        }
        processes.push(line);
    }
    Ok(processes)
}

/// Every pattern with no matching command line contributes one error
/// line; the running-process count is always reported.
pub fn evaluate(processes: &[String], settings: &ProcessSettings) -> HostReport {
    let mut report = HostReport::new();
    report.set("count", json!(processes.len()));

    let mut errors = Vec::new();
    for pattern in &settings.patterns {
        let found = processes.iter().any(|line| pattern.regex.is_match(line));
        if !found {
            errors.push(format!("'{}' is not running", pattern.source));
        }
    }
    if !errors.is_empty() {
        report.error = Some(errors.join(", "));
    }
    report
}

#[async_trait]
impl Check for ProcessCheck {
    fn name(&self) -> &'static str {
        "process"
    }

    async fn poll(
        &self,
        session: &mut dyn ProbeSession,
        host: &HostContext<'_>,
    ) -> Result<HostReport, CheckError> {
        let settings = self.settings(host.config)?;
        let processes = collect(session, host.platform).await?;
        tracing::debug!(
            host = host.address,
            count = processes.len(),
            "collected process table"
        );
        Ok(evaluate(&processes, &settings))
    }
}
