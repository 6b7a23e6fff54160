//! Per-mode health checks for the snmpoll engine.
//!
//! Each check mode implements [`Check`]: resolve effective settings for
//! the host, collect the relevant OIDs into a normalized metric record,
//! and run a pure threshold evaluation that yields a [`HostReport`].
//! The batching, connection, and failure-isolation logic lives once in
//! the engine crate; modes are instantiations of this one interface.

pub mod battery;
pub mod cpu;
pub mod disk;
pub mod load;
pub mod memory;
pub mod process;
pub mod swap;

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use snmpoll_common::config::ConfigError;
use snmpoll_common::types::{ConfigMap, HostReport};
use snmpoll_probe::{Platform, ProbeError, ProbeSession};

/// Anything that can go wrong while checking a single host. All variants
/// are caught at the worker boundary and rendered into the host's `error`
/// string; none abort the batch or the run.
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Probe(#[from] ProbeError),

    /// An unexpected fault while shaping or thresholding a metric.
    #[error("evaluation fault: {0}")]
    Evaluation(String),
}

/// Per-host inputs handed to a check by the dispatcher.
pub struct HostContext<'a> {
    pub address: &'a str,
    /// Device family, probed once at session open and threaded through
    /// explicitly.
    pub platform: Platform,
    /// The node's own override config, narrowest resolution layer.
    pub config: &'a ConfigMap,
    /// Mounts reported for this node on a previous disk run, if any.
    pub prior_mounts: Option<&'a ConfigMap>,
}

/// One check mode: collect metrics over an open session and evaluate them
/// against the host's effective thresholds.
#[async_trait]
pub trait Check: Send + Sync {
    /// Mode name used for logging (e.g. `"disk"`, `"cpu"`).
    fn name(&self) -> &'static str;

    /// Poll one host. The session is already open and platform-classified;
    /// the dispatcher closes it afterwards on every exit path.
    async fn poll(
        &self,
        session: &mut dyn ProbeSession,
        host: &HostContext<'_>,
    ) -> Result<HostReport, CheckError>;
}

pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
