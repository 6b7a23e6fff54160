//! Batched host polling engine.
//!
//! [`Poller::run`] takes one check mode and a set of nodes from the
//! monitoring manager and polls every addressable node: hosts are split
//! into fixed-size batches, batches run strictly one after another, and
//! hosts inside a batch run in parallel on spawned tasks. Any failure is
//! confined to its host and rendered into that host's `error` string;
//! nothing aborts the batch or the run. Results come back keyed by node
//! identifier rather than by address.


use snmpoll_check::{Check, CheckError, HostContext};
use snmpoll_common::config::{ConfigError, Layers};
use snmpoll_common::types::{ConfigMap, HostReport, NodeSpec};
use snmpoll_probe::{oids, ConnectionSettings, Platform, SessionFactory};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

const DEFAULT_BATCH_SIZE: usize = 25;

/// Process-wide polling defaults. Connection values can be overridden per
/// node through its config map; `batch_size` is global only.
#[derive(Debug, Clone)]
pub struct PollerSettings {
    pub port: u16,
    pub community: String,
    pub version: String,
    pub timeout: Duration,
    pub retries: u32,
    pub batch_size: usize,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            port: 161,
            community: "public".to_string(),
            version: "2c".to_string(),
            timeout: Duration::from_secs(2),
            retries: 1,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl PollerSettings {
    /// Settings with a global config layer applied over the built-ins.
    pub fn from_config(global: &ConfigMap) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let layers = Layers::new(vec![global]);
        Ok(Self {
            port: match layers.get_u64("port")? {
                Some(value) => port_from(value)?,
                None => defaults.port,
            },
            community: layers
                .get_str("community")?
                .map(str::to_string)
                .unwrap_or(defaults.community),
            version: layers
                .get_str("version")?
                .map(str::to_string)
                .unwrap_or(defaults.version),
            timeout: match layers.get_f64("timeout")? {
                Some(value) => timeout_from(value)?,
                None => defaults.timeout,
            },
            retries: match layers.get_u64("retries")? {
                Some(value) => retries_from(value)?,
                None => defaults.retries,
            },
            batch_size: match layers.get_u64("batch_size")? {
                Some(0) => {
                    return Err(ConfigError::InvalidValue {
                        key: "batch_size".to_string(),
                        expected: "a positive integer",
                    })
                }
                Some(value) => value as usize,
                None => defaults.batch_size,
            },
        })
    }

    /// Resolve the connection settings for one host, node config first.
    fn connection(&self, host: &str, node: &ConfigMap) -> Result<ConnectionSettings, ConfigError> {
        let layers = Layers::new(vec![node]);
        Ok(ConnectionSettings {
            host: host.to_string(),
            port: match layers.get_u64("port")? {
                Some(value) => port_from(value)?,
                None => self.port,
            },
            community: layers
                .get_str("community")?
                .map(str::to_string)
                .unwrap_or_else(|| self.community.clone()),
            version: layers
                .get_str("version")?
                .map(str::to_string)
                .unwrap_or_else(|| self.version.clone()),
            timeout: match layers.get_f64("timeout")? {
                Some(value) => timeout_from(value)?,
                None => self.timeout,
            },
            retries: match layers.get_u64("retries")? {
                Some(value) => retries_from(value)?,
                None => self.retries,
            },
        })
    }
}

fn port_from(value: u64) -> Result<u16, ConfigError> {
    u16::try_from(value).map_err(|_| ConfigError::InvalidValue {
        key: "port".to_string(),
        expected: "a port number",
    })
}

fn retries_from(value: u64) -> Result<u32, ConfigError> {
    u32::try_from(value).map_err(|_| ConfigError::InvalidValue {
        key: "retries".to_string(),
        expected: "a small non-negative integer",
    })
}

fn timeout_from(value: f64) -> Result<Duration, ConfigError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ConfigError::InvalidValue {
            key: "timeout".to_string(),
            expected: "a positive number of seconds",
        });
    }
    Ok(Duration::from_secs_f64(value))
}

/// One node flattened for a worker task: identifier for the result map,
/// first address for the connection, plus its config layer.
struct HostJob {
    identifier: String,
    address: String,
    config: ConfigMap,
    mounts: Option<ConfigMap>,
}

/// A host whose poll is either running on a task or already settled
/// (connection resolution failed before any network traffic).
enum Pending {
    Spawned(tokio::task::JoinHandle<HostReport>),
    Ready(HostReport),
}

pub struct Poller {
    net: Arc<dyn SessionFactory>,
    settings: PollerSettings,
}

impl Poller {
    pub fn new(net: Arc<dyn SessionFactory>, settings: PollerSettings) -> Self {
        Self { net, settings }
    }

    /// Poll every addressable node with one check mode.
    ///
    /// Nodes without an address are skipped. The returned map is keyed by
    /// node identifier; every polled node has an entry, failed hosts carry
    /// an error report.
    pub async fn run(
        &self,
        check: Arc<dyn Check>,
        nodes: &HashMap<String, NodeSpec>,
    ) -> HashMap<String, HostReport> {
        let jobs: Vec<HostJob> = nodes
            .iter()
            .filter_map(|(identifier, node)| {
                let address = node.address()?;
                Some(HostJob {
                    identifier: identifier.clone(),
                    address: address.to_string(),
                    config: node.config.clone(),
                    mounts: node.mounts.clone(),
                })
            })
            .collect();

        let batch_size = self.settings.batch_size.max(1);
        let started = Instant::now();
        tracing::debug!(
            check = check.name(),
            hosts = jobs.len(),
            batch_size,
            "starting poll run"
        );

        let mut results = HashMap::with_capacity(jobs.len());
        let mut remaining = jobs.into_iter();
        let mut batch_no = 0usize;
        loop {
            let batch: Vec<HostJob> = remaining.by_ref().take(batch_size).collect();
            if batch.is_empty() {
                break;
            }
            batch_no += 1;
            let hosts = batch.len();
            let batch_started = Instant::now();

            let mut pending = Vec::with_capacity(batch.len());
            for job in batch {
                let identifier = job.identifier.clone();
                let entry = match self.settings.connection(&job.address, &job.config) {
                    Ok(conn) => {
                        let net = Arc::clone(&self.net);
                        let check = Arc::clone(&check);
                        Pending::Spawned(tokio::spawn(poll_host(net, check, conn, job)))
                    }
                    Err(err) => {
                        tracing::error!(
                            host = %job.address,
                            error = %err,
                            "connection settings rejected"
                        );
                        Pending::Ready(HostReport::from_error(err.to_string()))
                    }
                };
                pending.push((identifier, entry));
            }

            // The batch barrier: nothing from the next batch starts until
            // every worker here has settled.
            for (identifier, entry) in pending {
                let report = match entry {
                    Pending::Spawned(handle) => match handle.await {
                        Ok(report) => report,
                        Err(err) => {
                            tracing::error!(
                                identifier = %identifier,
                                error = %err,
                                "poll worker panicked"
                            );
                            HostReport::from_error("poll worker panicked")
                        }
                    },
                    Pending::Ready(report) => report,
                };
                results.insert(identifier, report);
            }

            tracing::debug!(
                batch = batch_no,
                hosts,
                elapsed_ms = batch_started.elapsed().as_millis() as u64,
                "batch complete"
            );
        }

        tracing::debug!(
            hosts = results.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "poll run complete"
        );
        results
    }
}

/// Worker body for one host. Never fails: every error becomes the host's
/// error report.
async fn poll_host(
    net: Arc<dyn SessionFactory>,
    check: Arc<dyn Check>,
    conn: ConnectionSettings,
    job: HostJob,
) -> HostReport {
    match check_host(net.as_ref(), check.as_ref(), &conn, &job).await {
        Ok(report) => report,
        Err(err) => {
            tracing::warn!(
                host = %job.address,
                check = check.name(),
                error = %err,
                "host poll failed"
            );
            HostReport::from_error(err.to_string())
        }
    }
}

async fn check_host(
    net: &dyn SessionFactory,
    check: &dyn Check,
    conn: &ConnectionSettings,
    job: &HostJob,
) -> Result<HostReport, CheckError> {
    let mut session = net.open(conn).await?;

    // Classify the device family before handing off to the check; the
    // session must still close if that first probe fails.
    let platform = match session.get(oids::SYS_DESCR).await {
        Ok(descr) => Platform::from_sys_descr(descr.as_text().unwrap_or("")),
        Err(err) => {
            session.close().await;
            return Err(err.into());
        }
    };

    let host = HostContext {
        address: &job.address,
        platform,
        config: &job.config,
        prior_mounts: job.mounts.as_ref(),
    };
    let result = check.poll(session.as_mut(), &host).await;
    session.close().await;
    result
}
