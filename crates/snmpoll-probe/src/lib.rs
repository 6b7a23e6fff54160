//! Session boundary between the polling engine and the wire-level SNMP
//! client.
//!
//! The engine only ever talks to a device through the [`ProbeSession`] and
//! [`SessionFactory`] traits: open a session with resolved connection
//! settings, issue scalar GETs and table WALKs against dotted numeric OIDs,
//! and close deterministically. Retries and timeouts live below this
//! boundary, inside the transport; the engine sees them only as
//! [`ProbeError::Timeout`] once they are exhausted.
//!
//! The [`mock`] module provides scriptable in-memory doubles used by the
//! check and engine test suites.

pub mod error;
pub mod mock;
pub mod oids;

use async_trait::async_trait;
use std::time::Duration;

pub use error::ProbeError;

/// Resolved connection parameters for one host.
///
/// Built-in fallbacks, applied when neither the node config nor the global
/// settings supply a value: port 161, community `public`, version `2c`,
/// timeout 2s, 1 retry.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionSettings {
    pub host: String,
    pub port: u16,
    pub community: String,
    pub version: String,
    pub timeout: Duration,
    pub retries: u32,
}

impl ConnectionSettings {
    pub fn for_host(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 161,
            community: "public".to_string(),
            version: "2c".to_string(),
            timeout: Duration::from_secs(2),
            retries: 1,
        }
    }
}

/// One value returned by a GET or a WALK row.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeValue {
    Integer(i64),
    Unsigned(u64),
    Text(String),
    /// The agent answered but the row does not exist. Collectors skip
    /// these rather than fail.
    NoSuchInstance,
}

impl ProbeValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            Self::Unsigned(v) => i64::try_from(*v).ok(),
            Self::Text(s) => s.trim().parse().ok(),
            Self::NoSuchInstance => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(v) => Some(*v as f64),
            Self::Unsigned(v) => Some(*v as f64),
            Self::Text(s) => s.trim().parse().ok(),
            Self::NoSuchInstance => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::NoSuchInstance)
    }
}

/// Device family advertised through the system description object.
///
/// The two families expose different table layouts for storage, CPU, and
/// process data, so every collector branches on this once per host. The
/// value is fetched at session open and threaded explicitly through the
/// call chain; it is never stored in global or task-local state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    NetSnmp,
}

impl Platform {
    /// Classify a sysDescr string. Anything that does not advertise itself
    /// as Windows is treated as net-snmp-like.
    pub fn from_sys_descr(descr: &str) -> Self {
        let lower = descr.to_lowercase();
        if let Some(rest) = lower.split("windows").nth(1) {
            if rest.starts_with(char::is_whitespace) {
                return Self::Windows;
            }
        }
        Self::NetSnmp
    }
}

/// An open session against one device.
///
/// `get` and `walk` may fail with a timeout-class error after the
/// transport's own retries are exhausted, or with any other transport
/// error. The dispatcher guarantees [`close`](Self::close) runs on every
/// worker exit path.
#[async_trait]
pub trait ProbeSession: Send {
    /// Scalar GET against a dotted numeric OID.
    async fn get(&mut self, oid: &str) -> Result<ProbeValue, ProbeError>;

    /// Table WALK of the subtree below `oid`, returning values in row
    /// order. A partially populated table yields a shorter vector than its
    /// sibling columns; callers index-align parallel walks positionally.
    async fn walk(&mut self, oid: &str) -> Result<Vec<ProbeValue>, ProbeError>;

    /// Release the session. Idempotent.
    async fn close(&mut self);
}

/// Opens sessions for the dispatcher. Implementations wrap a concrete SNMP
/// client; tests use [`mock::MockNet`].
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(
        &self,
        settings: &ConnectionSettings,
    ) -> Result<Box<dyn ProbeSession>, ProbeError>;
}
