//! Scriptable in-memory doubles for the session boundary.
//!
//! [`MockSession`] answers GETs and WALKs from pre-loaded maps;
//! [`MockNet`] hands out per-host sessions and records enough about open
//! order and overlap for the dispatcher tests to assert batch semantics.

use crate::{ConnectionSettings, ProbeError, ProbeSession, ProbeValue, SessionFactory};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A scripted device. Unknown scalars answer `NoSuchObject`, unknown
/// tables answer an empty walk, matching how a live agent behaves for an
/// unsupported subtree.
#[derive(Debug, Clone, Default)]
pub struct MockSession {
    scalars: HashMap<String, ProbeValue>,
    tables: HashMap<String, Vec<ProbeValue>>,
    fail: Option<ProbeError>,
    delay: Duration,
    counters: Option<Arc<NetCounters>>,
    closed: bool,
}

impl MockSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session whose every request fails with `error`.
    pub fn failing(error: ProbeError) -> Self {
        Self {
            fail: Some(error),
            ..Self::default()
        }
    }

    pub fn scalar(mut self, oid: &str, value: ProbeValue) -> Self {
        self.scalars.insert(oid.to_string(), value);
        self
    }

    pub fn text(self, oid: &str, value: &str) -> Self {
        self.scalar(oid, ProbeValue::Text(value.to_string()))
    }

    pub fn int(self, oid: &str, value: i64) -> Self {
        self.scalar(oid, ProbeValue::Integer(value))
    }

    pub fn table(mut self, oid: &str, rows: Vec<ProbeValue>) -> Self {
        self.tables.insert(oid.to_string(), rows);
        self
    }

    pub fn text_table(self, oid: &str, rows: &[&str]) -> Self {
        self.table(
            oid,
            rows.iter()
                .map(|s| ProbeValue::Text(s.to_string()))
                .collect(),
        )
    }

    pub fn int_table(self, oid: &str, rows: &[i64]) -> Self {
        self.table(oid, rows.iter().copied().map(ProbeValue::Integer).collect())
    }

    async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[async_trait]
impl ProbeSession for MockSession {
    async fn get(&mut self, oid: &str) -> Result<ProbeValue, ProbeError> {
        self.pause().await;
        if let Some(err) = &self.fail {
            return Err(err.clone());
        }
        match self.scalars.get(oid) {
            Some(value) => Ok(value.clone()),
            None => Err(ProbeError::NoSuchObject(oid.to_string())),
        }
    }

    async fn walk(&mut self, oid: &str) -> Result<Vec<ProbeValue>, ProbeError> {
        self.pause().await;
        if let Some(err) = &self.fail {
            return Err(err.clone());
        }
        Ok(self.tables.get(oid).cloned().unwrap_or_default())
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Some(counters) = &self.counters {
            counters.active.fetch_sub(1, Ordering::SeqCst);
            counters.completed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[derive(Debug, Default)]
struct NetCounters {
    active: AtomicUsize,
    max_active: AtomicUsize,
    completed: AtomicUsize,
}

/// Factory over a set of scripted hosts.
///
/// Hosts not registered time out at open. Every open is logged with the
/// settings it received and with the number of sessions already completed,
/// which is what the batch-barrier tests assert against.
#[derive(Default)]
pub struct MockNet {
    hosts: Mutex<HashMap<String, MockSession>>,
    delay: Duration,
    counters: Arc<NetCounters>,
    open_log: Mutex<Vec<(ConnectionSettings, usize)>>,
}

impl MockNet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Injects `delay` into every session operation, widening the overlap
    /// window so concurrency assertions are meaningful.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn host(self, address: &str, session: MockSession) -> Self {
        self.hosts
            .lock()
            .unwrap()
            .insert(address.to_string(), session);
        self
    }

    /// Highest number of sessions that were ever open at once.
    pub fn max_active(&self) -> usize {
        self.counters.max_active.load(Ordering::SeqCst)
    }

    /// Settings of every successful open, in open order, each paired with
    /// the count of sessions already closed at that moment.
    pub fn opens(&self) -> Vec<(ConnectionSettings, usize)> {
        self.open_log.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionFactory for MockNet {
    async fn open(
        &self,
        settings: &ConnectionSettings,
    ) -> Result<Box<dyn ProbeSession>, ProbeError> {
        let session = self.hosts.lock().unwrap().get(&settings.host).cloned();
        let Some(mut session) = session else {
            return Err(ProbeError::Timeout {
                host: settings.host.clone(),
                attempts: settings.retries + 1,
            });
        };

        let completed = self.counters.completed.load(Ordering::SeqCst);
        self.open_log
            .lock()
            .unwrap()
            .push((settings.clone(), completed));

        let active = self.counters.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters
            .max_active
            .fetch_max(active, Ordering::SeqCst);

        session.delay = self.delay;
        session.counters = Some(Arc::clone(&self.counters));
        Ok(Box::new(session))
    }
}
