//! Live connection bookkeeping and idle reaping.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::server::signal::ShutdownSignal;

/// Identity of a registered connection.
pub type ConnectionId = u64;

/// Source of the current time, replaceable in tests.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Instant;
}

/// The monotonic system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Bookkeeping for one accepted connection.
#[derive(Debug)]
pub struct ConnectionRecord {
    /// Remote address, when the transport has one.
    pub peer: Option<SocketAddr>,
    /// When the last request completed, or when the connection was accepted.
    pub last_activity: Instant,
    /// Requests the connection may still serve.
    pub remaining_requests: usize,
    closer: Arc<ShutdownSignal>,
}

/// Shared table of live connections.
///
/// The table lock is only ever held for the duration of a single lookup or
/// scan and never across an await point.
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<ConnectionId, ConnectionRecord>>,
    next_id: AtomicU64,
    clock: Arc<dyn Clock>,
    idle_timeout: Duration,
    request_budget: usize,
}

impl ConnectionRegistry {
    /// Create a registry driven by the system clock.
    pub fn new(idle_timeout: Duration, request_budget: usize) -> Self {
        Self::with_clock(Arc::new(SystemClock), idle_timeout, request_budget)
    }

    /// Create a registry driven by `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>, idle_timeout: Duration, request_budget: usize) -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            clock,
            idle_timeout,
            request_budget,
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Add a record for a freshly accepted connection.
    ///
    /// The returned signal fires when the registry wants the transport shut
    /// down, either because the connection went idle or because it was removed.
    pub fn register(&self, peer: Option<SocketAddr>) -> (ConnectionId, Arc<ShutdownSignal>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let closer = Arc::new(ShutdownSignal::new());
        let record = ConnectionRecord {
            peer,
            last_activity: self.clock.now(),
            remaining_requests: self.request_budget,
            closer: closer.clone(),
        };

        self.lock().insert(id, record);
        (id, closer)
    }

    /// Account for one served request: refresh the activity timestamp and
    /// spend one unit of budget. Returns the budget left, or `None` if the
    /// connection is no longer registered.
    pub fn record_request(&self, id: ConnectionId) -> Option<usize> {
        let now = self.clock.now();
        let mut connections = self.lock();
        let record = connections.get_mut(&id)?;

        record.last_activity = now;
        record.remaining_requests = record.remaining_requests.saturating_sub(1);
        Some(record.remaining_requests)
    }

    /// Whether the connection may serve another request: still registered,
    /// not shut down, not idle for longer than the timeout and with budget
    /// left.
    pub fn is_alive(&self, id: ConnectionId) -> bool {
        let now = self.clock.now();
        self.lock().get(&id).is_some_and(|record| {
            !record.closer.is_triggered()
                && record.remaining_requests > 0
                && now.saturating_duration_since(record.last_activity) <= self.idle_timeout
        })
    }

    /// Budget left for the connection, if registered.
    pub fn remaining_requests(&self, id: ConnectionId) -> Option<usize> {
        self.lock().get(&id).map(|record| record.remaining_requests)
    }

    /// Remove a record and signal its transport to shut down.
    pub fn remove(&self, id: ConnectionId) -> bool {
        match self.lock().remove(&id) {
            Some(record) => {
                record.closer.trigger();
                true
            }
            None => false,
        }
    }

    /// Scan once and evict every record idle for longer than the timeout,
    /// regardless of its remaining budget. Returns how many were evicted.
    pub fn reap_idle(&self) -> usize {
        let now = self.clock.now();
        let expired: Vec<(ConnectionId, ConnectionRecord)> = {
            let mut connections = self.lock();
            let ids: Vec<ConnectionId> = connections
                .iter()
                .filter(|(_, record)| {
                    now.saturating_duration_since(record.last_activity) > self.idle_timeout
                })
                .map(|(id, _)| *id)
                .collect();
            ids.into_iter()
                .filter_map(|id| connections.remove(&id).map(|record| (id, record)))
                .collect()
        };

        for (id, record) in &expired {
            warn!(
                "Reaping idle connection {id} from {peer:?}",
                peer = record.peer
            );
            record.closer.trigger();
        }
        expired.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ConnectionId, ConnectionRecord>> {
        // Records are plain data, so a panic elsewhere cannot leave one half-written
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Evict idle connections every `interval` until `shutdown` is triggered.
pub async fn run_reaper(
    registry: Arc<ConnectionRegistry>,
    shutdown: Arc<ShutdownSignal>,
    interval: Duration,
) {
    debug!("Reaper started, scanning every {interval:?}");
    while !shutdown.is_triggered() {
        if !registry.is_empty() {
            registry.reap_idle();
        }
        tokio::time::sleep(interval).await;
    }
    info!("Reaper stopped");
}
