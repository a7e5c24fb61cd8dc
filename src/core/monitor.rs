//! The traffic monitor: a recurring tick that turns consecutive counter
//! samples into per-second rates.
//!
//! The first tick only records a baseline. Every later tick publishes a
//! [`TrafficInfo`] holding the fresh cumulative pack and the difference from
//! the previous one. Results reach consumers three ways:
//! - subscribers registered with [`TrafficMonitor::subscribe`], called on the tick
//! - [`TrafficMonitor::latest`], a non-blocking read
//! - [`TrafficMonitor::await_next`] and its callback / blocking variants

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::MonitorConfig;
use crate::core::counters::sample_raw_counters;
use crate::core::formatter::ByteFormatter;
use crate::core::interfaces::{InterfaceSource, SystemInterfaces};
use crate::core::pack::{TrafficInfo, TrafficPack};
use crate::error::MonitorError;

/// Handle returned by [`TrafficMonitor::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SubscriptionId(u64);

type Subscriber = Arc<dyn Fn(TrafficInfo) + Send + Sync>;

/// What pull callers can observe. Replaced as a whole on every publish.
#[derive(Debug, Default)]
struct Published {
    info: Option<Arc<TrafficInfo>>,
    stopped: bool,
}

/// Periodic wifi / cellular traffic sampler.
///
/// Built with [`TrafficMonitor::start`] inside a tokio runtime and shared as
/// an `Arc` handle. Dropping the last handle stops the tick.
pub struct TrafficMonitor {
    config: MonitorConfig,
    source: Arc<dyn InterfaceSource>,
    /// Previous cumulative pack. Locked for the whole tick.
    history: Mutex<Option<TrafficPack>>,
    ticks: AtomicU64,
    published: watch::Sender<Published>,
    subscribers: DashMap<SubscriptionId, Subscriber>,
    next_subscription: AtomicU64,
    shutdown: AtomicBool,
    tick_task: Mutex<Option<JoinHandle<()>>>,
    runtime: Option<Handle>,
}

impl TrafficMonitor {
    /// Build an idle monitor. Nothing is sampled until [`tick`](Self::tick)
    /// is called; use [`start`](Self::start) for the recurring tick.
    pub fn new(config: MonitorConfig, source: Arc<dyn InterfaceSource>) -> Self {
        let (published, _) = watch::channel(Published::default());
        Self {
            config,
            source,
            history: Mutex::new(None),
            ticks: AtomicU64::new(0),
            published,
            subscribers: DashMap::new(),
            next_subscription: AtomicU64::new(1),
            shutdown: AtomicBool::new(false),
            tick_task: Mutex::new(None),
            runtime: Handle::try_current().ok(),
        }
    }

    /// Start sampling on the current tokio runtime. The first tick runs
    /// immediately, then once per `config.tick_interval`.
    pub fn start(config: MonitorConfig, source: Arc<dyn InterfaceSource>) -> Arc<Self> {
        let monitor = Arc::new(Self::new(config, source));
        let task = spawn_ticker(Arc::downgrade(&monitor), monitor.config.tick_interval);
        *monitor.tick_task.lock().unwrap_or_else(PoisonError::into_inner) = Some(task);
        tracing::info!(
            "Traffic monitor started (tick every {:?})",
            monitor.config.tick_interval
        );
        monitor
    }

    /// [`start`](Self::start) with the OS interface list as source.
    pub fn start_system(config: MonitorConfig) -> Arc<Self> {
        Self::start(config, Arc::new(SystemInterfaces::new()))
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Number of ticks executed so far, the baseline tick included.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }

    /// Whether the recurring tick is active.
    pub fn is_running(&self) -> bool {
        !self.shutdown.load(Ordering::Acquire)
            && self
                .tick_task
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .as_ref()
                .is_some_and(|task| !task.is_finished())
    }

    /// Run one sampling cycle.
    ///
    /// Returns the published result, or `None` for the baseline tick and after
    /// [`stop`](Self::stop). Subscribers are called before this returns and
    /// must not call `tick` themselves.
    pub fn tick(&self) -> Option<TrafficInfo> {
        if self.shutdown.load(Ordering::Acquire) {
            return None;
        }
        let fmt = ByteFormatter::current();
        let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);

        let raw = sample_raw_counters(self.source.as_ref(), &self.config.classifier);
        let fresh = TrafficPack::aggregate(&raw, &fmt);
        let tick = self.ticks.fetch_add(1, Ordering::AcqRel) + 1;

        let Some(previous) = history.replace(fresh.clone()) else {
            tracing::trace!("Tick {tick}: baseline sample recorded");
            return None;
        };

        let per_second = TrafficPack::delta(&fresh, &previous, &fmt);
        if let Some((field, item)) = per_second.items().into_iter().find(|(_, i)| i.byte_count < 0) {
            tracing::debug!(
                "Tick {tick}: counter regression on {field} ({} bytes)",
                item.byte_count
            );
        }

        let info = TrafficInfo {
            tick,
            total_traffic: fresh,
            traffic_per_second: per_second,
        };
        let shared = Arc::new(info.clone());
        self.published.send_modify(|p| p.info = Some(shared));
        tracing::trace!(
            "Tick {tick}: up {} B/s, down {} B/s",
            info.traffic_per_second.up_total.byte_count,
            info.traffic_per_second.down_total.byte_count
        );

        self.notify(&info);
        Some(info)
    }

    /// Call every subscriber in subscription order.
    fn notify(&self, info: &TrafficInfo) {
        // Collect first so subscribers may (un)subscribe while being called.
        let mut subscribers: Vec<(SubscriptionId, Subscriber)> = self
            .subscribers
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect();
        subscribers.sort_unstable_by_key(|(id, _)| *id);

        for (id, callback) in subscribers {
            let payload = info.clone();
            if panic::catch_unwind(AssertUnwindSafe(|| (*callback)(payload))).is_err() {
                tracing::warn!("Traffic subscriber {id:?} panicked on tick {}", info.tick);
            }
        }
    }

    /// Register `callback` for every future result.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(TrafficInfo) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.subscribers.insert(id, Arc::new(callback));
        tracing::debug!("Traffic subscriber {id:?} added");
        id
    }

    /// Remove a subscriber. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.subscribers.remove(&id).is_some();
        if removed {
            tracing::debug!("Traffic subscriber {id:?} removed");
        }
        removed
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// The most recent result, or `None` before the second tick.
    pub fn latest(&self) -> Option<TrafficInfo> {
        self.published.borrow().info.as_deref().cloned()
    }

    /// The most recent result, waiting up to `timeout` for the first one.
    ///
    /// Returns immediately when a result exists; `Duration::ZERO` never
    /// suspends. Fails with [`MonitorError::TimedOut`] when the window passes
    /// and with [`MonitorError::NotRunning`] when the monitor is stopped first.
    /// Dropping the future abandons the wait.
    pub async fn await_next(&self, timeout: Duration) -> Result<TrafficInfo, MonitorError> {
        let mut rx = self.published.subscribe();
        let ready = rx.wait_for(|p| p.info.is_some() || p.stopped);
        let outcome = match tokio::time::timeout(timeout, ready).await {
            Ok(Ok(published)) => published.info.as_deref().cloned().ok_or(MonitorError::NotRunning),
            Ok(Err(_)) => Err(MonitorError::NotRunning),
            Err(_) => Err(MonitorError::TimedOut(timeout)),
        };
        outcome
    }

    /// [`await_next`](Self::await_next) with a one-tick window.
    pub async fn wait_default(&self) -> Result<TrafficInfo, MonitorError> {
        self.await_next(self.config.tick_interval).await
    }

    /// Callback form of [`await_next`](Self::await_next).
    ///
    /// `callback` runs at most once: inline if a result already exists,
    /// otherwise from a runtime task. Cancelling the returned request before
    /// it resolves drops the callback uncalled.
    pub fn on_next<F>(self: &Arc<Self>, timeout: Duration, callback: F) -> NextRequest
    where
        F: FnOnce(Result<TrafficInfo, MonitorError>) + Send + 'static,
    {
        if let Some(info) = self.latest() {
            callback(Ok(info));
            return NextRequest::done();
        }
        let Some(runtime) = self.runtime.clone().or_else(|| Handle::try_current().ok()) else {
            callback(Err(MonitorError::NotRunning));
            return NextRequest::done();
        };
        let monitor = Arc::clone(self);
        let task = runtime.spawn(async move {
            let result = monitor.await_next(timeout).await;
            callback(result);
        });
        NextRequest {
            task: Some(task),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Blocking form of [`await_next`](Self::await_next) for threads outside
    /// the runtime. Do not call from a runtime worker thread.
    pub fn await_next_blocking(self: &Arc<Self>, timeout: Duration) -> Result<TrafficInfo, MonitorError> {
        let (tx, rx) = std::sync::mpsc::sync_channel(1);
        let _request = self.on_next(timeout, move |result| {
            let _ = tx.send(result);
        });
        rx.recv().unwrap_or(Err(MonitorError::NotRunning))
    }

    /// Stop the recurring tick and release pending waiters. Idempotent.
    pub fn stop(&self) {
        if self.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(task) = self
            .tick_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
        self.published.send_modify(|p| p.stopped = true);
        tracing::info!("Traffic monitor stopped after {} ticks", self.ticks());
    }
}

impl Drop for TrafficMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for TrafficMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrafficMonitor")
            .field("config", &self.config)
            .field("ticks", &self.ticks())
            .field("subscribers", &self.subscribers.len())
            .field("stopped", &self.shutdown.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// The tick task holds only a weak handle so dropping the monitor ends it.
fn spawn_ticker(monitor: Weak<TrafficMonitor>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let Some(monitor) = monitor.upgrade() else {
                break;
            };
            monitor.tick();
        }
    })
}

/// A pending [`TrafficMonitor::on_next`] request.
#[derive(Debug)]
pub struct NextRequest {
    task: Option<JoinHandle<()>>,
    cancelled: AtomicBool,
}

impl NextRequest {
    fn done() -> Self {
        Self {
            task: None,
            cancelled: AtomicBool::new(false),
        }
    }

    /// Abandon the wait. The callback is not called if it has not run yet.
    pub fn cancel(&self) {
        if let Some(task) = &self.task {
            self.cancelled.store(true, Ordering::Release);
            task.abort();
        }
    }

    /// Whether the callback has run or the request was cancelled.
    pub fn is_finished(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
            || self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }
}
