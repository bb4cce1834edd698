use std::sync::{Arc, Weak};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::time::{Duration, SystemTime};
use arc_swap::ArcSwapOption;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use crate::config::CoordinatorSettings;
use crate::fetchers::fetcher::{FetchError, Fetcher, RawPayload, Value, STEP_FIELD};
use crate::key::DataSourceKey;

// tokio panics on a zero period
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Last successfully fetched record and the time it was captured.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    payload: RawPayload,
    captured_at: SystemTime,
}

impl Snapshot {
    pub fn new(payload: RawPayload, captured_at: SystemTime) -> Self {
        Snapshot { payload, captured_at }
    }

    pub fn get(&self, field: &str) -> Option<Value> {
        self.payload.get(field)
    }

    pub fn step(&self) -> Option<i64> {
        self.payload.get(STEP_FIELD).and_then(|v| v.as_step())
    }

    pub fn payload(&self) -> &RawPayload {
        &self.payload
    }

    pub fn captured_at(&self) -> SystemTime {
        self.captured_at
    }

    /// Time since capture. The coordinator keeps serving a snapshot through any number of
    /// failed refreshes, so this is the only staleness signal consumers get.
    pub fn age(&self) -> Duration {
        SystemTime::now().duration_since(self.captured_at).unwrap_or_default()
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    /// A refresh may start right away
    Idle = 0,
    /// A fetch is executing
    InFlight = 1,
    /// A refresh completed recently; requests are deferred until the window closes
    Cooldown = 2,
}

impl From<u8> for RefreshState {
    fn from(value: u8) -> Self {
        match value {
            1 => RefreshState::InFlight,
            2 => RefreshState::Cooldown,
            _ => RefreshState::Idle,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Trigger {
    Scheduled,
    Requested,
    Deferred,
}

/// Resets the state to idle if a fetch is abandoned before reaching cooldown.
struct InFlightGuard<'a> {
    state: &'a AtomicU8,
}

impl<'a> InFlightGuard<'a> {
    fn enter(state: &'a AtomicU8) -> Self {
        state.store(RefreshState::InFlight as u8, Ordering::Release);
        InFlightGuard { state }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let _ = self.state.compare_exchange(
            RefreshState::InFlight as u8,
            RefreshState::Idle as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }
}

struct Shared<F> {
    key: DataSourceKey,
    fetcher: F,
    settings: CoordinatorSettings,
    snapshot: ArcSwapOption<Snapshot>,
    last_failure: ArcSwapOption<FetchError>,
    state: AtomicU8,
    // Held for the whole duration of a fetch
    refresh_lock: Mutex<()>,
    // Bumped after every completed fetch, failed or not
    generation: AtomicU64,
    deferred: AtomicBool,
    started: AtomicBool,
    shutdown: CancellationToken,
}

/// Shared cache and refresh owner for one [`DataSourceKey`].
///
/// Cloning is cheap and every clone refers to the same cache. Reads
/// ([`current_value`](Self::current_value), [`current_step`](Self::current_step),
/// [`snapshot`](Self::snapshot)) never block and never fetch. At most one fetch runs at a time;
/// concurrent refresh requests join it instead of starting their own.
pub struct Coordinator<F: Fetcher> {
    shared: Arc<Shared<F>>,
}

impl<F: Fetcher> Clone for Coordinator<F> {
    fn clone(&self) -> Self {
        Coordinator { shared: self.shared.clone() }
    }
}

impl<F: Fetcher> std::fmt::Debug for Coordinator<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("key", &self.shared.key)
            .field("state", &self.state())
            .field("settings", &self.shared.settings)
            .finish_non_exhaustive()
    }
}

impl<F: Fetcher> Coordinator<F> {
    pub fn new(key: DataSourceKey, fetcher: F, settings: CoordinatorSettings) -> Self {
        Coordinator {
            shared: Arc::new(Shared {
                key,
                fetcher,
                settings,
                snapshot: ArcSwapOption::empty(),
                last_failure: ArcSwapOption::empty(),
                state: AtomicU8::new(RefreshState::Idle as u8),
                refresh_lock: Mutex::new(()),
                generation: AtomicU64::new(0),
                deferred: AtomicBool::new(false),
                started: AtomicBool::new(false),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    pub fn key(&self) -> &DataSourceKey {
        &self.shared.key
    }

    pub fn settings(&self) -> CoordinatorSettings {
        self.shared.settings
    }

    pub fn state(&self) -> RefreshState {
        RefreshState::from(self.shared.state.load(Ordering::Acquire))
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.shutdown.is_cancelled()
    }

    /// Current snapshot, `None` until the first successful fetch.
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.shared.snapshot.load_full()
    }

    pub fn current_value(&self, field: &str) -> Option<Value> {
        self.snapshot().and_then(|s| s.get(field))
    }

    pub fn current_step(&self) -> Option<i64> {
        self.snapshot().and_then(|s| s.step())
    }

    /// Most recent failure, cleared by the next successful fetch.
    pub fn last_failure(&self) -> Option<Arc<FetchError>> {
        self.shared.last_failure.load_full()
    }

    /// Spawns the refresh timer. The first tick fires immediately.
    ///
    /// Calling `start` again, or after [`stop`](Self::stop), does nothing.
    pub fn start(&self) {
        if self.is_stopped() {
            log_event!(warn, key = %self.shared.key, "coordinator was stopped and cannot be restarted");
            return;
        }
        if self.shared.started.swap(true, Ordering::AcqRel) {
            return;
        }

        let weak = Arc::downgrade(&self.shared);
        let shutdown = self.shared.shutdown.clone();
        let period = self.shared.settings.interval.max(MIN_INTERVAL);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let Some(shared) = weak.upgrade() else { break };
                        Coordinator { shared }.scheduled_refresh().await;
                    }
                }
            }
        });
        log_event!(debug, key = %self.shared.key, interval = ?period, "refresh timer started");
    }

    /// Stops the timer. A fetch still in flight is abandoned and its result discarded.
    pub fn stop(&self) {
        if !self.is_stopped() {
            log_event!(debug, key = %self.shared.key, "stopping coordinator");
        }
        self.shared.shutdown.cancel();
    }

    /// Timer entry point. Does nothing unless the coordinator is idle.
    pub async fn scheduled_refresh(&self) {
        let Ok(_guard) = self.shared.refresh_lock.try_lock() else {
            log_event!(debug, key = %self.shared.key, "refresh in flight, scheduled tick skipped");
            return;
        };
        if self.is_stopped() || self.state() != RefreshState::Idle {
            log_event!(debug, key = %self.shared.key, state = ?self.state(), "scheduled tick skipped");
            return;
        }
        self.refresh_locked(Trigger::Scheduled).await;
    }

    /// Asks for fresher data than the schedule would provide.
    ///
    /// If a fetch is in flight, waits for it and returns once its outcome is visible. During
    /// cooldown returns immediately and queues a single refresh for the end of the window.
    pub async fn request_refresh(&self) {
        if self.is_stopped() {
            return;
        }
        let seen = self.shared.generation.load(Ordering::Acquire);
        let _guard = tokio::select! {
            biased;
            _ = self.shared.shutdown.cancelled() => return,
            guard = self.shared.refresh_lock.lock() => guard,
        };
        if self.shared.generation.load(Ordering::Acquire) != seen {
            // Joined a fetch that was running when we arrived
            return;
        }
        match self.state() {
            RefreshState::Idle => self.refresh_locked(Trigger::Requested).await,
            _ => {
                self.shared.deferred.store(true, Ordering::Release);
                log_event!(debug, key = %self.shared.key, "refresh deferred until cooldown ends");
            }
        }
    }

    // Caller must hold refresh_lock
    async fn refresh_locked(&self, trigger: Trigger) {
        let shared = &self.shared;
        let _in_flight = InFlightGuard::enter(&shared.state);
        log_event!(debug, key = %shared.key, trigger = ?trigger, "refreshing");

        let outcome = tokio::select! {
            biased;
            _ = shared.shutdown.cancelled() => None,
            result = shared.fetcher.fetch(&shared.key) => Some(result),
        };
        let Some(result) = outcome else {
            log_event!(debug, key = %shared.key, "coordinator stopped, in-flight result discarded");
            return;
        };

        match result {
            Ok(payload) => {
                log_event!(info, key = %shared.key, fields = payload.len(), "snapshot replaced");
                shared.snapshot.store(Some(Arc::new(Snapshot::new(payload, SystemTime::now()))));
                shared.last_failure.store(None);
            }
            Err(err) => {
                log_event!(warn, key = %shared.key, kind = ?err.kind(), error = %err, "refresh failed, keeping previous snapshot");
                shared.last_failure.store(Some(Arc::new(err)));
            }
        }
        shared.generation.fetch_add(1, Ordering::AcqRel);
        self.enter_cooldown();
    }

    fn enter_cooldown(&self) {
        self.shared.state.store(RefreshState::Cooldown as u8, Ordering::Release);

        let weak: Weak<Shared<F>> = Arc::downgrade(&self.shared);
        let shutdown = self.shared.shutdown.clone();
        let cooldown = self.shared.settings.cooldown;
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => return,
                _ = tokio::time::sleep(cooldown) => {}
            }
            if let Some(shared) = weak.upgrade() {
                Coordinator { shared }.finish_cooldown().await;
            }
        });
    }

    async fn finish_cooldown(&self) {
        let _guard = self.shared.refresh_lock.lock().await;
        self.shared.state.store(RefreshState::Idle as u8, Ordering::Release);
        if self.shared.deferred.swap(false, Ordering::AcqRel) && !self.is_stopped() {
            self.refresh_locked(Trigger::Deferred).await;
        }
    }
}
