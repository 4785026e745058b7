//! Market-hours-aware periodic refresh.
//!
//! A [`Poller`] fires a timer every `interval` (the first tick is immediate).
//! On each tick it checks the market-hours predicate: inside the session it
//! runs the caller's [`Refresher`], outside it only advances `next_update`.
//! State is published on a `watch` channel so any number of views can follow it.
//!
//! Refreshes never overlap. A manual or scheduled refresh that arrives while
//! one is in flight is skipped and leaves `last_update` alone.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::clock::{Clock, SystemClock};
use crate::market_hours::MarketHours;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Default refresh interval: five minutes.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// The async update callback driven by the poller.
///
/// Any `Fn() -> impl Future<Output = Result<(), BoxError>>` closure implements it.
#[async_trait]
pub trait Refresher: Send + Sync {
    async fn refresh(&self) -> Result<(), BoxError>;
}

#[async_trait]
impl<F, Fut> Refresher for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    async fn refresh(&self) -> Result<(), BoxError> {
        (self)().await
    }
}

#[derive(Clone, Debug)]
pub struct PollerConfig {
    pub interval: Duration,
    pub enabled: bool,
    /// When false the market-hours predicate is treated as always open.
    pub market_hours_only: bool,
    pub market_hours: MarketHours,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            enabled: true,
            market_hours_only: true,
            market_hours: MarketHours::default(),
        }
    }
}

/// Freshness metadata published to observers.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshState {
    /// When the last refresh started.
    pub last_update: DateTime<Local>,
    /// Projected time of the next tick. `None` while stopped.
    pub next_update: Option<DateTime<Local>>,
    pub is_updating: bool,
    pub is_market_hours: bool,
}

/// Result of asking for a refresh.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshOutcome {
    Completed,
    /// The callback failed. The failure was logged and previous data stays in place.
    Failed,
    /// Another refresh was already in flight.
    Skipped,
}

struct Shared {
    interval: Duration,
    market_hours_only: bool,
    market_hours: MarketHours,
    clock: Arc<dyn Clock>,
    refresher: Arc<dyn Refresher>,
    state: watch::Sender<RefreshState>,
    enabled: AtomicBool,
    running: AtomicBool,
    in_flight: AtomicBool,
}

/// Holds the "updating" flag. Dropping it releases the flag on every exit path.
struct UpdatingGuard {
    shared: Arc<Shared>,
}

impl Drop for UpdatingGuard {
    fn drop(&mut self) {
        self.shared.in_flight.store(false, Ordering::Release);
        let now = self.shared.clock.now();
        let next = self.shared.projected_next(now);
        self.shared.state.send_modify(|s| {
            s.is_updating = false;
            s.next_update = next;
        });
    }
}

impl Shared {
    fn market_open(&self, now: DateTime<Local>) -> bool {
        !self.market_hours_only || self.market_hours.is_open(&now)
    }

    /// `now + interval` while the timer runs; once stopped the slot stays empty.
    /// An interval past chrono's range has no representable next tick.
    fn projected_next(&self, now: DateTime<Local>) -> Option<DateTime<Local>> {
        if !self.running.load(Ordering::Acquire) {
            return None;
        }
        chrono::Duration::from_std(self.interval)
            .ok()
            .and_then(|interval| now.checked_add_signed(interval))
    }

    fn begin_refresh(self: &Arc<Self>) -> Option<UpdatingGuard> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }
        let now = self.clock.now();
        let open = self.market_open(now);
        self.state.send_modify(|s| {
            s.is_updating = true;
            s.last_update = now;
            s.is_market_hours = open;
        });
        Some(UpdatingGuard {
            shared: Arc::clone(self),
        })
    }

    async fn run_refresh(&self, guard: UpdatingGuard) -> RefreshOutcome {
        let outcome = match self.refresher.refresh().await {
            Ok(()) => RefreshOutcome::Completed,
            Err(e) => {
                tracing::error!("Error during data refresh: {}", e);
                RefreshOutcome::Failed
            }
        };
        drop(guard);
        outcome
    }

    fn on_tick(self: &Arc<Self>) {
        let now = self.clock.now();
        let open = self.market_open(now);
        if self.enabled.load(Ordering::Acquire) && open {
            match self.begin_refresh() {
                Some(guard) => {
                    let shared = Arc::clone(self);
                    tokio::spawn(async move {
                        shared.run_refresh(guard).await;
                    });
                }
                None => tracing::debug!("Refresh still in flight, skipping tick"),
            }
        } else {
            tracing::debug!("Outside market hours, skipping refresh");
        }
        let next = self.projected_next(now);
        self.state.send_modify(|s| {
            s.is_market_hours = open;
            s.next_update = next;
        });
    }
}

/// Periodic refresher with freshness state.
///
/// Must be started from within a tokio runtime. Dropping the poller stops the
/// timer; a refresh already in flight runs to completion.
pub struct Poller {
    shared: Arc<Shared>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl Poller {
    pub fn new(config: PollerConfig, refresher: Arc<dyn Refresher>) -> Self {
        Self::with_clock(config, refresher, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: PollerConfig,
        refresher: Arc<dyn Refresher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let now = clock.now();
        let is_market_hours = !config.market_hours_only || config.market_hours.is_open(&now);
        let (state, _) = watch::channel(RefreshState {
            last_update: now,
            next_update: None,
            is_updating: false,
            is_market_hours,
        });
        Self {
            shared: Arc::new(Shared {
                interval: config.interval,
                market_hours_only: config.market_hours_only,
                market_hours: config.market_hours,
                clock,
                refresher,
                state,
                enabled: AtomicBool::new(config.enabled),
                running: AtomicBool::new(false),
                in_flight: AtomicBool::new(false),
            }),
            timer: Mutex::new(None),
        }
    }

    /// Arms the timer, replacing any previous one. The first tick fires
    /// immediately. When the poller is disabled this is the same as [`stop`](Self::stop).
    pub fn start(&self) {
        if !self.shared.enabled.load(Ordering::Acquire) {
            self.stop();
            return;
        }
        let mut timer = self.timer.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = timer.take() {
            handle.abort();
        }
        self.shared.running.store(true, Ordering::Release);

        let shared = Arc::clone(&self.shared);
        *timer = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(shared.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                shared.on_tick();
            }
        }));
        tracing::debug!(
            "Auto-refresh started, interval {}s",
            self.shared.interval.as_secs()
        );
    }

    /// Cancels the timer and clears `next_update`. An in-flight refresh is not aborted.
    pub fn stop(&self) {
        self.shared.running.store(false, Ordering::Release);
        if let Some(handle) = self
            .timer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            handle.abort();
            tracing::debug!("Auto-refresh stopped");
        }
        self.shared.state.send_modify(|s| s.next_update = None);
    }

    /// Enables or disables auto-refresh, starting or stopping the timer to match.
    pub fn set_enabled(&self, enabled: bool) {
        self.shared.enabled.store(enabled, Ordering::Release);
        if enabled {
            self.start();
        } else {
            self.stop();
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Refreshes now, regardless of market hours.
    pub async fn refresh(&self) -> RefreshOutcome {
        match self.shared.begin_refresh() {
            Some(guard) => self.shared.run_refresh(guard).await,
            None => {
                tracing::debug!("Refresh already in flight, ignoring manual refresh");
                RefreshOutcome::Skipped
            }
        }
    }

    pub fn state(&self) -> RefreshState {
        self.shared.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RefreshState> {
        self.shared.state.subscribe()
    }

    /// Evaluates the market-hours predicate against the current time.
    pub fn is_market_hours(&self) -> bool {
        self.shared.market_open(self.shared.clock.now())
    }

    pub fn interval(&self) -> Duration {
        self.shared.interval
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.shared.running.store(false, Ordering::Release);
        if let Some(handle) = self
            .timer
            .get_mut()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeZone;
    use std::sync::atomic::AtomicUsize;
    use std::sync::OnceLock;
    use tokio::sync::Notify;

    fn wednesday_morning() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 6, 12, 10, 0, 0).unwrap()
    }

    fn saturday_morning() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 6, 15, 10, 0, 0).unwrap()
    }

    fn always_open(interval: Duration) -> PollerConfig {
        PollerConfig {
            interval,
            market_hours_only: false,
            ..PollerConfig::default()
        }
    }

    fn counting_refresher(count: Arc<AtomicUsize>, latency: Duration) -> Arc<dyn Refresher> {
        Arc::new(move || {
            let count = Arc::clone(&count);
            async move {
                count.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(latency).await;
                Ok::<(), BoxError>(())
            }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_immediately_then_every_interval() {
        let count = Arc::new(AtomicUsize::new(0));
        let poller = Poller::new(
            always_open(Duration::from_millis(5000)),
            counting_refresher(Arc::clone(&count), Duration::from_millis(10)),
        );

        poller.start();
        tokio::time::sleep(Duration::from_secs(12)).await;

        assert_eq!(count.load(Ordering::SeqCst), 3);
        poller.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn closed_market_skips_but_reschedules() {
        let clock = Arc::new(ManualClock::new(saturday_morning()));
        let count = Arc::new(AtomicUsize::new(0));
        let poller = Poller::with_clock(
            PollerConfig::default(),
            counting_refresher(Arc::clone(&count), Duration::ZERO),
            clock.clone(),
        );
        let initial = poller.state();
        assert!(!initial.is_market_hours);

        poller.start();
        tokio::time::sleep(Duration::from_millis(1)).await;

        let state = poller.state();
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(state.last_update, initial.last_update);
        assert_eq!(
            state.next_update,
            Some(saturday_morning() + chrono::Duration::minutes(5))
        );

        clock.advance(chrono::Duration::minutes(5));
        tokio::time::sleep(DEFAULT_INTERVAL).await;
        let state = poller.state();
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(state.last_update, initial.last_update);
        assert_eq!(
            state.next_update,
            Some(saturday_morning() + chrono::Duration::minutes(10))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn open_market_stamps_last_update() {
        let clock = Arc::new(ManualClock::new(wednesday_morning()));
        let count = Arc::new(AtomicUsize::new(0));
        let poller = Poller::with_clock(
            PollerConfig::default(),
            counting_refresher(Arc::clone(&count), Duration::ZERO),
            clock.clone(),
        );

        clock.advance(chrono::Duration::seconds(30));
        poller.start();
        tokio::time::sleep(Duration::from_millis(1)).await;

        let state = poller.state();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(state.is_market_hours);
        assert!(!state.is_updating);
        assert_eq!(
            state.last_update,
            wednesday_morning() + chrono::Duration::seconds(30)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stop_clears_next_update_and_halts_ticks() {
        let count = Arc::new(AtomicUsize::new(0));
        let poller = Poller::new(
            always_open(Duration::from_secs(5)),
            counting_refresher(Arc::clone(&count), Duration::ZERO),
        );

        poller.start();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(poller.state().next_update.is_some());

        poller.stop();
        assert!(!poller.is_running());
        assert_eq!(poller.state().next_update, None);

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(poller.state().next_update, None);
    }

    #[tokio::test]
    async fn updating_flag_released_when_callback_fails() {
        let seen_updating = Arc::new(AtomicUsize::new(0));
        let rx_slot: Arc<OnceLock<watch::Receiver<RefreshState>>> = Arc::new(OnceLock::new());

        let refresher: Arc<dyn Refresher> = {
            let seen = Arc::clone(&seen_updating);
            let rx_slot = Arc::clone(&rx_slot);
            Arc::new(move || {
                let seen = Arc::clone(&seen);
                let rx_slot = Arc::clone(&rx_slot);
                async move {
                    if rx_slot.get().is_some_and(|rx| rx.borrow().is_updating) {
                        seen.fetch_add(1, Ordering::SeqCst);
                    }
                    Err::<(), BoxError>("backend unavailable".into())
                }
            })
        };

        let poller = Poller::new(always_open(DEFAULT_INTERVAL), refresher);
        let _ = rx_slot.set(poller.subscribe());

        assert_eq!(poller.refresh().await, RefreshOutcome::Failed);
        assert!(!poller.state().is_updating);
        assert_eq!(poller.refresh().await, RefreshOutcome::Failed);
        assert!(!poller.state().is_updating);
        assert_eq!(seen_updating.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn overlapping_manual_refresh_is_skipped() {
        let release = Arc::new(Notify::new());
        let count = Arc::new(AtomicUsize::new(0));
        let refresher: Arc<dyn Refresher> = {
            let release = Arc::clone(&release);
            let count = Arc::clone(&count);
            Arc::new(move || {
                let release = Arc::clone(&release);
                let count = Arc::clone(&count);
                async move {
                    count.fetch_add(1, Ordering::SeqCst);
                    release.notified().await;
                    Ok::<(), BoxError>(())
                }
            })
        };
        let poller = Arc::new(Poller::new(always_open(DEFAULT_INTERVAL), refresher));

        let first = {
            let poller = Arc::clone(&poller);
            tokio::spawn(async move { poller.refresh().await })
        };
        while !poller.state().is_updating {
            tokio::task::yield_now().await;
        }
        let last_update = poller.state().last_update;

        assert_eq!(poller.refresh().await, RefreshOutcome::Skipped);
        assert_eq!(poller.state().last_update, last_update);

        release.notify_one();
        assert_eq!(first.await.unwrap(), RefreshOutcome::Completed);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!poller.state().is_updating);
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_refresh_survives_stop() {
        let count = Arc::new(AtomicUsize::new(0));
        let poller = Poller::new(
            always_open(Duration::from_secs(60)),
            counting_refresher(Arc::clone(&count), Duration::from_secs(3)),
        );

        poller.start();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(poller.state().is_updating);

        poller.stop();
        tokio::time::sleep(Duration::from_secs(5)).await;

        let state = poller.state();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!state.is_updating);
        assert_eq!(state.next_update, None);
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_poller_does_not_tick() {
        let count = Arc::new(AtomicUsize::new(0));
        let poller = Poller::new(
            PollerConfig {
                enabled: false,
                ..always_open(Duration::from_secs(1))
            },
            counting_refresher(Arc::clone(&count), Duration::ZERO),
        );

        poller.start();
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(!poller.is_running());

        poller.set_enabled(true);
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(poller.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn huge_interval_does_not_wedge_refresh() {
        let count = Arc::new(AtomicUsize::new(0));
        let poller = Poller::new(
            always_open(Duration::from_secs(10_000_000_000_000)),
            counting_refresher(Arc::clone(&count), Duration::ZERO),
        );

        poller.start();
        tokio::time::sleep(Duration::from_millis(5)).await;

        let state = poller.state();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!state.is_updating);
        assert_eq!(state.next_update, None);
        assert_eq!(poller.refresh().await, RefreshOutcome::Completed);
        assert_eq!(count.load(Ordering::SeqCst), 2);
        poller.stop();
    }

    #[tokio::test]
    async fn subscribers_observe_completion() {
        let poller = Poller::new(
            always_open(DEFAULT_INTERVAL),
            counting_refresher(Arc::new(AtomicUsize::new(0)), Duration::ZERO),
        );
        let mut rx = poller.subscribe();
        let _ = rx.borrow_and_update();

        assert_eq!(poller.refresh().await, RefreshOutcome::Completed);
        assert!(rx.has_changed().unwrap());
        assert!(!rx.borrow_and_update().is_updating);
    }
}
