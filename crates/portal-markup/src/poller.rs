//! Adaptive background refresh.
//!
//! Polls fast while someone is working on the attachment, slows down after a
//! minute without input, and stops entirely while the tab is hidden.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Something the poller can ask to re-fetch.
pub trait Refresh: Send + Sync + 'static {
    fn refresh(&self, show_spinner: bool) -> impl Future<Output = ()> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub active_interval: Duration,
    pub idle_interval: Duration,
    /// Inactivity beyond this switches to the idle interval.
    pub idle_after: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            active_interval: Duration::from_millis(3000),
            idle_interval: Duration::from_millis(15000),
            idle_after: Duration::from_secs(60),
        }
    }
}

impl PollPolicy {
    fn interval(&self, mode: PollMode) -> Option<Duration> {
        match mode {
            PollMode::Active => Some(self.active_interval),
            PollMode::Idle => Some(self.idle_interval),
            PollMode::Suspended => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollMode {
    Active,
    Idle,
    /// Tab hidden; no timer running.
    Suspended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

/// User input that counts as activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    PointerMove,
    PointerDown,
    KeyPress,
    Scroll,
    Touch,
    Click,
    Input,
    Focus,
}

/// What the poller is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollStatus {
    pub mode: PollMode,
    /// Interval of the timer most recently scheduled.
    pub interval: Option<Duration>,
    /// Fetches issued by the poller so far.
    pub fetches: u64,
}

/// Time of the last interaction anywhere in the viewer.
pub struct ActivityTracker {
    last: Mutex<Instant>,
    notify: Notify,
}

impl Default for ActivityTracker {
    fn default() -> Self {
        Self {
            last: Mutex::new(Instant::now()),
            notify: Notify::new(),
        }
    }
}

impl ActivityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, kind: Interaction) {
        *self.last.lock() = Instant::now();
        trace!(?kind, "Interaction");
        self.notify.notify_one();
    }

    /// Restart the inactivity clock without waking the poller.
    pub fn reset(&self) {
        *self.last.lock() = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last.lock().elapsed()
    }
}

/// Handle to a running poller. Dropping it stops the task.
pub struct PollerHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
    status: watch::Receiver<PollStatus>,
}

impl PollerHandle {
    pub fn status(&self) -> PollStatus {
        *self.status.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<PollStatus> {
        self.status.clone()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the timer and wait for the task to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Start polling `target`. The caller is expected to have done the initial
/// (spinner) fetch already; the first poll happens one active interval later.
pub fn spawn<R: Refresh>(
    target: Arc<R>,
    activity: Arc<ActivityTracker>,
    visibility: watch::Receiver<Visibility>,
    policy: PollPolicy,
) -> PollerHandle {
    let cancel = CancellationToken::new();
    let (status_tx, status_rx) = watch::channel(PollStatus {
        mode: PollMode::Active,
        interval: Some(policy.active_interval),
        fetches: 0,
    });

    let poller = Poller {
        target,
        activity,
        visibility,
        policy,
        status: status_tx,
        cancel: cancel.clone(),
        fetches: 0,
    };
    let task = tokio::spawn(poller.run());

    PollerHandle {
        cancel,
        task: Some(task),
        status: status_rx,
    }
}

struct Poller<R: Refresh> {
    target: Arc<R>,
    activity: Arc<ActivityTracker>,
    visibility: watch::Receiver<Visibility>,
    policy: PollPolicy,
    status: watch::Sender<PollStatus>,
    cancel: CancellationToken,
    fetches: u64,
}

impl<R: Refresh> Poller<R> {
    fn publish(&self, mode: PollMode) {
        let status = PollStatus {
            mode,
            interval: self.policy.interval(mode),
            fetches: self.fetches,
        };
        self.status.send_replace(status);
    }

    async fn fetch(&mut self) {
        self.target.refresh(false).await;
        self.fetches += 1;
    }

    /// Fetch, abandoning the request if cancelled. False when cancelled.
    async fn fetch_or_cancel(&mut self) -> bool {
        let cancel = self.cancel.clone();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            _ = self.fetch() => true,
        }
    }

    async fn run(mut self) {
        let mut mode = PollMode::Active;
        debug!("Poller started");

        loop {
            if *self.visibility.borrow_and_update() == Visibility::Hidden {
                self.publish(PollMode::Suspended);
                if !self.wait_until_visible().await {
                    break;
                }
                self.activity.reset();
                if !self.fetch_or_cancel().await {
                    break;
                }
                mode = PollMode::Active;
                debug!("Tab visible again, polling resumed");
                continue;
            }

            self.publish(mode);
            let interval = self.policy.interval(mode).unwrap_or(self.policy.active_interval);
            let sleep = tokio::time::sleep(interval);
            tokio::pin!(sleep);

            let next = loop {
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => break None,
                    changed = self.visibility.changed() => {
                        if changed.is_err() {
                            break None;
                        }
                        if *self.visibility.borrow_and_update() == Visibility::Hidden {
                            break Some(mode);
                        }
                    }
                    _ = self.activity.notify.notified(), if mode == PollMode::Idle => {
                        // A permit left over from active mode is not fresh input.
                        if self.activity.idle_for() <= self.policy.idle_after {
                            debug!("Interaction while idle, back to active polling");
                            break Some(PollMode::Active);
                        }
                    }
                    _ = &mut sleep => {
                        if !self.fetch_or_cancel().await {
                            break None;
                        }
                        let idle = self.activity.idle_for() > self.policy.idle_after;
                        let next = if idle { PollMode::Idle } else { PollMode::Active };
                        if next != mode {
                            debug!(?next, "Poll mode changed");
                        }
                        break Some(next);
                    }
                }
            };

            match next {
                Some(next) => mode = next,
                None => break,
            }
        }

        debug!(fetches = self.fetches, "Poller stopped");
    }

    /// False when cancelled or the visibility source went away.
    async fn wait_until_visible(&mut self) -> bool {
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return false,
                changed = self.visibility.changed() => {
                    if changed.is_err() {
                        return false;
                    }
                    if *self.visibility.borrow_and_update() == Visibility::Visible {
                        return true;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use tokio::time::sleep;

    use super::*;

    #[derive(Default)]
    struct Counter {
        calls: AtomicU64,
        spinner_calls: AtomicU64,
    }

    impl Refresh for Counter {
        async fn refresh(&self, show_spinner: bool) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if show_spinner {
                self.spinner_calls.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    impl Counter {
        fn calls(&self) -> u64 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    struct Rig {
        counter: Arc<Counter>,
        activity: Arc<ActivityTracker>,
        visibility: watch::Sender<Visibility>,
        handle: PollerHandle,
    }

    fn rig() -> Rig {
        let counter = Arc::new(Counter::default());
        let activity = Arc::new(ActivityTracker::new());
        let (visibility, rx) = watch::channel(Visibility::Visible);
        let handle = spawn(counter.clone(), activity.clone(), rx, PollPolicy::default());
        Rig {
            counter,
            activity,
            visibility,
            handle,
        }
    }

    const ACTIVE: Duration = Duration::from_millis(3000);
    const IDLE: Duration = Duration::from_millis(15000);

    #[tokio::test(start_paused = true)]
    async fn polls_at_active_interval_without_spinner() {
        let rig = rig();
        sleep(Duration::from_millis(2900)).await;
        assert_eq!(rig.counter.calls(), 0);
        sleep(Duration::from_millis(200)).await;
        assert_eq!(rig.counter.calls(), 1);
        sleep(ACTIVE).await;
        assert_eq!(rig.counter.calls(), 2);
        assert_eq!(rig.counter.spinner_calls.load(Ordering::SeqCst), 0);
        assert_eq!(rig.handle.status().mode, PollMode::Active);
    }

    #[tokio::test(start_paused = true)]
    async fn switches_to_idle_after_a_minute_then_back_on_input() {
        let rig = rig();
        sleep(Duration::from_millis(500)).await;
        rig.activity.record(Interaction::PointerMove);

        // Ticks at 3s..60s stay active; the tick at 63s sees >60s of quiet.
        sleep(Duration::from_millis(60_000)).await;
        assert_eq!(rig.handle.status().interval, Some(ACTIVE));
        sleep(Duration::from_millis(3000)).await;
        let status = rig.handle.status();
        assert_eq!(status.mode, PollMode::Idle);
        assert_eq!(status.interval, Some(IDLE));
        let fetched = rig.counter.calls();
        assert_eq!(fetched, 21);

        rig.activity.record(Interaction::Click);
        sleep(Duration::from_millis(1)).await;
        let status = rig.handle.status();
        assert_eq!(status.mode, PollMode::Active);
        assert_eq!(status.interval, Some(ACTIVE));

        sleep(ACTIVE).await;
        assert_eq!(rig.counter.calls(), fetched + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_interval_is_used_while_quiet() {
        let rig = rig();
        sleep(Duration::from_millis(63_500)).await;
        let before = rig.counter.calls();
        sleep(Duration::from_millis(14_000)).await;
        assert_eq!(rig.counter.calls(), before);
        sleep(Duration::from_millis(1_500)).await;
        assert_eq!(rig.counter.calls(), before + 1);
        assert_eq!(rig.handle.status().mode, PollMode::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn hidden_tab_suspends_then_fetches_once_on_return() {
        let rig = rig();
        rig.visibility.send_replace(Visibility::Hidden);
        sleep(Duration::from_millis(1)).await;
        assert_eq!(rig.handle.status().mode, PollMode::Suspended);
        assert_eq!(rig.handle.status().interval, None);

        sleep(Duration::from_secs(120)).await;
        assert_eq!(rig.counter.calls(), 0);

        rig.visibility.send_replace(Visibility::Visible);
        sleep(Duration::from_millis(1)).await;
        assert_eq!(rig.counter.calls(), 1);
        assert_eq!(rig.handle.status().mode, PollMode::Active);

        // Inactivity clock restarted on return: still active a minute later.
        sleep(Duration::from_millis(59_000)).await;
        assert_eq!(rig.handle.status().mode, PollMode::Active);
        assert_eq!(rig.counter.calls(), 1 + 19);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_permit_does_not_wake_idle_poller() {
        let rig = rig();
        // Recorded while active: leaves a permit behind but is >60s old by the idle switch.
        sleep(Duration::from_millis(100)).await;
        rig.activity.record(Interaction::KeyPress);
        sleep(Duration::from_millis(63_000)).await;
        assert_eq!(rig.handle.status().mode, PollMode::Idle);
        sleep(Duration::from_millis(10)).await;
        assert_eq!(rig.handle.status().mode, PollMode::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_polling() {
        let rig = rig();
        rig.handle.shutdown().await;
        sleep(Duration::from_secs(30)).await;
        assert_eq!(rig.counter.calls(), 0);
    }

    #[derive(Default)]
    struct Stuck {
        started: AtomicU64,
    }

    impl Refresh for Stuck {
        async fn refresh(&self, _show_spinner: bool) {
            self.started.fetch_add(1, Ordering::SeqCst);
            std::future::pending::<()>().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_abandons_an_in_flight_fetch() {
        let stuck = Arc::new(Stuck::default());
        let (_visibility, rx) = watch::channel(Visibility::Visible);
        let handle = spawn(stuck.clone(), Arc::new(ActivityTracker::new()), rx, PollPolicy::default());

        sleep(ACTIVE + Duration::from_millis(10)).await;
        assert_eq!(stuck.started.load(Ordering::SeqCst), 1);

        let stopped = tokio::time::timeout(Duration::from_secs(1), handle.shutdown()).await;
        assert!(stopped.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_cancels() {
        let Rig { counter, handle, .. } = rig();
        drop(handle);
        sleep(Duration::from_secs(30)).await;
        assert_eq!(counter.calls(), 0);
    }
}
