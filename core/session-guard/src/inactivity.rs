//! Inactivity auto-logout.
//!
//! When the app leaves the foreground we stamp the time into the store. When it
//! comes back (or the process starts fresh) we read the stamp, end the session
//! if the user was away longer than the threshold, and delete the stamp.
//!
//! # Why the stamp is persisted
//!
//! The OS may kill a backgrounded app. Persisting the stamp lets the mount pass
//! on the next cold start catch an absence that no foreground event will report.
//!
//! # Fail-open
//!
//! Store errors are logged and treated as "no stamp". A flaky store can
//! therefore let a session outlive the threshold, but never ends one early.
//! Hosts that need the stricter behaviour must check [`EvaluationOutcome`]
//! themselves.

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::config::InactivityConfig;
use crate::lifecycle::{classify, AppLifecycleState, LifecycleObserver, TransitionAction};
use crate::store::KeyValueStore;

/// Logout callback supplied by the embedding app. Must be safe to call when no
/// session is active.
pub trait SessionTerminator: Send + Sync {
    fn terminate(&self);
}

impl<F> SessionTerminator for F
where
    F: Fn() + Send + Sync,
{
    fn terminate(&self) {
        self()
    }
}

/// Result of one evaluation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationOutcome {
    /// No stamp stored (never backgrounded, already evaluated, or unreadable value).
    NoPendingCheck,
    WithinThreshold { elapsed_ms: i64 },
    SessionTerminated { elapsed_ms: i64 },
    /// The store could not be read; treated like `NoPendingCheck`.
    StorageUnavailable,
}

/// Milliseconds between a stored stamp and `now_millis`. Saturates instead of
/// overflowing on hand-edited stamps.
pub fn elapsed_since(now_millis: i64, backgrounded_at: i64) -> i64 {
    now_millis.saturating_sub(backgrounded_at)
}

pub struct InactivityMonitor<S, C, T> {
    store: S,
    clock: C,
    terminator: T,
    storage_key: String,
    threshold_ms: i64,
    observer: LifecycleObserver,
}

impl<S, C, T> InactivityMonitor<S, C, T>
where
    S: KeyValueStore,
    C: Clock,
    T: SessionTerminator,
{
    pub fn new(store: S, clock: C, terminator: T, config: &InactivityConfig) -> Self {
        Self {
            store,
            clock,
            terminator,
            storage_key: config.storage_key.clone(),
            threshold_ms: config.threshold_millis(),
            observer: LifecycleObserver::default(),
        }
    }

    /// Builds the monitor and runs the mount pass. Call once per app lifetime.
    pub async fn install(store: S, clock: C, terminator: T, config: &InactivityConfig) -> Self {
        let mut monitor = Self::new(store, clock, terminator, config);
        monitor.on_mount().await;
        monitor
    }

    pub fn lifecycle(&self) -> AppLifecycleState {
        self.observer.current()
    }

    pub async fn on_mount(&mut self) -> EvaluationOutcome {
        debug!("Inactivity monitor mounted, checking for pending stamp");
        self.evaluate().await
    }

    /// Handles a host-reported state. The previous state comes from the observer.
    pub async fn on_state_change(&mut self, next: AppLifecycleState) -> Option<EvaluationOutcome> {
        let previous = self.observer.observe(next);
        self.apply(previous, next).await
    }

    /// Handles an explicit `(previous, next)` pair for hosts that report both.
    pub async fn on_transition(
        &mut self,
        previous: AppLifecycleState,
        next: AppLifecycleState,
    ) -> Option<EvaluationOutcome> {
        self.observer.observe(next);
        self.apply(previous, next).await
    }

    /// Drains host lifecycle events until the sender is dropped.
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<AppLifecycleState>) {
        while let Some(next) = events.recv().await {
            self.on_state_change(next).await;
        }
        debug!("Lifecycle event stream closed, inactivity monitor stopped");
    }

    async fn apply(
        &mut self,
        previous: AppLifecycleState,
        next: AppLifecycleState,
    ) -> Option<EvaluationOutcome> {
        match classify(previous, next) {
            TransitionAction::Evaluate => {
                debug!(%previous, %next, "App has come to the foreground");
                Some(self.evaluate().await)
            }
            TransitionAction::RecordBackground => {
                debug!(%previous, %next, "App has gone to the background");
                self.record_background().await;
                None
            }
            TransitionAction::Ignore => None,
        }
    }

    async fn record_background(&self) {
        let now = self.clock.now_millis();
        if let Err(err) = self.store.set(&self.storage_key, &now.to_string()).await {
            error!(error = %err, "Failed to save background timestamp");
        }
    }

    async fn evaluate(&self) -> EvaluationOutcome {
        let raw = match self.store.get(&self.storage_key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return EvaluationOutcome::NoPendingCheck,
            Err(err) => {
                error!(error = %err, "Failed to read background timestamp");
                return EvaluationOutcome::StorageUnavailable;
            }
        };

        let backgrounded_at = match raw.trim().parse::<i64>() {
            Ok(value) => value,
            Err(err) => {
                warn!(
                    value = %raw,
                    error = %err,
                    "Discarding unparseable background timestamp"
                );
                self.clear().await;
                return EvaluationOutcome::NoPendingCheck;
            }
        };

        let elapsed_ms = elapsed_since(self.clock.now_millis(), backgrounded_at);
        debug!(
            elapsed_secs = elapsed_ms as f64 / 1000.0,
            "Time away from foreground"
        );

        let outcome = if elapsed_ms > self.threshold_ms {
            info!(
                elapsed_ms,
                threshold_ms = self.threshold_ms,
                "Inactive past threshold, ending session"
            );
            self.terminator.terminate();
            EvaluationOutcome::SessionTerminated { elapsed_ms }
        } else {
            EvaluationOutcome::WithinThreshold { elapsed_ms }
        };

        // Consumed exactly once, after the comparison.
        self.clear().await;
        outcome
    }

    async fn clear(&self) {
        if let Err(err) = self.store.delete(&self.storage_key).await {
            error!(error = %err, "Failed to delete background timestamp");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::StoreError;
    use crate::lifecycle::AppLifecycleState::{Active, Background, Inactive};
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    const KEY: &str = "@appBackgroundedTime";
    const START: i64 = 1_767_225_600_000;

    fn counter() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync) {
        let count = Arc::new(AtomicUsize::new(0));
        let handle = Arc::clone(&count);
        (count, move || {
            handle.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn monitor(
        store: MemoryStore,
        clock: ManualClock,
    ) -> (
        Arc<AtomicUsize>,
        InactivityMonitor<MemoryStore, ManualClock, impl SessionTerminator>,
    ) {
        let (count, terminator) = counter();
        let monitor =
            InactivityMonitor::new(store, clock, terminator, &InactivityConfig::default());
        (count, monitor)
    }

    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_get: AtomicBool,
        fail_set: AtomicBool,
        fail_delete: AtomicBool,
    }

    #[async_trait]
    impl KeyValueStore for FlakyStore {
        async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            if self.fail_get.load(Ordering::SeqCst) {
                return Err(StoreError::Read {
                    key: key.to_string(),
                    details: "disk unavailable".to_string(),
                });
            }
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
            if self.fail_set.load(Ordering::SeqCst) {
                return Err(StoreError::Write {
                    key: key.to_string(),
                    details: "disk full".to_string(),
                });
            }
            self.inner.set(key, value).await
        }

        async fn delete(&self, key: &str) -> Result<(), StoreError> {
            if self.fail_delete.load(Ordering::SeqCst) {
                return Err(StoreError::Delete {
                    key: key.to_string(),
                    details: "read-only".to_string(),
                });
            }
            self.inner.delete(key).await
        }
    }

    #[tokio::test]
    async fn background_transition_stamps_current_time() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(START);
        let (_, mut monitor) = monitor(store.clone(), clock);

        assert_eq!(monitor.on_state_change(Background).await, None);
        assert_eq!(store.get(KEY).await.unwrap(), Some(START.to_string()));
        assert_eq!(monitor.lifecycle(), Background);
    }

    #[tokio::test]
    async fn return_within_threshold_keeps_session() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(START);
        let (count, mut monitor) = monitor(store.clone(), clock.clone());

        monitor.on_state_change(Background).await;
        clock.advance_secs(120);
        let outcome = monitor.on_state_change(Active).await;

        assert_eq!(
            outcome,
            Some(EvaluationOutcome::WithinThreshold {
                elapsed_ms: 120_000
            })
        );
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn exactly_threshold_keeps_session() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(START);
        let (count, mut monitor) = monitor(store.clone(), clock.clone());

        monitor.on_state_change(Background).await;
        clock.advance_secs(300);
        monitor.on_state_change(Active).await;

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn return_past_threshold_terminates_once() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(START);
        let (count, mut monitor) = monitor(store.clone(), clock.clone());

        monitor.on_state_change(Background).await;
        clock.advance_secs(301);
        let outcome = monitor.on_state_change(Active).await;

        assert_eq!(
            outcome,
            Some(EvaluationOutcome::SessionTerminated {
                elapsed_ms: 301_000
            })
        );
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(store.is_empty());

        // Stamp consumed: a second pass finds nothing.
        assert_eq!(monitor.on_mount().await, EvaluationOutcome::NoPendingCheck);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn inactive_then_background_uses_latest_stamp() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(START);
        let (count, mut monitor) = monitor(store.clone(), clock.clone());

        monitor.on_state_change(Inactive).await;
        clock.advance_secs(200);
        monitor.on_state_change(Background).await;
        clock.advance_secs(200);
        monitor.on_state_change(Active).await;

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn flapping_within_threshold_never_terminates() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(START);
        let (count, mut monitor) = monitor(store.clone(), clock.clone());

        for _ in 0..20 {
            monitor.on_state_change(Background).await;
            clock.advance_secs(250);
            monitor.on_state_change(Active).await;
            clock.advance_secs(5);
        }

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn active_to_active_is_ignored() {
        let store = MemoryStore::new();
        let stale = (START - 600_000).to_string();
        store.set(KEY, &stale).await.unwrap();
        let (count, mut monitor) = monitor(store.clone(), ManualClock::new(START));

        assert_eq!(monitor.on_transition(Active, Active).await, None);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(!store.is_empty());
    }

    #[tokio::test]
    async fn install_catches_stale_stamp_from_killed_process() {
        let store = MemoryStore::new();
        store.set(KEY, &START.to_string()).await.unwrap();
        let clock = ManualClock::new(START + 301_000);
        let (count, terminator) = counter();

        let config = InactivityConfig::default();
        InactivityMonitor::install(store.clone(), clock, terminator, &config).await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn unparseable_stamp_is_discarded() {
        let store = MemoryStore::new();
        store.set(KEY, "not-a-number").await.unwrap();
        let (count, mut monitor) = monitor(store.clone(), ManualClock::new(START));

        assert_eq!(monitor.on_mount().await, EvaluationOutcome::NoPendingCheck);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn future_stamp_never_terminates() {
        let store = MemoryStore::new();
        let ahead = (START + 3_600_000).to_string();
        store.set(KEY, &ahead).await.unwrap();
        let (count, mut monitor) = monitor(store.clone(), ManualClock::new(START));

        let outcome = monitor.on_mount().await;
        assert_eq!(
            outcome,
            EvaluationOutcome::WithinThreshold {
                elapsed_ms: -3_600_000
            }
        );
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn stamp_at_i64_min_saturates_instead_of_overflowing() {
        let store = MemoryStore::new();
        store.set(KEY, &i64::MIN.to_string()).await.unwrap();
        let (count, mut monitor) = monitor(store.clone(), ManualClock::new(START));

        assert_eq!(
            monitor.on_mount().await,
            EvaluationOutcome::SessionTerminated {
                elapsed_ms: i64::MAX
            }
        );
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn elapsed_since_saturates_at_both_ends() {
        assert_eq!(elapsed_since(START, START - 1_000), 1_000);
        assert_eq!(elapsed_since(START, i64::MIN), i64::MAX);
        assert_eq!(elapsed_since(-START, i64::MAX), i64::MIN);
    }

    #[tokio::test]
    async fn read_failure_fails_open() {
        let store = Arc::new(FlakyStore::default());
        store.inner.set(KEY, "0").await.unwrap();
        store.fail_get.store(true, Ordering::SeqCst);
        let (count, terminator) = counter();
        let mut monitor = InactivityMonitor::new(
            Arc::clone(&store),
            ManualClock::new(START),
            terminator,
            &InactivityConfig::default(),
        );

        assert_eq!(
            monitor.on_mount().await,
            EvaluationOutcome::StorageUnavailable
        );
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn write_failure_leaves_no_pending_check() {
        let store = Arc::new(FlakyStore::default());
        store.fail_set.store(true, Ordering::SeqCst);
        let clock = ManualClock::new(START);
        let (count, terminator) = counter();
        let mut monitor = InactivityMonitor::new(
            Arc::clone(&store),
            clock.clone(),
            terminator,
            &InactivityConfig::default(),
        );

        monitor.on_state_change(Background).await;
        clock.advance_secs(3_600);
        assert_eq!(
            monitor.on_state_change(Active).await,
            Some(EvaluationOutcome::NoPendingCheck)
        );
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn delete_failure_still_reports_termination() {
        let store = Arc::new(FlakyStore::default());
        store.inner.set(KEY, &START.to_string()).await.unwrap();
        store.fail_delete.store(true, Ordering::SeqCst);
        let (count, terminator) = counter();
        let mut monitor = InactivityMonitor::new(
            Arc::clone(&store),
            ManualClock::new(START + 400_000),
            terminator,
            &InactivityConfig::default(),
        );

        assert_eq!(
            monitor.on_mount().await,
            EvaluationOutcome::SessionTerminated {
                elapsed_ms: 400_000
            }
        );
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn custom_threshold_and_key_are_honoured() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(START);
        let (count, terminator) = counter();
        let config = InactivityConfig {
            threshold_secs: 10,
            storage_key: "bg".to_string(),
        };
        let mut monitor = InactivityMonitor::new(store.clone(), clock.clone(), terminator, &config);

        monitor.on_state_change(Background).await;
        assert!(store.get("bg").await.unwrap().is_some());
        clock.advance_secs(11);
        monitor.on_state_change(Active).await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn run_drains_event_channel() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(START);
        let (count, monitor) = monitor(store.clone(), clock.clone());
        let (tx, rx) = mpsc::unbounded_channel();

        tx.send(Background).unwrap();
        drop(tx);
        monitor.run(rx).await;

        assert_eq!(store.get(KEY).await.unwrap(), Some(START.to_string()));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
