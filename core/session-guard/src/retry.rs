//! Offline retry coordination.
//!
//! Any network-dependent operation that fails for lack of connectivity calls
//! [`RetryCoordinator::notify`] with a way to redo itself. The coordinator shows
//! the offline panel and re-runs that action only when the user presses retry.
//!
//! ```text
//!            notify                retry()
//!   Hidden ─────────► Visible ─────────────► Retrying
//!     ▲                │  ▲                    │   │
//!     │     close()    │  └──── failure ───────┘   │
//!     ├────────────────┘                           │
//!     └───────────────── success ──────────────────┘
//! ```
//!
//! There is no automatic retry, backoff or cap: every attempt is user-initiated.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::RecoveryError;

pub const PANEL_TITLE: &str = "No Internet Connection";
pub const PANEL_MESSAGE: &str =
    "We couldn't connect to the server. Please check your internet connection.";
pub const CLOSE_LABEL: &str = "Close";
pub const RETRY_LABEL: &str = "Reload";

/// An operation that can be re-run after a connectivity failure.
#[async_trait]
pub trait RecoverableOperation: Send + Sync {
    async fn recover(&self) -> Result<(), RecoveryError>;
}

struct FnRecovery<F>(F);

#[async_trait]
impl<F, Fut> RecoverableOperation for FnRecovery<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), RecoveryError>> + Send + 'static,
{
    async fn recover(&self) -> Result<(), RecoveryError> {
        (self.0)().await
    }
}

/// Wraps an async closure as a [`RecoverableOperation`].
pub fn recovery_fn<F, Fut>(f: F) -> Arc<dyn RecoverableOperation>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), RecoveryError>> + Send + 'static,
{
    Arc::new(FnRecovery(f))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelState {
    Hidden,
    Visible,
    Retrying,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    /// The action succeeded; the panel is hidden.
    Recovered,
    /// The action failed; the panel is visible again with the action kept.
    StillFailing,
    /// Not in the `Visible` state; nothing was invoked.
    Ignored,
}

/// Everything a renderer needs to draw the offline panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetryPanelView {
    pub state: PanelState,
    pub visible: bool,
    pub retrying: bool,
    pub title: &'static str,
    pub message: &'static str,
    pub close_label: &'static str,
    pub retry_label: &'static str,
    pub close_enabled: bool,
    pub retry_enabled: bool,
    /// Show a busy indicator in place of the retry label.
    pub show_spinner: bool,
}

impl RetryPanelView {
    fn for_state(state: PanelState) -> Self {
        let retrying = state == PanelState::Retrying;
        Self {
            state,
            visible: state != PanelState::Hidden,
            retrying,
            title: PANEL_TITLE,
            message: PANEL_MESSAGE,
            close_label: CLOSE_LABEL,
            retry_label: RETRY_LABEL,
            close_enabled: state == PanelState::Visible,
            retry_enabled: state == PanelState::Visible,
            show_spinner: retrying,
        }
    }
}

struct RetryPanelState {
    state: PanelState,
    pending_action: Option<Arc<dyn RecoverableOperation>>,
}

/// Owns the offline panel. Share one instance (`Arc`) between the panel and
/// every fault reporter.
pub struct RetryCoordinator {
    panel: Mutex<RetryPanelState>,
    view_tx: watch::Sender<RetryPanelView>,
}

impl Default for RetryCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryCoordinator {
    pub fn new() -> Self {
        let (view_tx, _) = watch::channel(RetryPanelView::for_state(PanelState::Hidden));
        Self {
            panel: Mutex::new(RetryPanelState {
                state: PanelState::Hidden,
                pending_action: None,
            }),
            view_tx,
        }
    }

    fn lock(&self) -> MutexGuard<'_, RetryPanelState> {
        self.panel
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn transition(&self, panel: &mut RetryPanelState, next: PanelState) {
        if panel.state != next {
            debug!(from = ?panel.state, to = ?next, "Retry panel transition");
            panel.state = next;
        }
        self.view_tx.send_replace(RetryPanelView::for_state(next));
    }

    pub fn state(&self) -> PanelState {
        self.lock().state
    }

    pub fn has_pending_action(&self) -> bool {
        self.lock().pending_action.is_some()
    }

    pub fn view(&self) -> RetryPanelView {
        RetryPanelView::for_state(self.state())
    }

    /// Receives a fresh view on every change. Mount the panel once and re-render
    /// whenever this reports `changed()`.
    pub fn subscribe(&self) -> watch::Receiver<RetryPanelView> {
        self.view_tx.subscribe()
    }

    /// Reports a connectivity failure. The latest action replaces any earlier one.
    pub fn notify(&self, action: Arc<dyn RecoverableOperation>) {
        let mut panel = self.lock();
        panel.pending_action = Some(action);
        match panel.state {
            PanelState::Hidden => {
                info!("Connectivity failure reported, showing offline panel");
                self.transition(&mut panel, PanelState::Visible);
            }
            PanelState::Visible | PanelState::Retrying => {
                debug!(state = ?panel.state, "Replacing pending recovery action");
            }
        }
    }

    /// Dismisses the panel and drops the pending action. Returns `false` and does
    /// nothing while a retry is in flight.
    pub fn close(&self) -> bool {
        let mut panel = self.lock();
        if panel.state == PanelState::Retrying {
            debug!("Ignoring close while retry is in flight");
            return false;
        }
        panel.pending_action = None;
        self.transition(&mut panel, PanelState::Hidden);
        true
    }

    /// Re-runs the pending action. Only acts from `Visible`.
    pub async fn retry(&self) -> RetryOutcome {
        let action = {
            let mut panel = self.lock();
            if panel.state != PanelState::Visible {
                debug!(state = ?panel.state, "Ignoring retry outside visible state");
                return RetryOutcome::Ignored;
            }
            let Some(action) = panel.pending_action.clone() else {
                return RetryOutcome::Ignored;
            };
            self.transition(&mut panel, PanelState::Retrying);
            action
        };

        let mut in_flight = InFlightRetry {
            coordinator: self,
            armed: true,
        };
        let result = action.recover().await;
        in_flight.armed = false;

        let mut panel = self.lock();
        match result {
            Ok(()) => {
                info!("Recovery succeeded, hiding offline panel");
                panel.pending_action = None;
                self.transition(&mut panel, PanelState::Hidden);
                RetryOutcome::Recovered
            }
            Err(err) => {
                warn!(error = %err, "Retry failed");
                self.transition(&mut panel, PanelState::Visible);
                RetryOutcome::StillFailing
            }
        }
    }
}

/// Returns the panel to `Visible` if a retry is dropped or unwinds before the
/// recovery action completes. The pending action is kept.
struct InFlightRetry<'a> {
    coordinator: &'a RetryCoordinator,
    armed: bool,
}

impl Drop for InFlightRetry<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut panel = self.coordinator.lock();
        if panel.state == PanelState::Retrying {
            warn!("Retry abandoned before completion, re-enabling offline panel");
            self.coordinator.transition(&mut panel, PanelState::Visible);
        }
    }
}
