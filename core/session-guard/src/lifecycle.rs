//! Maps host lifecycle changes to inactivity-monitor actions.
//!
//! The host runtime reports only the state it is entering. [`LifecycleObserver`]
//! remembers the last reported state so each report becomes a
//! `(previous, next)` pair, and [`classify`] decides what the pair means.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Foreground/background state as reported by the host runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppLifecycleState {
    Active,
    Inactive,
    Background,
}

impl AppLifecycleState {
    /// True for states where the user is not looking at the app.
    pub fn is_away(self) -> bool {
        matches!(
            self,
            AppLifecycleState::Inactive | AppLifecycleState::Background
        )
    }
}

impl fmt::Display for AppLifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AppLifecycleState::Active => "active",
            AppLifecycleState::Inactive => "inactive",
            AppLifecycleState::Background => "background",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionAction {
    /// Returning to the foreground: check how long we were away.
    Evaluate,
    /// Leaving (or staying out of) the foreground: stamp the time.
    RecordBackground,
    Ignore,
}

pub fn classify(previous: AppLifecycleState, next: AppLifecycleState) -> TransitionAction {
    match (previous, next) {
        (previous, AppLifecycleState::Active) if previous.is_away() => TransitionAction::Evaluate,
        (_, next) if next.is_away() => TransitionAction::RecordBackground,
        _ => TransitionAction::Ignore,
    }
}

/// Owns the last observed lifecycle state.
#[derive(Debug, Clone)]
pub struct LifecycleObserver {
    current: AppLifecycleState,
}

impl Default for LifecycleObserver {
    fn default() -> Self {
        Self::new(AppLifecycleState::Active)
    }
}

impl LifecycleObserver {
    pub fn new(initial: AppLifecycleState) -> Self {
        Self { current: initial }
    }

    pub fn current(&self) -> AppLifecycleState {
        self.current
    }

    /// Records `next` and returns the previous state it replaced.
    pub fn observe(&mut self, next: AppLifecycleState) -> AppLifecycleState {
        std::mem::replace(&mut self.current, next)
    }
}
