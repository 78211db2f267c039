//! # session-guard
//!
//! Client-resident session resilience for the mobile and desktop clients.
//! Two small state machines live here; everything else in the app is a
//! collaborator that feeds them events or consumes their decisions.
//!
//! ```text
//! Host runtime ─► LifecycleObserver ─► InactivityMonitor ─► KeyValueStore
//!                                              │
//!                                              └──► SessionTerminator (logout)
//!
//! Failed request ─► RetryCoordinator::notify ─► panel ─► retry() ─► RecoverableOperation
//! ```
//!
//! ## Design Principles
//!
//! - **Fail-open**: Storage errors never log the user out. They are logged and
//!   treated as "no pending check".
//! - **User-driven retries**: The retry coordinator never retries on its own.
//! - **Injected collaborators**: Store, clock, terminator and recovery actions are
//!   traits so hosts and tests supply their own.
//! - **Serial events**: Lifecycle events are handled one at a time, in order.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use session_guard::{InactivityMonitor, MemoryStore, SystemClock, GuardConfig};
//!
//! let monitor = InactivityMonitor::install(
//!     MemoryStore::new(),
//!     SystemClock,
//!     || auth.sign_out(),
//!     &GuardConfig::default().inactivity,
//! )
//! .await;
//! tokio::spawn(monitor.run(lifecycle_rx));
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod inactivity;
pub mod lifecycle;
pub mod logging;
pub mod retry;
pub mod storage;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{load_config, GuardConfig, InactivityConfig};
pub use error::{GuardError, RecoveryError, Result, StoreError};
pub use inactivity::{EvaluationOutcome, InactivityMonitor, SessionTerminator};
pub use lifecycle::{AppLifecycleState, LifecycleObserver, TransitionAction};
pub use retry::{
    recovery_fn, PanelState, RecoverableOperation, RetryCoordinator, RetryOutcome, RetryPanelView,
};
pub use storage::StorageConfig;
pub use store::{FileStore, KeyValueStore, MemoryStore};
