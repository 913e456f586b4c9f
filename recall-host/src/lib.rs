//! # RECALL Host
//!
//! Everything around the engine that a real deployment needs: a tokio
//! session runner with cancellable timers, unlock progress, results
//! storage, and the auth/payment checks that gate which tasks a visitor
//! may launch.
//!
//! The engine in `recall-core` knows none of this. The host decides
//! whether a task may start, runs it in a [`TaskSession`], and on
//! completion saves the [`ResultRecord`](recall_core::ResultRecord) and
//! applies the unlock rule.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod host;
pub mod progress;
pub mod results;
pub mod services;
pub mod session;
pub mod telemetry;

pub use error::{HostError, Result};
pub use host::{Access, Host, LaunchedTask};
pub use progress::{JsonProgressStore, MemoryProgressStore, ProgressStore, ProgressTracker};
pub use results::{MemoryResultsStore, ResultsStore, SqliteResultsStore, StoredResult};
pub use services::{AuthProvider, PaymentProvider, StaticAuth, StaticPayments, VisitorId};
pub use session::{LaunchedSession, OutcomeSink, SessionEvent, SessionHandle, TaskSession, TokioClock, TokioTimers};
