//! Carbot Runtime - Panel orchestration
//!
//! This crate composes the panel's moving parts:
//! - `ConnectionSupervisor` owns the push-channel lifecycle (connect,
//!   reconnect with capped-exponential backoff, shutdown)
//! - `Monitor` owns a `SyncSession` per device and routes snapshot and push
//!   data into it from a single task
//! - `Presenter` is the seam the host UI implements
//! - Manual control actions (movement commands, obstacle reports)

pub mod config;
pub mod logging;
pub mod monitor;
pub mod presenter;
pub mod supervisor;

pub use config::*;
pub use logging::*;
pub use monitor::*;
pub use presenter::*;
pub use supervisor::*;
