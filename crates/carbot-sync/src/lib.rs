//! Carbot Sync - Live telemetry reconciliation
//!
//! This crate keeps a per-device view consistent across an initial REST
//! snapshot and a continuous push stream:
//! - Bounded, ordered, deduplicated per-channel history (`ChannelBuffer`)
//! - Snapshot+stream merge with a monotonic "latest" per channel
//!   (`SyncSession`)

pub mod buffer;
pub mod session;

pub use buffer::*;
pub use session::*;
