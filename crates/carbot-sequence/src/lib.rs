//! Carbot Sequence - Demo builder
//!
//! Builds an ordered list of timed movement steps client-side, creates the
//! named sequence on the backend, and triggers execution. Creation recovers
//! from a duplicate-name conflict with exactly one rename retry; running is
//! never retried (it is not safe to re-trigger blindly).

pub mod sequencer;

pub use sequencer::*;
