//! Patch pipeline laws
//!
//! Property tests tying the diff engine, reconciler, expander, translators
//! and backend applier together.

#[path = "../common/mod.rs"]
mod common;
