//! # sync-core
//!
//! Pure logic for roomsync (no I/O, instant tests).
//!
//! This crate implements the decisions of the sync engine without any
//! network or disk I/O, enabling fast unit tests.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects. This enables:
//! - Instant unit tests (no mocks, no async)
//! - Deterministic behavior (same input → same output)
//! - Easy reasoning about what a poll response turns into
//!
//! The actual I/O (polling, persisting cursors, invoking listeners) is
//! performed by `sync-client`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backoff;
pub mod decompose;
pub mod filter;

pub use backoff::{exponential_backoff, exponential_base};
pub use decompose::{flooded_rooms, DecomposeStats, Decomposer, Decomposition};
pub use filter::{default_filter, timeline_filter, DEFAULT_TIMELINE_LIMIT};
