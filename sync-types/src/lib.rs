//! # sync-types
//!
//! Event and poll-response types for the roomsync long-poll sync engine.
//!
//! This crate provides the foundational types used across all roomsync crates:
//! - [`AccountId`], [`RoomId`], [`FilterId`], [`Cursor`] - Identity and ordering types
//! - [`Event`], [`EventType`], [`Membership`] - Protocol events
//! - [`PollResponse`] - One long-poll snapshot and its room sections
//! - [`Filter`] - Filter reference or inline definition
//! - [`TypesError`] - Error types
//!
//! No wire schema beyond these serde shapes is defined here; transports are
//! free to map their own payloads onto them.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod event;
mod filter;
mod ids;
mod response;

pub use error::TypesError;
pub use event::{Event, EventType, Membership};
pub use filter::Filter;
pub use ids::{AccountId, Cursor, FilterId, RoomId};
pub use response::{EventBatch, InvitedRoom, JoinedRoom, LeftRoom, PollResponse, Rooms, Timeline};
