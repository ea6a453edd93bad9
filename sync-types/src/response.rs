//! The long-poll response snapshot.
//!
//! A [`PollResponse`] holds, per category, the ordered raw events the server
//! returned for one poll. Every section defaults to empty when the server
//! omits it, so a structurally valid but sparse response always parses.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{Cursor, Event, RoomId};

/// An ordered list of events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventBatch {
    /// Events in server order (oldest first).
    #[serde(default)]
    pub events: Vec<Event>,
}

impl EventBatch {
    /// Build a batch from events.
    pub fn new(events: Vec<Event>) -> Self {
        Self { events }
    }

    /// Whether the batch holds no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// A room timeline slice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    /// Timeline events in server order (oldest first).
    #[serde(default)]
    pub events: Vec<Event>,
    /// True when the server truncated the timeline to the filter limit.
    #[serde(default)]
    pub limited: bool,
    /// Token for paginating backwards from the start of this slice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_batch: Option<String>,
}

impl Timeline {
    /// Build an unlimited timeline from events.
    pub fn new(events: Vec<Event>) -> Self {
        Self {
            events,
            limited: false,
            prev_batch: None,
        }
    }
}

/// A room the account is joined to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JoinedRoom {
    /// State changes between the previous cursor and the timeline start.
    #[serde(default)]
    pub state: EventBatch,
    /// New timeline events.
    #[serde(default)]
    pub timeline: Timeline,
    /// Ephemeral events (typing, receipts).
    #[serde(default)]
    pub ephemeral: EventBatch,
    /// Per-room account data.
    #[serde(default)]
    pub account_data: EventBatch,
}

/// A room the account has been invited to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvitedRoom {
    /// Stripped state describing the room.
    #[serde(default)]
    pub invite_state: EventBatch,
}

/// A room the account has left.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeftRoom {
    /// State up to the leave.
    #[serde(default)]
    pub state: EventBatch,
    /// Timeline up to the leave.
    #[serde(default)]
    pub timeline: Timeline,
}

/// Per-room sections of a poll response.
///
/// Rooms are kept in sorted maps so that iteration order (and therefore
/// emission order) is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rooms {
    /// Joined rooms.
    #[serde(default)]
    pub join: BTreeMap<RoomId, JoinedRoom>,
    /// Invited rooms.
    #[serde(default)]
    pub invite: BTreeMap<RoomId, InvitedRoom>,
    /// Left rooms.
    #[serde(default)]
    pub leave: BTreeMap<RoomId, LeftRoom>,
}

/// One long-poll response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PollResponse {
    /// The cursor to use for the next poll.
    pub next_batch: Cursor,
    /// Account-level data events.
    #[serde(default)]
    pub account_data: EventBatch,
    /// Presence events.
    #[serde(default)]
    pub presence: EventBatch,
    /// Per-room data.
    #[serde(default)]
    pub rooms: Rooms,
}

impl PollResponse {
    /// An empty response advancing to `next_batch`.
    pub fn empty(next_batch: impl Into<Cursor>) -> Self {
        Self {
            next_batch: next_batch.into(),
            ..Self::default()
        }
    }

    /// Total number of raw events across every category.
    pub fn event_count(&self) -> usize {
        let joined: usize = self
            .rooms
            .join
            .values()
            .map(|r| {
                r.state.events.len()
                    + r.timeline.events.len()
                    + r.ephemeral.events.len()
                    + r.account_data.events.len()
            })
            .sum();
        let invited: usize = self
            .rooms
            .invite
            .values()
            .map(|r| r.invite_state.events.len())
            .sum();
        let left: usize = self
            .rooms
            .leave
            .values()
            .map(|r| r.state.events.len() + r.timeline.events.len())
            .sum();
        self.account_data.events.len() + self.presence.events.len() + joined + invited + left
    }

    /// Parse a response from JSON bytes.
    pub fn from_json(bytes: &[u8]) -> Result<Self, crate::TypesError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
