//! Response decomposition for roomsync.
//!
//! This module turns one [`PollResponse`] into the ordered sequence of
//! [`Event`]s delivered to listeners. It is pure: the same response and
//! cursor always yield the same events.
//!
//! Two policies apply before anything is emitted:
//!
//! - **Initial-sync suppression.** When the poll was made with the initial
//!   cursor the response is a bulk snapshot of current state, not a stream of
//!   new happenings, so nothing is emitted.
//! - **Join-flood suppression.** The server replays recent room history as
//!   soon as the account (re)joins a room. A joined room whose timeline holds
//!   a member event for the local account with membership `join` is skipped
//!   entirely, in both the joined and the invited categories. Any later state
//!   changes inside that same timeline window are dropped too; this is a
//!   known approximation.
//!
//! Emission order is: account data, presence, then each joined room (state,
//! timeline, ephemeral), then each invited room (invite state), then each left
//! room (timeline). Rooms are visited in ascending room-id order and every
//! room-scoped event is stamped with its room id.

use std::collections::BTreeSet;

use sync_types::{AccountId, Cursor, Event, EventType, Membership, PollResponse, RoomId};

/// Result of decomposing one poll response.
#[derive(Debug, Clone, PartialEq)]
pub enum Decomposition {
    /// The poll used the initial cursor; output is suppressed.
    InitialSync,
    /// Events to deliver, in emission order.
    Events(Vec<Event>),
}

impl Decomposition {
    /// The events to deliver (empty for an initial sync).
    pub fn into_events(self) -> Vec<Event> {
        match self {
            Decomposition::InitialSync => Vec::new(),
            Decomposition::Events(events) => events,
        }
    }

    /// Whether output was suppressed because this was the initial sync.
    pub fn is_initial_sync(&self) -> bool {
        matches!(self, Decomposition::InitialSync)
    }
}

/// Counters describing one decomposition, for logging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecomposeStats {
    /// Number of events emitted.
    pub emitted: usize,
    /// Rooms skipped by join-flood suppression.
    pub flooded_rooms: usize,
}

/// Maps poll responses to event sequences for one account.
#[derive(Debug, Clone)]
pub struct Decomposer {
    account: AccountId,
}

impl Decomposer {
    /// Create a decomposer for the given local account.
    pub fn new(account: AccountId) -> Self {
        Self { account }
    }

    /// The local account whose joins are treated as floods.
    pub fn account(&self) -> &AccountId {
        &self.account
    }

    /// Decompose a response produced by a poll made with `since`.
    pub fn decompose(&self, response: &PollResponse, since: &Cursor) -> Decomposition {
        self.decompose_with_stats(response, since).0
    }

    /// Decompose a response and report what was emitted and skipped.
    pub fn decompose_with_stats(
        &self,
        response: &PollResponse,
        since: &Cursor,
    ) -> (Decomposition, DecomposeStats) {
        if since.is_initial() {
            return (Decomposition::InitialSync, DecomposeStats::default());
        }

        let flooded = flooded_rooms(response, &self.account);
        let mut events = Vec::with_capacity(response.event_count());

        events.extend(response.account_data.events.iter().cloned());
        events.extend(response.presence.events.iter().cloned());

        for (room_id, room) in &response.rooms.join {
            if flooded.contains(room_id) {
                continue;
            }
            let room_events = room
                .state
                .events
                .iter()
                .chain(&room.timeline.events)
                .chain(&room.ephemeral.events);
            push_stamped(&mut events, room_id, room_events);
        }

        for (room_id, room) in &response.rooms.invite {
            if flooded.contains(room_id) {
                continue;
            }
            push_stamped(&mut events, room_id, &room.invite_state.events);
        }

        for (room_id, room) in &response.rooms.leave {
            push_stamped(&mut events, room_id, &room.timeline.events);
        }

        let stats = DecomposeStats {
            emitted: events.len(),
            flooded_rooms: flooded.len(),
        };
        (Decomposition::Events(events), stats)
    }
}

fn push_stamped<'a>(
    out: &mut Vec<Event>,
    room_id: &RoomId,
    events: impl IntoIterator<Item = &'a Event>,
) {
    out.extend(
        events
            .into_iter()
            .map(|e| e.clone().with_room(room_id.clone())),
    );
}

/// Joined rooms whose timeline contains the local account's own join.
///
/// Each timeline is scanned from the most recent event backwards; the first
/// member event for `account` with membership `join` marks the room.
/// Member events with a non-string membership are ignored.
pub fn flooded_rooms(response: &PollResponse, account: &AccountId) -> BTreeSet<RoomId> {
    response
        .rooms
        .join
        .iter()
        .filter(|(_, room)| {
            room.timeline
                .events
                .iter()
                .rev()
                .any(|e| is_own_join(e, account))
        })
        .map(|(room_id, _)| room_id.clone())
        .collect()
}

fn is_own_join(event: &Event, account: &AccountId) -> bool {
    event.event_type == EventType::ROOM_MEMBER
        && event.state_key.as_deref() == Some(account.as_str())
        && event.membership() == Some(Membership::Join)
}
