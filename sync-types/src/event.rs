//! Protocol events delivered to listeners.
//!
//! An [`Event`] is a discriminated record: its [`EventType`] selects the
//! listeners, the `content` map is free-form and never validated. Event shapes
//! this crate does not know about pass through untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::fmt;

use crate::RoomId;

/// The type tag of an event.
///
/// This is an open enumeration: the constants cover the types the sync engine
/// itself inspects or that applications commonly listen for, and any other
/// tag received from the server is carried as-is.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventType(Cow<'static, str>);

impl EventType {
    /// A message in a room timeline.
    pub const ROOM_MESSAGE: EventType = EventType::from_static("m.room.message");
    /// Room membership state (join, invite, leave, ...).
    pub const ROOM_MEMBER: EventType = EventType::from_static("m.room.member");
    /// Room topic state.
    pub const ROOM_TOPIC: EventType = EventType::from_static("m.room.topic");
    /// Room name state.
    pub const ROOM_NAME: EventType = EventType::from_static("m.room.name");
    /// Room creation state.
    pub const ROOM_CREATE: EventType = EventType::from_static("m.room.create");
    /// Presence update for a user.
    pub const PRESENCE: EventType = EventType::from_static("m.presence");
    /// Typing notification (ephemeral).
    pub const TYPING: EventType = EventType::from_static("m.typing");
    /// Read receipt (ephemeral).
    pub const RECEIPT: EventType = EventType::from_static("m.receipt");
    /// Direct-chat mapping (account data).
    pub const DIRECT: EventType = EventType::from_static("m.direct");
    /// Room tags (account data).
    pub const TAG: EventType = EventType::from_static("m.tag");

    /// Build an event type from a static string.
    pub const fn from_static(tag: &'static str) -> Self {
        Self(Cow::Borrowed(tag))
    }

    /// Build an event type from any string.
    pub fn new(tag: impl Into<String>) -> Self {
        Self(Cow::Owned(tag.into()))
    }

    /// Get the tag as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventType({})", self.0)
    }
}

impl From<&str> for EventType {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

impl From<String> for EventType {
    fn from(tag: String) -> Self {
        Self::new(tag)
    }
}

/// Membership carried by an `m.room.member` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Membership {
    /// The subject joined the room.
    Join,
    /// The subject was invited.
    Invite,
    /// The subject left or was kicked.
    Leave,
    /// The subject was banned.
    Ban,
    /// The subject asked to join.
    Knock,
    /// A membership value this crate does not know.
    Other(String),
}

impl Membership {
    /// Parse the wire value of the `membership` content key.
    pub fn parse(value: &str) -> Self {
        match value {
            "join" => Self::Join,
            "invite" => Self::Invite,
            "leave" => Self::Leave,
            "ban" => Self::Ban,
            "knock" => Self::Knock,
            other => Self::Other(other.to_string()),
        }
    }
}

/// A single protocol event.
///
/// Events are produced by the decomposer, stamped with the room they came
/// from, and handed to listeners by reference. Listeners that need to keep
/// an event must clone it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// The event type tag.
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// State key; present only on persistent room-state events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_key: Option<String>,
    /// The sender of the event.
    #[serde(default)]
    pub sender: String,
    /// Server timestamp in milliseconds since the Unix epoch.
    #[serde(default)]
    pub origin_server_ts: i64,
    /// Server-assigned event id (absent for ephemeral and account data).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    /// Free-form event content.
    #[serde(default)]
    pub content: Map<String, Value>,
    /// Unsigned server metadata.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub unsigned: Map<String, Value>,
    /// The room this event belongs to, stamped during decomposition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<RoomId>,
}

impl Event {
    /// Create an event with the given type and content and no metadata.
    pub fn new(event_type: EventType, content: Map<String, Value>) -> Self {
        Self {
            event_type,
            state_key: None,
            sender: String::new(),
            origin_server_ts: 0,
            event_id: None,
            content,
            unsigned: Map::new(),
            room_id: None,
        }
    }

    /// Return this event stamped with a room id.
    pub fn with_room(mut self, room_id: RoomId) -> Self {
        self.room_id = Some(room_id);
        self
    }

    /// Whether this is a persistent room-state event.
    pub fn is_state(&self) -> bool {
        self.state_key.is_some()
    }

    /// The membership value for `m.room.member` events.
    ///
    /// Returns `None` for other event types and for member events whose
    /// `membership` content is missing or not a string.
    pub fn membership(&self) -> Option<Membership> {
        if self.event_type != EventType::ROOM_MEMBER {
            return None;
        }
        self.content
            .get("membership")
            .and_then(Value::as_str)
            .map(Membership::parse)
    }

    /// The `body` of a message event, if present.
    pub fn body(&self) -> Option<&str> {
        self.content.get("body").and_then(Value::as_str)
    }

    /// The `msgtype` of a message event, if present.
    pub fn msgtype(&self) -> Option<&str> {
        self.content.get("msgtype").and_then(Value::as_str)
    }
}
