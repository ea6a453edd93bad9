//! Default filter definitions.
//!
//! Without a filter the server may return arbitrarily long timelines on the
//! first poll after a long gap. The default caps every room timeline.

use serde_json::{json, Value};

/// Number of timeline events per room in the default filter.
pub const DEFAULT_TIMELINE_LIMIT: u32 = 50;

/// The default filter: each room timeline limited to 50 entries.
pub fn default_filter() -> Value {
    timeline_filter(DEFAULT_TIMELINE_LIMIT)
}

/// A filter limiting each room timeline to `limit` entries.
pub fn timeline_filter(limit: u32) -> Value {
    json!({ "room": { "timeline": { "limit": limit } } })
}
