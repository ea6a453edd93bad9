//! Filters narrowing what the server includes in a poll response.

use serde_json::Value;

use crate::FilterId;

/// The filter sent with a poll.
///
/// Either a previously uploaded filter referenced by id, or the filter
/// definition itself sent inline.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// A server-side filter id.
    Id(FilterId),
    /// An inline filter definition.
    Inline(Value),
}

impl Filter {
    /// The query-parameter form of this filter.
    ///
    /// Filter ids are sent verbatim, inline definitions as compact JSON.
    pub fn to_query_value(&self) -> String {
        match self {
            Filter::Id(id) => id.to_string(),
            Filter::Inline(json) => json.to_string(),
        }
    }

    /// The filter id, if this filter is a reference.
    pub fn id(&self) -> Option<&FilterId> {
        match self {
            Filter::Id(id) => Some(id),
            Filter::Inline(_) => None,
        }
    }
}
