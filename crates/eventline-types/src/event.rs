//! The value produced for every dispatched server-sent event.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single dispatched server-sent event.
///
/// `id` may be inherited from an earlier event in the same stream. `data`
/// is always present, even when the block carried a bare `data` field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Event {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none", default)]
    pub event_type: Option<String>,
    pub data: String,
}

impl Event {
    pub fn new(
        id: Option<impl Into<String>>,
        event_type: Option<impl Into<String>>,
        data: impl Into<String>,
    ) -> Self {
        Self {
            id: id.map(Into::into),
            event_type: event_type.map(Into::into),
            data: data.into(),
        }
    }

    /// Event with neither id nor type.
    pub fn data_only(data: impl Into<String>) -> Self {
        Self {
            id: None,
            event_type: None,
            data: data.into(),
        }
    }

    /// Iterate over the individual `data` lines this event was built from.
    pub fn data_lines(&self) -> std::str::Split<'_, char> {
        self.data.split('\n')
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Event{{id={:?}, type={:?}, data={:?}}}",
            self.id, self.event_type, self.data
        )
    }
}
