use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A reminder placed at a minute offset inside the loop's cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    /// `None` until the marker has been stored.
    pub id: Option<Uuid>,
    pub text: String,
    pub offset_minutes: i64,
}

/// Identity used to de-duplicate notifications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarkerKey {
    Id(Uuid),
    /// `text:offset` for markers without an id.
    Composite(String),
}

impl fmt::Display for MarkerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{}", id),
            Self::Composite(key) => f.write_str(key),
        }
    }
}

impl Marker {
    pub fn new(text: impl Into<String>, offset_minutes: i64) -> Self {
        Self {
            id: Some(Uuid::new_v4()),
            text: text.into(),
            offset_minutes,
        }
    }

    /// Offset clamped into `[0, duration_minutes]`.
    pub fn effective_offset(&self, duration_minutes: u32) -> i64 {
        self.offset_minutes.clamp(0, i64::from(duration_minutes))
    }

    pub fn key(&self, duration_minutes: u32) -> MarkerKey {
        match self.id {
            Some(id) => MarkerKey::Id(id),
            None => MarkerKey::Composite(format!(
                "{}:{}",
                self.text,
                self.effective_offset(duration_minutes)
            )),
        }
    }

    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }

    /// Display text cut to `max_chars`, with an ellipsis when shortened.
    pub fn label(&self, max_chars: usize) -> String {
        let text = self.text.trim();
        if text.chars().count() <= max_chars {
            return text.to_string();
        }
        let mut out: String = text.chars().take(max_chars.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

/// Sort markers by offset, then text, the order they appear along the cycle.
pub fn sort_markers(markers: &mut [Marker]) {
    markers.sort_by(|a, b| {
        a.offset_minutes
            .cmp(&b.offset_minutes)
            .then_with(|| a.text.cmp(&b.text))
    });
}
