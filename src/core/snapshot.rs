use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::loop_state::LoopConfig;
use super::marker::Marker;
use crate::error::{OrbitError, Result};

/// A loop and its markers, the unit read from and written to a store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopSnapshot {
    pub config: LoopConfig,
    pub markers: Vec<Marker>,
}

impl LoopSnapshot {
    pub fn new(config: LoopConfig) -> Self {
        Self {
            config,
            markers: Vec::new(),
        }
    }

    /// Add a marker, giving it an id if it has none. Returns the id.
    pub fn add_marker(&mut self, mut marker: Marker) -> Uuid {
        let id = *marker.id.get_or_insert_with(Uuid::new_v4);
        self.markers.push(marker);
        id
    }

    /// Remove the one marker whose id starts with `prefix` and return it.
    /// Nothing is removed unless exactly one marker matches a non-empty prefix.
    pub fn remove_marker(&mut self, prefix: &str) -> Result<Marker> {
        let matches: Vec<usize> = self
            .markers
            .iter()
            .enumerate()
            .filter(|(_, m)| m.id.is_some_and(|id| id.to_string().starts_with(prefix)))
            .map(|(i, _)| i)
            .collect();

        match matches.as_slice() {
            [idx] if !prefix.is_empty() => Ok(self.markers.remove(*idx)),
            [] | [_] => Err(OrbitError::MarkerNotFound(prefix.to_string())),
            _ => Err(OrbitError::AmbiguousMarker {
                prefix: prefix.to_string(),
                ids: matches
                    .iter()
                    .filter_map(|&i| self.markers[i].id.map(|id| id.to_string()))
                    .collect(),
            }),
        }
    }
}
