//! Physical sites that own daily records.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::common::*;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Prefills the rate on new entries; entries may still override it.
    #[serde(default, deserialize_with = "lenient::amount")]
    pub gas_rate_per_kg: Option<f64>,
}

impl Station {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            location: None,
            gas_rate_per_kg: None,
        }
    }

    pub fn with_rate(mut self, rate: f64) -> Self {
        self.gas_rate_per_kg = Some(rate);
        self
    }
}

impl Identifiable for Station {
    fn id(&self) -> Option<i64> {
        Some(self.id)
    }
}

impl Displayable for Station {
    fn display_label(&self) -> String {
        match &self.location {
            Some(location) => format!("{} ({})", self.name, location),
            None => self.name.clone(),
        }
    }
}

/// Id-to-station lookup used for display and form prefill only.
#[derive(Debug, Clone, Default)]
pub struct StationDirectory {
    stations: HashMap<i64, Station>,
}

impl StationDirectory {
    pub fn new(stations: impl IntoIterator<Item = Station>) -> Self {
        Self {
            stations: stations
                .into_iter()
                .map(|station| (station.id, station))
                .collect(),
        }
    }

    pub fn get(&self, id: i64) -> Option<&Station> {
        self.stations.get(&id)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.stations.contains_key(&id)
    }

    /// Display name for a station id; unknown ids render as `#<id>`.
    pub fn name_of(&self, id: i64) -> String {
        self.get(id)
            .map(|station| station.name.clone())
            .unwrap_or_else(|| format!("#{id}"))
    }

    pub fn rate_for(&self, id: i64) -> Option<f64> {
        self.get(id).and_then(|station| station.gas_rate_per_kg)
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}
