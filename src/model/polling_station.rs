use serde::{Deserialize, Serialize};

use super::{DistrictId, Record};

/// Core polling station data.
/// Districts served by the station live in a separate join relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingStationCore {
    pub name: String,
    pub address: String,
    /// Maximum number of voters the station is sized for.
    #[serde(default)]
    pub capacity: Option<u32>,
    #[serde(default = "crate::model::default_true")]
    pub active: bool,
}

/// A polling station without an ID, plus the districts it serves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPollingStation {
    #[serde(flatten)]
    pub polling_station: PollingStationCore,
    #[serde(default)]
    pub district_ids: Vec<DistrictId>,
}

/// A polling station with its unique ID.
pub type PollingStation = Record<PollingStationCore>;

/// A partial update to a polling station.
///
/// Absent fields are left untouched. `district_ids` replaces the station's
/// district set only when present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingStationPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub capacity: Option<u32>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub district_ids: Option<Vec<DistrictId>>,
}

impl PollingStationPatch {
    /// Apply the scalar fields of this patch to `station`.
    pub fn apply(&self, station: &mut PollingStationCore) {
        if let Some(ref name) = self.name {
            station.name = name.clone();
        }
        if let Some(ref address) = self.address {
            station.address = address.clone();
        }
        if let Some(capacity) = self.capacity {
            station.capacity = Some(capacity);
        }
        if let Some(active) = self.active {
            station.active = active;
        }
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl PollingStationCore {
        pub fn example(name: &str, capacity: Option<u32>) -> Self {
            Self {
                name: name.to_string(),
                address: format!("1 {name} Street"),
                capacity,
                active: true,
            }
        }
    }
}
