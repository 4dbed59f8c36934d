use serde::{Deserialize, Serialize};

use super::Record;

/// Core region data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionCore {
    /// Unique across all regions.
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub population: Option<u32>,
}

/// A region without an ID.
pub type NewRegion = RegionCore;

/// A region with its unique ID.
pub type Region = Record<RegionCore>;

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl RegionCore {
        pub fn example(name: &str) -> Self {
            Self {
                name: name.to_string(),
                description: Some(format!("The {name} region")),
                population: Some(250_000),
            }
        }
    }
}
