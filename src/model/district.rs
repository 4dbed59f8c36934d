use serde::{Deserialize, Serialize};

use super::{Record, RegionId};

/// Core district data. A district belongs to exactly one region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistrictCore {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub population: Option<u32>,
    pub region_id: RegionId,
}

/// A district without an ID.
pub type NewDistrict = DistrictCore;

/// A district with its unique ID.
pub type District = Record<DistrictCore>;
