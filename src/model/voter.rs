use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{DistrictId, Record, RegionId};

/// Core voter data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterCore {
    pub first_name: String,
    pub last_name: String,
    /// National identification number, unique across all voters.
    pub identification_number: String,
    pub birth_date: NaiveDate,
    #[serde(default)]
    pub sex: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default = "crate::model::default_true")]
    pub active: bool,
    #[serde(default)]
    pub region_id: Option<RegionId>,
    #[serde(default)]
    pub district_id: Option<DistrictId>,
}

/// A voter without an ID.
pub type NewVoter = VoterCore;

/// A voter with its unique ID.
pub type Voter = Record<VoterCore>;

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl VoterCore {
        pub fn example(
            identification_number: &str,
            region_id: Option<RegionId>,
            district_id: Option<DistrictId>,
        ) -> Self {
            Self {
                first_name: "Ada".to_string(),
                last_name: format!("Voter-{identification_number}"),
                identification_number: identification_number.to_string(),
                birth_date: NaiveDate::from_ymd_opt(1980, 6, 15).unwrap(),
                sex: None,
                email: None,
                phone_number: None,
                active: true,
                region_id,
                district_id,
            }
        }
    }
}
