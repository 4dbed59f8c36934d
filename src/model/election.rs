use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{CandidateId, Record};

/// Core election data.
/// The candidate set lives in a separate join relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionCore {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub election_date: NaiveDate,
    #[serde(default)]
    pub registration_start: Option<NaiveDate>,
    #[serde(default)]
    pub registration_end: Option<NaiveDate>,
    /// Votes are only admitted while this is set.
    #[serde(default = "crate::model::default_true")]
    pub active: bool,
    /// Free-form type, e.g. "presidential", "parliamentary" or "local".
    pub election_type: String,
}

/// An election without an ID, plus the candidates to register for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewElection {
    #[serde(flatten)]
    pub election: ElectionCore,
    #[serde(default)]
    pub candidate_ids: Vec<CandidateId>,
}

/// An election with its unique ID.
pub type Election = Record<ElectionCore>;

/// A partial update to an election.
///
/// Absent fields are left untouched. `candidate_ids` replaces the candidate
/// set only when present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub election_date: Option<NaiveDate>,
    #[serde(default)]
    pub registration_start: Option<NaiveDate>,
    #[serde(default)]
    pub registration_end: Option<NaiveDate>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub election_type: Option<String>,
    #[serde(default)]
    pub candidate_ids: Option<Vec<CandidateId>>,
}

impl ElectionPatch {
    /// Apply the scalar fields of this patch to `election`.
    pub fn apply(&self, election: &mut ElectionCore) {
        if let Some(ref name) = self.name {
            election.name = name.clone();
        }
        if let Some(ref description) = self.description {
            election.description = Some(description.clone());
        }
        if let Some(date) = self.election_date {
            election.election_date = date;
        }
        if let Some(start) = self.registration_start {
            election.registration_start = Some(start);
        }
        if let Some(end) = self.registration_end {
            election.registration_end = Some(end);
        }
        if let Some(active) = self.active {
            election.active = active;
        }
        if let Some(ref election_type) = self.election_type {
            election.election_type = election_type.clone();
        }
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl ElectionCore {
        pub fn example(name: &str, active: bool) -> Self {
            Self {
                name: name.to_string(),
                description: None,
                election_date: NaiveDate::from_ymd_opt(2026, 11, 3).unwrap(),
                registration_start: NaiveDate::from_ymd_opt(2026, 9, 1),
                registration_end: NaiveDate::from_ymd_opt(2026, 10, 15),
                active,
                election_type: "general".to_string(),
            }
        }
    }

    impl NewElection {
        pub fn example(name: &str, active: bool, candidate_ids: Vec<CandidateId>) -> Self {
            Self {
                election: ElectionCore::example(name, active),
                candidate_ids,
            }
        }
    }
}
