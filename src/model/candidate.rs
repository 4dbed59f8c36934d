use serde::{Deserialize, Serialize};

use super::Record;

/// Core candidate data.
/// The elections a candidate stands in live in a separate join relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateCore {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub party: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub biography: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl CandidateCore {
    /// The display name used as the key of per-candidate vote counts.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A candidate without an ID.
pub type NewCandidate = CandidateCore;

/// A candidate with its unique ID.
pub type Candidate = Record<CandidateCore>;
