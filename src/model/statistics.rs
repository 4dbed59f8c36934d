use serde::{Deserialize, Serialize};

use super::{
    Candidate, CandidateId, District, DistrictId, Election, ElectionId, PollingStation,
    PollingStationId, Region, RegionId, Vote,
};

/// Vote count of one region or district, as produced by a group-by query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitVoteCount {
    pub id: u32,
    pub name: String,
    pub votes: u64,
}

/// Vote count of one election, as produced by a group-by query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionVoteCount {
    pub election_id: ElectionId,
    pub votes: u64,
}

/// Vote count of one candidate within an election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateVoteCount {
    pub candidate_id: CandidateId,
    pub first_name: String,
    pub last_name: String,
    pub votes: u64,
}

/// Per-candidate result of an election.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteStatistics {
    pub candidate_id: CandidateId,
    pub candidate_first_name: String,
    pub candidate_last_name: String,
    pub candidate_party: Option<String>,
    pub election_id: ElectionId,
    pub election_name: String,
    pub vote_count: u64,
    /// Share of the election's valid votes, in percent.
    pub vote_percentage: f64,
}

/// The unit a participation rate is computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum ParticipationUnit {
    Region(RegionId),
    District(DistrictId),
    Election(ElectionId),
}

/// A rate, wrapped so it serialises as a JSON object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rate {
    pub rate: f64,
}

/// The votes matching a filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteList {
    pub count: u64,
    pub votes: Vec<Vote>,
}

impl From<Vec<Vote>> for VoteList {
    fn from(votes: Vec<Vote>) -> Self {
        Self {
            count: votes.len() as u64,
            votes,
        }
    }
}

/// A region together with its derived figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSummary {
    #[serde(flatten)]
    pub region: Region,
    pub voter_count: u64,
    pub vote_count: u64,
    pub participation_rate: f64,
}

/// A district together with its derived figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistrictSummary {
    #[serde(flatten)]
    pub district: District,
    pub polling_station_ids: Vec<PollingStationId>,
    pub voter_count: u64,
    pub vote_count: u64,
    pub participation_rate: f64,
}

/// A polling station together with its derived figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollingStationSummary {
    #[serde(flatten)]
    pub polling_station: PollingStation,
    pub district_ids: Vec<DistrictId>,
    pub vote_count: u64,
    pub utilization_rate: f64,
}

/// An election together with its derived figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectionSummary {
    #[serde(flatten)]
    pub election: Election,
    pub candidate_ids: Vec<CandidateId>,
    pub total_votes: u64,
    pub participation_rate: f64,
}

/// A candidate together with its derived figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSummary {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub election_ids: Vec<ElectionId>,
    pub vote_count: u64,
}

/// `numerator / denominator`, or 0.0 for an empty denominator.
pub fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
