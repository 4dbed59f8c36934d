use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CandidateId, ElectionId, PollingStationId, Vote, VoterId};

/// A conjunction of optional conditions on votes.
/// Absent fields match every vote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoteFilter {
    #[serde(default)]
    pub voter_id: Option<VoterId>,
    #[serde(default)]
    pub candidate_id: Option<CandidateId>,
    #[serde(default)]
    pub election_id: Option<ElectionId>,
    #[serde(default)]
    pub polling_station_id: Option<PollingStationId>,
    /// Inclusive lower bound on the vote timestamp.
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    /// Inclusive upper bound on the vote timestamp.
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub valid: Option<bool>,
}

impl VoteFilter {
    /// A filter matching every vote.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn voter(mut self, voter_id: VoterId) -> Self {
        self.voter_id = Some(voter_id);
        self
    }

    pub fn candidate(mut self, candidate_id: CandidateId) -> Self {
        self.candidate_id = Some(candidate_id);
        self
    }

    pub fn election(mut self, election_id: ElectionId) -> Self {
        self.election_id = Some(election_id);
        self
    }

    pub fn polling_station(mut self, polling_station_id: PollingStationId) -> Self {
        self.polling_station_id = Some(polling_station_id);
        self
    }

    pub fn between(mut self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        self.start_time = start;
        self.end_time = end;
        self
    }

    pub fn valid_only(mut self) -> Self {
        self.valid = Some(true);
        self
    }

    /// Does the given vote satisfy every condition of this filter?
    pub fn matches(&self, vote: &Vote) -> bool {
        self.voter_id.map_or(true, |id| vote.voter_id == id)
            && self.candidate_id.map_or(true, |id| vote.candidate_id == id)
            && self.election_id.map_or(true, |id| vote.election_id == id)
            && self
                .polling_station_id
                .map_or(true, |id| vote.polling_station_id == id)
            && self.start_time.map_or(true, |start| vote.timestamp >= start)
            && self.end_time.map_or(true, |end| vote.timestamp <= end)
            && self.valid.map_or(true, |valid| vote.valid == valid)
    }
}

/// Canonical form, used as part of cache keys.
impl Display for VoteFilter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        fn field<T: Display>(value: &Option<T>) -> String {
            value
                .as_ref()
                .map_or_else(|| "*".to_string(), ToString::to_string)
        }
        write!(
            f,
            "voter={};candidate={};election={};station={};from={};to={};valid={}",
            field(&self.voter_id),
            field(&self.candidate_id),
            field(&self.election_id),
            field(&self.polling_station_id),
            field(&self.start_time.map(|t| t.timestamp_micros())),
            field(&self.end_time.map(|t| t.timestamp_micros())),
            field(&self.valid),
        )
    }
}
