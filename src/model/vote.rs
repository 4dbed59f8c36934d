use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CandidateId, ElectionId, PollingStationId, Record, VoterId};

/// Core vote data, as recorded in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCore {
    pub voter_id: VoterId,
    pub candidate_id: CandidateId,
    pub election_id: ElectionId,
    pub polling_station_id: PollingStationId,
    /// Admission time, assigned by the server.
    pub timestamp: DateTime<Utc>,
    /// Only valid votes count towards rates and statistics, and only one
    /// valid vote may exist per voter and election.
    pub valid: bool,
}

/// A vote without an ID.
pub type NewVote = VoteCore;

/// A vote from the ledger, with its unique ID.
pub type Vote = Record<VoteCore>;

/// A vote that a voter wishes to cast.
///
/// Carries no timestamp or validity: both are decided at admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ballot {
    pub voter_id: VoterId,
    pub candidate_id: CandidateId,
    pub election_id: ElectionId,
    pub polling_station_id: PollingStationId,
}

impl Ballot {
    /// Turn an admitted ballot into a valid vote cast at `timestamp`.
    pub fn into_vote(self, timestamp: DateTime<Utc>) -> NewVote {
        VoteCore {
            voter_id: self.voter_id,
            candidate_id: self.candidate_id,
            election_id: self.election_id,
            polling_station_id: self.polling_station_id,
            timestamp,
            valid: true,
        }
    }
}

/// A validity correction requested by an administrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityUpdate {
    pub valid: bool,
}
