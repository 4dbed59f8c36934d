//! Domain types shared by the store, the services and the HTTP layer.
//!
//! Every entity comes in two shapes: `XCore` (or `NewX`), the data without an
//! ID, and `X = Record<XCore>`, the data as handed out by the store.
//! Relations between entities are addressed by ID only.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

mod candidate;
mod district;
mod election;
mod filter;
pub mod mongodb;
mod polling_station;
mod record;
mod region;
mod statistics;
mod vote;
mod voter;

pub use candidate::{Candidate, CandidateCore, NewCandidate};
pub use district::{District, DistrictCore, NewDistrict};
pub use election::{Election, ElectionCore, ElectionPatch, NewElection};
pub use filter::VoteFilter;
pub use polling_station::{
    NewPollingStation, PollingStation, PollingStationCore, PollingStationPatch,
};
pub use record::Record;
pub use region::{NewRegion, Region, RegionCore};
pub use statistics::{
    ratio, CandidateSummary, CandidateVoteCount, DistrictSummary, ElectionSummary, ElectionVoteCount,
    ParticipationUnit, PollingStationSummary, Rate, RegionSummary, UnitVoteCount, VoteList,
    VoteStatistics,
};
pub use vote::{Ballot, NewVote, ValidityUpdate, Vote, VoteCore};
pub use voter::{NewVoter, Voter, VoterCore};

/// Our IDs are integers, assigned by the store.
pub type RegionId = u32;
pub type DistrictId = u32;
pub type PollingStationId = u32;
pub type VoterId = u32;
pub type CandidateId = u32;
pub type ElectionId = u32;
pub type VoteId = u32;

/// The kinds of entity the ledger refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Region,
    District,
    PollingStation,
    Voter,
    Candidate,
    Election,
    Vote,
}

impl EntityKind {
    pub const ALL: [EntityKind; 7] = [
        EntityKind::Region,
        EntityKind::District,
        EntityKind::PollingStation,
        EntityKind::Voter,
        EntityKind::Candidate,
        EntityKind::Election,
        EntityKind::Vote,
    ];
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntityKind::Region => "region",
            EntityKind::District => "district",
            EntityKind::PollingStation => "polling station",
            EntityKind::Voter => "voter",
            EntityKind::Candidate => "candidate",
            EntityKind::Election => "election",
            EntityKind::Vote => "vote",
        };
        write!(f, "{name}")
    }
}

pub(crate) fn default_true() -> bool {
    true
}
