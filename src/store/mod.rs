//! The persistence collaborator.
//!
//! The services only ever talk to a [`Store`]. Two implementations exist:
//! [`MemoryStore`], which keeps everything in process, and [`MongoStore`],
//! backed by MongoDB. Both enforce the one-valid-vote-per-voter-and-election
//! constraint at write time, so a duplicate that slips past the service's own
//! check is still rejected.

use thiserror::Error;

use crate::model::{
    Candidate, CandidateCore, CandidateId, CandidateVoteCount, District, DistrictCore, DistrictId,
    Election, ElectionCore, ElectionId, ElectionVoteCount, NewVote, PollingStation, PollingStationCore,
    PollingStationId, Region, RegionCore, RegionId, UnitVoteCount, Vote, VoteFilter, VoteId,
    Voter, VoterCore, VoterId,
};

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store did not answer within its configured bound.
    #[error("storage operation timed out")]
    Timeout,
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    /// A unique constraint rejected the write. Carries the constrained field.
    #[error("duplicate key: {0}")]
    DuplicateKey(&'static str),
    /// An optimistic write lost a race with another writer.
    #[error("write conflict")]
    Conflict,
}

/// Name of the constraint guarding one valid vote per voter and election.
pub const VALID_VOTE_KEY: &str = "valid vote for voter and election";

#[rocket::async_trait]
pub trait Store: Send + Sync {
    // Entity lookups.

    async fn region(&self, id: RegionId) -> StoreResult<Option<Region>>;
    async fn district(&self, id: DistrictId) -> StoreResult<Option<District>>;
    async fn polling_station(&self, id: PollingStationId) -> StoreResult<Option<PollingStation>>;
    async fn voter(&self, id: VoterId) -> StoreResult<Option<Voter>>;
    async fn candidate(&self, id: CandidateId) -> StoreResult<Option<Candidate>>;
    async fn election(&self, id: ElectionId) -> StoreResult<Option<Election>>;
    async fn vote(&self, id: VoteId) -> StoreResult<Option<Vote>>;
    /// Every election, in ID order.
    async fn elections(&self) -> StoreResult<Vec<Election>>;

    // Entity creation. IDs are assigned by the store.

    async fn insert_region(&self, region: RegionCore) -> StoreResult<Region>;
    async fn insert_district(&self, district: DistrictCore) -> StoreResult<District>;
    async fn insert_polling_station(
        &self,
        station: PollingStationCore,
    ) -> StoreResult<PollingStation>;
    async fn insert_voter(&self, voter: VoterCore) -> StoreResult<Voter>;
    async fn insert_candidate(&self, candidate: CandidateCore) -> StoreResult<Candidate>;
    async fn insert_election(&self, election: ElectionCore) -> StoreResult<Election>;

    // Entity replacement. Returns `false` if the ID does not exist.

    async fn replace_election(&self, election: &Election) -> StoreResult<bool>;
    async fn replace_polling_station(&self, station: &PollingStation) -> StoreResult<bool>;

    // Join relations.

    async fn election_candidate_ids(&self, election: ElectionId) -> StoreResult<Vec<CandidateId>>;
    async fn candidate_election_ids(&self, candidate: CandidateId) -> StoreResult<Vec<ElectionId>>;
    async fn is_candidate_in_election(
        &self,
        candidate: CandidateId,
        election: ElectionId,
    ) -> StoreResult<bool>;
    /// Replace the candidate set of an election.
    async fn set_election_candidates(
        &self,
        election: ElectionId,
        candidates: &[CandidateId],
    ) -> StoreResult<()>;
    async fn station_district_ids(&self, station: PollingStationId)
        -> StoreResult<Vec<DistrictId>>;
    async fn district_station_ids(&self, district: DistrictId)
        -> StoreResult<Vec<PollingStationId>>;
    /// Replace the district set of a polling station.
    async fn set_station_districts(
        &self,
        station: PollingStationId,
        districts: &[DistrictId],
    ) -> StoreResult<()>;

    // The vote ledger.

    /// Atomically insert a vote.
    ///
    /// Fails with [`StoreError::DuplicateKey`]`(`[`VALID_VOTE_KEY`]`)` if the
    /// vote is valid and a valid vote already exists for its voter and election.
    async fn insert_vote(&self, vote: NewVote) -> StoreResult<Vote>;
    /// Set the validity flag of a vote, returning the updated vote, or `None`
    /// if it does not exist. Same constraint as [`Store::insert_vote`].
    async fn set_vote_validity(&self, id: VoteId, valid: bool) -> StoreResult<Option<Vote>>;
    /// Hard-delete a vote. Returns `false` if it did not exist.
    async fn delete_vote(&self, id: VoteId) -> StoreResult<bool>;
    /// All votes matching the filter, in ID order.
    async fn find_votes(&self, filter: &VoteFilter) -> StoreResult<Vec<Vote>>;
    async fn count_votes(&self, filter: &VoteFilter) -> StoreResult<u64>;

    // Group-by queries over the ledger.

    /// Votes grouped by the region of the voter who cast them, in region ID
    /// order. Regions without votes are absent.
    async fn count_votes_by_region(&self, filter: &VoteFilter) -> StoreResult<Vec<UnitVoteCount>>;
    /// As [`Store::count_votes_by_region`], for districts.
    async fn count_votes_by_district(
        &self,
        filter: &VoteFilter,
    ) -> StoreResult<Vec<UnitVoteCount>>;
    /// Votes of one election grouped by candidate, in candidate ID order.
    /// Candidates without votes are absent.
    async fn count_votes_by_candidate(
        &self,
        filter: &VoteFilter,
    ) -> StoreResult<Vec<CandidateVoteCount>>;
    /// Votes grouped by election, in election ID order. Elections without
    /// votes are absent.
    async fn count_votes_by_election(
        &self,
        filter: &VoteFilter,
    ) -> StoreResult<Vec<ElectionVoteCount>>;
    /// Valid votes cast by voters registered in the region.
    async fn count_valid_votes_in_region(&self, region: RegionId) -> StoreResult<u64>;
    /// Valid votes cast by voters registered in the district.
    async fn count_valid_votes_in_district(&self, district: DistrictId) -> StoreResult<u64>;

    // Voter counts.

    async fn count_voters_in_region(&self, region: RegionId) -> StoreResult<u64>;
    async fn count_voters_in_district(&self, district: DistrictId) -> StoreResult<u64>;
    async fn count_active_voters(&self) -> StoreResult<u64>;
}
