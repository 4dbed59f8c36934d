use std::collections::{BTreeMap, BTreeSet, HashMap};

use rocket::tokio::sync::RwLock;

use super::{Store, StoreError, StoreResult, VALID_VOTE_KEY};
use crate::model::{
    Candidate, CandidateCore, CandidateId, CandidateVoteCount, District, DistrictCore, DistrictId,
    Election, ElectionCore, ElectionId, ElectionVoteCount, EntityKind, NewVote, PollingStation, PollingStationCore,
    PollingStationId, Record, Region, RegionCore, RegionId, UnitVoteCount, Vote, VoteFilter,
    VoteId, Voter, VoterCore, VoterId,
};

/// A store that keeps every table in process memory.
///
/// All tables sit behind a single lock, so each trait method is atomic with
/// respect to every other one.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Default)]
struct Tables {
    regions: BTreeMap<RegionId, Region>,
    districts: BTreeMap<DistrictId, District>,
    polling_stations: BTreeMap<PollingStationId, PollingStation>,
    voters: BTreeMap<VoterId, Voter>,
    candidates: BTreeMap<CandidateId, Candidate>,
    elections: BTreeMap<ElectionId, Election>,
    votes: BTreeMap<VoteId, Vote>,
    election_candidates: BTreeSet<(ElectionId, CandidateId)>,
    station_districts: BTreeSet<(PollingStationId, DistrictId)>,
    next_ids: HashMap<EntityKind, u32>,
}

impl Tables {
    /// Auto-increment IDs, one sequence per entity kind, starting at 1.
    fn next_id(&mut self, kind: EntityKind) -> u32 {
        let next = self.next_ids.entry(kind).or_insert(0);
        *next += 1;
        *next
    }

    /// Is there a valid vote for the pair, other than `except`?
    fn has_valid_vote(&self, voter: VoterId, election: ElectionId, except: Option<VoteId>) -> bool {
        self.votes.values().any(|vote| {
            vote.valid
                && vote.voter_id == voter
                && vote.election_id == election
                && Some(vote.id) != except
        })
    }

    fn matching_votes<'a>(&'a self, filter: &'a VoteFilter) -> impl Iterator<Item = &'a Vote> {
        self.votes.values().filter(move |vote| filter.matches(vote))
    }

    fn voter_of(&self, vote: &Vote) -> Option<&Voter> {
        self.voters.get(&vote.voter_id)
    }
}

/// Tally `keys` into counts, in key order.
fn tally<K: Ord>(keys: impl Iterator<Item = K>) -> BTreeMap<K, u64> {
    let mut counts = BTreeMap::new();
    for key in keys {
        *counts.entry(key).or_insert(0) += 1;
    }
    counts
}

#[rocket::async_trait]
impl Store for MemoryStore {
    async fn region(&self, id: RegionId) -> StoreResult<Option<Region>> {
        Ok(self.tables.read().await.regions.get(&id).cloned())
    }

    async fn district(&self, id: DistrictId) -> StoreResult<Option<District>> {
        Ok(self.tables.read().await.districts.get(&id).cloned())
    }

    async fn polling_station(&self, id: PollingStationId) -> StoreResult<Option<PollingStation>> {
        Ok(self.tables.read().await.polling_stations.get(&id).cloned())
    }

    async fn voter(&self, id: VoterId) -> StoreResult<Option<Voter>> {
        Ok(self.tables.read().await.voters.get(&id).cloned())
    }

    async fn candidate(&self, id: CandidateId) -> StoreResult<Option<Candidate>> {
        Ok(self.tables.read().await.candidates.get(&id).cloned())
    }

    async fn election(&self, id: ElectionId) -> StoreResult<Option<Election>> {
        Ok(self.tables.read().await.elections.get(&id).cloned())
    }

    async fn vote(&self, id: VoteId) -> StoreResult<Option<Vote>> {
        Ok(self.tables.read().await.votes.get(&id).cloned())
    }

    async fn elections(&self) -> StoreResult<Vec<Election>> {
        Ok(self.tables.read().await.elections.values().cloned().collect())
    }

    async fn insert_region(&self, region: RegionCore) -> StoreResult<Region> {
        let mut tables = self.tables.write().await;
        if tables.regions.values().any(|r| r.name == region.name) {
            return Err(StoreError::DuplicateKey("region name"));
        }
        let record = Record::new(tables.next_id(EntityKind::Region), region);
        tables.regions.insert(record.id, record.clone());
        Ok(record)
    }

    async fn insert_district(&self, district: DistrictCore) -> StoreResult<District> {
        let mut tables = self.tables.write().await;
        let record = Record::new(tables.next_id(EntityKind::District), district);
        tables.districts.insert(record.id, record.clone());
        Ok(record)
    }

    async fn insert_polling_station(
        &self,
        station: PollingStationCore,
    ) -> StoreResult<PollingStation> {
        let mut tables = self.tables.write().await;
        let record = Record::new(tables.next_id(EntityKind::PollingStation), station);
        tables.polling_stations.insert(record.id, record.clone());
        Ok(record)
    }

    async fn insert_voter(&self, voter: VoterCore) -> StoreResult<Voter> {
        let mut tables = self.tables.write().await;
        if tables
            .voters
            .values()
            .any(|v| v.identification_number == voter.identification_number)
        {
            return Err(StoreError::DuplicateKey("voter identification number"));
        }
        let record = Record::new(tables.next_id(EntityKind::Voter), voter);
        tables.voters.insert(record.id, record.clone());
        Ok(record)
    }

    async fn insert_candidate(&self, candidate: CandidateCore) -> StoreResult<Candidate> {
        let mut tables = self.tables.write().await;
        let record = Record::new(tables.next_id(EntityKind::Candidate), candidate);
        tables.candidates.insert(record.id, record.clone());
        Ok(record)
    }

    async fn insert_election(&self, election: ElectionCore) -> StoreResult<Election> {
        let mut tables = self.tables.write().await;
        let record = Record::new(tables.next_id(EntityKind::Election), election);
        tables.elections.insert(record.id, record.clone());
        Ok(record)
    }

    async fn replace_election(&self, election: &Election) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        Ok(match tables.elections.get_mut(&election.id) {
            Some(existing) => {
                *existing = election.clone();
                true
            }
            None => false,
        })
    }

    async fn replace_polling_station(&self, station: &PollingStation) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        Ok(match tables.polling_stations.get_mut(&station.id) {
            Some(existing) => {
                *existing = station.clone();
                true
            }
            None => false,
        })
    }

    async fn election_candidate_ids(&self, election: ElectionId) -> StoreResult<Vec<CandidateId>> {
        let tables = self.tables.read().await;
        Ok(tables
            .election_candidates
            .range((election, CandidateId::MIN)..=(election, CandidateId::MAX))
            .map(|&(_, candidate)| candidate)
            .collect())
    }

    async fn candidate_election_ids(&self, candidate: CandidateId) -> StoreResult<Vec<ElectionId>> {
        let tables = self.tables.read().await;
        Ok(tables
            .election_candidates
            .iter()
            .filter(|&&(_, c)| c == candidate)
            .map(|&(election, _)| election)
            .collect())
    }

    async fn is_candidate_in_election(
        &self,
        candidate: CandidateId,
        election: ElectionId,
    ) -> StoreResult<bool> {
        let tables = self.tables.read().await;
        Ok(tables.election_candidates.contains(&(election, candidate)))
    }

    async fn set_election_candidates(
        &self,
        election: ElectionId,
        candidates: &[CandidateId],
    ) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.election_candidates.retain(|&(e, _)| e != election);
        tables
            .election_candidates
            .extend(candidates.iter().map(|&c| (election, c)));
        Ok(())
    }

    async fn station_district_ids(
        &self,
        station: PollingStationId,
    ) -> StoreResult<Vec<DistrictId>> {
        let tables = self.tables.read().await;
        Ok(tables
            .station_districts
            .range((station, DistrictId::MIN)..=(station, DistrictId::MAX))
            .map(|&(_, district)| district)
            .collect())
    }

    async fn district_station_ids(
        &self,
        district: DistrictId,
    ) -> StoreResult<Vec<PollingStationId>> {
        let tables = self.tables.read().await;
        Ok(tables
            .station_districts
            .iter()
            .filter(|&&(_, d)| d == district)
            .map(|&(station, _)| station)
            .collect())
    }

    async fn set_station_districts(
        &self,
        station: PollingStationId,
        districts: &[DistrictId],
    ) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.station_districts.retain(|&(s, _)| s != station);
        tables
            .station_districts
            .extend(districts.iter().map(|&d| (station, d)));
        Ok(())
    }

    async fn insert_vote(&self, vote: NewVote) -> StoreResult<Vote> {
        let mut tables = self.tables.write().await;
        if vote.valid && tables.has_valid_vote(vote.voter_id, vote.election_id, None) {
            return Err(StoreError::DuplicateKey(VALID_VOTE_KEY));
        }
        let record = Record::new(tables.next_id(EntityKind::Vote), vote);
        tables.votes.insert(record.id, record.clone());
        Ok(record)
    }

    async fn set_vote_validity(&self, id: VoteId, valid: bool) -> StoreResult<Option<Vote>> {
        let mut tables = self.tables.write().await;
        let (voter, election) = match tables.votes.get(&id) {
            Some(vote) => (vote.voter_id, vote.election_id),
            None => return Ok(None),
        };
        if valid && tables.has_valid_vote(voter, election, Some(id)) {
            return Err(StoreError::DuplicateKey(VALID_VOTE_KEY));
        }
        Ok(tables.votes.get_mut(&id).map(|vote| {
            vote.valid = valid;
            vote.clone()
        }))
    }

    async fn delete_vote(&self, id: VoteId) -> StoreResult<bool> {
        Ok(self.tables.write().await.votes.remove(&id).is_some())
    }

    async fn find_votes(&self, filter: &VoteFilter) -> StoreResult<Vec<Vote>> {
        let tables = self.tables.read().await;
        Ok(tables.matching_votes(filter).cloned().collect())
    }

    async fn count_votes(&self, filter: &VoteFilter) -> StoreResult<u64> {
        let tables = self.tables.read().await;
        Ok(tables.matching_votes(filter).count() as u64)
    }

    async fn count_votes_by_region(&self, filter: &VoteFilter) -> StoreResult<Vec<UnitVoteCount>> {
        let tables = self.tables.read().await;
        let counts = tally(
            tables
                .matching_votes(filter)
                .filter_map(|vote| tables.voter_of(vote)?.region_id),
        );
        Ok(counts
            .into_iter()
            .filter_map(|(id, votes)| {
                let region = tables.regions.get(&id)?;
                Some(UnitVoteCount {
                    id,
                    name: region.name.clone(),
                    votes,
                })
            })
            .collect())
    }

    async fn count_votes_by_district(
        &self,
        filter: &VoteFilter,
    ) -> StoreResult<Vec<UnitVoteCount>> {
        let tables = self.tables.read().await;
        let counts = tally(
            tables
                .matching_votes(filter)
                .filter_map(|vote| tables.voter_of(vote)?.district_id),
        );
        Ok(counts
            .into_iter()
            .filter_map(|(id, votes)| {
                let district = tables.districts.get(&id)?;
                Some(UnitVoteCount {
                    id,
                    name: district.name.clone(),
                    votes,
                })
            })
            .collect())
    }

    async fn count_votes_by_candidate(
        &self,
        filter: &VoteFilter,
    ) -> StoreResult<Vec<CandidateVoteCount>> {
        let tables = self.tables.read().await;
        let counts = tally(tables.matching_votes(filter).map(|vote| vote.candidate_id));
        Ok(counts
            .into_iter()
            .filter_map(|(candidate_id, votes)| {
                let candidate = tables.candidates.get(&candidate_id)?;
                Some(CandidateVoteCount {
                    candidate_id,
                    first_name: candidate.first_name.clone(),
                    last_name: candidate.last_name.clone(),
                    votes,
                })
            })
            .collect())
    }

    async fn count_votes_by_election(
        &self,
        filter: &VoteFilter,
    ) -> StoreResult<Vec<ElectionVoteCount>> {
        let tables = self.tables.read().await;
        let counts = tally(tables.matching_votes(filter).map(|vote| vote.election_id));
        Ok(counts
            .into_iter()
            .map(|(election_id, votes)| ElectionVoteCount { election_id, votes })
            .collect())
    }

    async fn count_valid_votes_in_region(&self, region: RegionId) -> StoreResult<u64> {
        let tables = self.tables.read().await;
        let filter = VoteFilter::all().valid_only();
        Ok(tables
            .matching_votes(&filter)
            .filter(|vote| {
                tables
                    .voter_of(vote)
                    .map_or(false, |voter| voter.region_id == Some(region))
            })
            .count() as u64)
    }

    async fn count_valid_votes_in_district(&self, district: DistrictId) -> StoreResult<u64> {
        let tables = self.tables.read().await;
        let filter = VoteFilter::all().valid_only();
        Ok(tables
            .matching_votes(&filter)
            .filter(|vote| {
                tables
                    .voter_of(vote)
                    .map_or(false, |voter| voter.district_id == Some(district))
            })
            .count() as u64)
    }

    async fn count_voters_in_region(&self, region: RegionId) -> StoreResult<u64> {
        let tables = self.tables.read().await;
        Ok(tables
            .voters
            .values()
            .filter(|voter| voter.region_id == Some(region))
            .count() as u64)
    }

    async fn count_voters_in_district(&self, district: DistrictId) -> StoreResult<u64> {
        let tables = self.tables.read().await;
        Ok(tables
            .voters
            .values()
            .filter(|voter| voter.district_id == Some(district))
            .count() as u64)
    }

    async fn count_active_voters(&self) -> StoreResult<u64> {
        let tables = self.tables.read().await;
        Ok(tables.voters.values().filter(|voter| voter.active).count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::model::Ballot;

    fn ballot(voter_id: VoterId, election_id: ElectionId) -> Ballot {
        Ballot {
            voter_id,
            candidate_id: 1,
            election_id,
            polling_station_id: 1,
        }
    }

    #[rocket::async_test]
    async fn ids_are_assigned_per_kind() {
        let store = MemoryStore::new();
        let r1 = store.insert_region(RegionCore::example("North")).await.unwrap();
        let r2 = store.insert_region(RegionCore::example("South")).await.unwrap();
        let e1 = store
            .insert_election(ElectionCore::example("General", true))
            .await
            .unwrap();
        assert_eq!((r1.id, r2.id, e1.id), (1, 2, 1));
    }

    #[rocket::async_test]
    async fn unique_fields_are_enforced() {
        let store = MemoryStore::new();
        store.insert_region(RegionCore::example("North")).await.unwrap();
        assert_eq!(
            store.insert_region(RegionCore::example("North")).await,
            Err(StoreError::DuplicateKey("region name"))
        );

        store
            .insert_voter(VoterCore::example("ID-1", None, None))
            .await
            .unwrap();
        assert!(matches!(
            store.insert_voter(VoterCore::example("ID-1", None, None)).await,
            Err(StoreError::DuplicateKey(_))
        ));
    }

    #[rocket::async_test]
    async fn second_valid_vote_is_rejected() {
        let store = MemoryStore::new();
        store.insert_vote(ballot(1, 1).into_vote(Utc::now())).await.unwrap();
        assert_eq!(
            store.insert_vote(ballot(1, 1).into_vote(Utc::now())).await,
            Err(StoreError::DuplicateKey(VALID_VOTE_KEY))
        );

        // Other pairs are unaffected.
        store.insert_vote(ballot(1, 2).into_vote(Utc::now())).await.unwrap();
        store.insert_vote(ballot(2, 1).into_vote(Utc::now())).await.unwrap();
        assert_eq!(store.count_votes(&VoteFilter::all()).await.unwrap(), 3);
    }

    #[rocket::async_test]
    async fn revalidation_respects_the_constraint() {
        let store = MemoryStore::new();
        let first = store.insert_vote(ballot(1, 1).into_vote(Utc::now())).await.unwrap();
        store.set_vote_validity(first.id, false).await.unwrap().unwrap();
        let second = store.insert_vote(ballot(1, 1).into_vote(Utc::now())).await.unwrap();

        assert_eq!(
            store.set_vote_validity(first.id, true).await,
            Err(StoreError::DuplicateKey(VALID_VOTE_KEY))
        );
        let updated = store.set_vote_validity(second.id, true).await.unwrap().unwrap();
        assert!(updated.valid);
        assert_eq!(store.set_vote_validity(99, true).await, Ok(None));
    }

    #[rocket::async_test]
    async fn relations_are_replaced_wholesale() {
        let store = MemoryStore::new();
        store.set_election_candidates(1, &[1, 2, 3]).await.unwrap();
        store.set_election_candidates(2, &[2]).await.unwrap();
        store.set_election_candidates(1, &[3, 4]).await.unwrap();

        assert_eq!(store.election_candidate_ids(1).await.unwrap(), vec![3, 4]);
        assert_eq!(store.candidate_election_ids(2).await.unwrap(), vec![2]);
        assert!(!store.is_candidate_in_election(1, 1).await.unwrap());
        assert!(store.is_candidate_in_election(4, 1).await.unwrap());
    }
}
