//! Shared test fixtures.

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use chrono::Utc;
use mongodb::{Client as MongoClient, Database};
use rocket::local::asynchronous::Client;

use crate::cache::MemoryCache;
use crate::config::Config;
use crate::model::mongodb::ensure_indexes_exist;
use crate::model::{
    Ballot, Candidate, CandidateCore, CandidateId, CandidateVoteCount, District, DistrictCore,
    DistrictId, Election, ElectionCore, ElectionId, ElectionVoteCount, NewVote, PollingStation,
    PollingStationCore, PollingStationId, Region, RegionCore, RegionId, UnitVoteCount, Vote,
    VoteFilter, VoteId, Voter, VoterCore, VoterId,
};
use crate::service::{Aggregator, Registry, VoteAdmission};
use crate::store::{MemoryStore, MongoStore, Store, StoreError, StoreResult};

/// Environment variable naming the MongoDB deployment that database-backed
/// tests run against. Those tests are skipped when it is unset.
pub const TEST_DB_URI_VAR: &str = "TALLY_TEST_DB_URI";

/// A fresh, indexed database on the test deployment, if one is configured.
pub async fn test_database() -> Option<Database> {
    static NEXT_DATABASE: AtomicUsize = AtomicUsize::new(0);

    let uri = std::env::var(TEST_DB_URI_VAR).ok()?;
    let client = MongoClient::with_uri_str(uri)
        .await
        .expect("Failed to connect to the test database");
    let name = format!(
        "tally_test_{}_{}",
        std::process::id(),
        NEXT_DATABASE.fetch_add(1, Ordering::Relaxed)
    );
    let db = client.database(&name);
    ensure_indexes_exist(&db)
        .await
        .expect("Failed to create test database indexes");
    Some(db)
}

/// A seeded store and an in-memory cache:
///
/// * regions North and South, with districts Northgate and Southbank;
/// * polling stations Central (capacity 100, Northgate) and Annex
///   (capacity 0, Southbank);
/// * voters 0-2 in North/Northgate, voter 3 in South/Southbank, and an
///   inactive voter 4 with neither;
/// * candidates Alice Archer, Bob Baker and Carol Cole;
/// * the active election "General" with Alice and Bob, and the inactive
///   election "Runoff" with Alice.
pub struct Fixture {
    pub store: Arc<dyn Store>,
    pub cache: Arc<MemoryCache>,
    pub config: Config,
    pub regions: Vec<RegionId>,
    pub districts: Vec<DistrictId>,
    pub stations: Vec<PollingStationId>,
    pub voters: Vec<VoterId>,
    pub candidates: Vec<CandidateId>,
    pub active_election: ElectionId,
    pub inactive_election: ElectionId,
}

/// Voter IDs used by [`Fixture::insert_votes`], clear of registered voters.
const ANONYMOUS_VOTERS: VoterId = 10_000;

impl Fixture {
    /// The fixture over an in-memory store.
    pub async fn new() -> Self {
        Self::seeded(Arc::new(MemoryStore::new())).await
    }

    /// The fixture over `db`, which must be empty.
    pub async fn mongo(db: Database) -> Self {
        Self::seeded(Arc::new(MongoStore::new(db, Duration::from_secs(5)))).await
    }

    async fn seeded(store: Arc<dyn Store>) -> Self {
        let mut regions = vec![];
        for name in ["North", "South"] {
            let region = store.insert_region(RegionCore::example(name)).await.unwrap();
            regions.push(region.id);
        }

        let mut districts = vec![];
        let placements = [("Northgate", "NG", regions[0]), ("Southbank", "SB", regions[1])];
        for (name, code, region) in placements {
            let district = store
                .insert_district(DistrictCore::example(name, code, region))
                .await
                .unwrap();
            districts.push(district.id);
        }

        let mut stations = vec![];
        let placements = [("Central", 100, districts[0]), ("Annex", 0, districts[1])];
        for (name, capacity, district) in placements {
            let station = store
                .insert_polling_station(PollingStationCore::example(name, Some(capacity)))
                .await
                .unwrap();
            store
                .set_station_districts(station.id, &[district])
                .await
                .unwrap();
            stations.push(station.id);
        }

        let mut voters = vec![];
        let placements = [
            (Some(regions[0]), Some(districts[0])),
            (Some(regions[0]), Some(districts[0])),
            (Some(regions[0]), Some(districts[0])),
            (Some(regions[1]), Some(districts[1])),
            (None, None),
        ];
        for (i, (region, district)) in placements.into_iter().enumerate() {
            let mut voter = VoterCore::example(&format!("ID-{i}"), region, district);
            voter.active = region.is_some();
            voters.push(store.insert_voter(voter).await.unwrap().id);
        }

        let mut candidates = vec![];
        for (first, last, party) in [
            ("Alice", "Archer", "Blue"),
            ("Bob", "Baker", "Red"),
            ("Carol", "Cole", "Yellow"),
        ] {
            let candidate = store
                .insert_candidate(CandidateCore::example(first, last, party))
                .await
                .unwrap();
            candidates.push(candidate.id);
        }

        let active = store
            .insert_election(ElectionCore::example("General", true))
            .await
            .unwrap();
        store
            .set_election_candidates(active.id, &candidates[..2])
            .await
            .unwrap();
        let inactive = store
            .insert_election(ElectionCore::example("Runoff", false))
            .await
            .unwrap();
        store
            .set_election_candidates(inactive.id, &candidates[..1])
            .await
            .unwrap();

        let config = Config::example(None);
        Self {
            store,
            cache: Arc::new(MemoryCache::new(config.cache_capacity())),
            config,
            regions,
            districts,
            stations,
            voters,
            candidates,
            active_election: active.id,
            inactive_election: inactive.id,
        }
    }

    /// An eligible ballot: voter 0 votes for Alice in the active election at
    /// Central.
    pub fn ballot(&self) -> Ballot {
        Ballot {
            voter_id: self.voters[0],
            candidate_id: self.candidates[0],
            election_id: self.active_election,
            polling_station_id: self.stations[0],
        }
    }

    pub fn admission(&self) -> VoteAdmission {
        VoteAdmission::new(self.store.clone(), self.cache.clone())
    }

    pub fn aggregator(&self) -> Aggregator {
        Aggregator::new(self.store.clone(), self.cache.clone(), &self.config)
    }

    pub fn registry(&self) -> Registry {
        Registry::new(self.store.clone(), self.cache.clone())
    }

    /// A local client for a server sharing this fixture's store and cache.
    pub async fn client(&self) -> Client {
        let rocket = crate::rocket_for(
            self.store.clone(),
            self.cache.clone(),
            self.config.clone(),
        );
        Client::tracked(rocket).await.unwrap()
    }

    /// Write `count` valid votes for `candidate` in the active election
    /// straight into the store, each from a distinct unregistered voter.
    pub async fn insert_votes(
        &self,
        candidate: CandidateId,
        station: PollingStationId,
        count: usize,
    ) -> Vec<VoteId> {
        let mut ids = Vec::with_capacity(count);
        for _ in 0..count {
            let cast = self.store.count_votes(&VoteFilter::all()).await.unwrap();
            let voter_id = ANONYMOUS_VOTERS + cast as VoterId;
            let ballot = Ballot {
                voter_id,
                candidate_id: candidate,
                election_id: self.active_election,
                polling_station_id: station,
            };
            let vote = self
                .store
                .insert_vote(ballot.into_vote(Utc::now()))
                .await
                .unwrap();
            ids.push(vote.id);
        }
        ids
    }
}

/// Which calls a [`TimeoutStore`] lets time out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fault {
    LedgerWrites,
    Lookups,
}

/// A store that passes every call through, except one family of calls that
/// always times out.
pub struct TimeoutStore {
    inner: Arc<dyn Store>,
    fault: Fault,
}

impl TimeoutStore {
    /// Reads succeed, but every vote ledger write times out.
    pub fn ledger_writes(inner: Arc<dyn Store>) -> Self {
        Self {
            inner,
            fault: Fault::LedgerWrites,
        }
    }

    /// Lookups of single entities by ID time out; everything else succeeds.
    pub fn lookups(inner: Arc<dyn Store>) -> Self {
        Self {
            inner,
            fault: Fault::Lookups,
        }
    }

    fn check(&self, fault: Fault) -> StoreResult<()> {
        if self.fault == fault {
            Err(StoreError::Timeout)
        } else {
            Ok(())
        }
    }
}

#[rocket::async_trait]
impl Store for TimeoutStore {
    async fn region(&self, id: RegionId) -> StoreResult<Option<Region>> {
        self.check(Fault::Lookups)?;
        self.inner.region(id).await
    }
    async fn district(&self, id: DistrictId) -> StoreResult<Option<District>> {
        self.check(Fault::Lookups)?;
        self.inner.district(id).await
    }
    async fn polling_station(&self, id: PollingStationId) -> StoreResult<Option<PollingStation>> {
        self.check(Fault::Lookups)?;
        self.inner.polling_station(id).await
    }
    async fn voter(&self, id: VoterId) -> StoreResult<Option<Voter>> {
        self.check(Fault::Lookups)?;
        self.inner.voter(id).await
    }
    async fn candidate(&self, id: CandidateId) -> StoreResult<Option<Candidate>> {
        self.check(Fault::Lookups)?;
        self.inner.candidate(id).await
    }
    async fn election(&self, id: ElectionId) -> StoreResult<Option<Election>> {
        self.check(Fault::Lookups)?;
        self.inner.election(id).await
    }
    async fn vote(&self, id: VoteId) -> StoreResult<Option<Vote>> {
        self.check(Fault::Lookups)?;
        self.inner.vote(id).await
    }
    async fn elections(&self) -> StoreResult<Vec<Election>> {
        self.inner.elections().await
    }

    async fn insert_region(&self, region: RegionCore) -> StoreResult<Region> {
        self.inner.insert_region(region).await
    }
    async fn insert_district(&self, district: DistrictCore) -> StoreResult<District> {
        self.inner.insert_district(district).await
    }
    async fn insert_polling_station(
        &self,
        station: PollingStationCore,
    ) -> StoreResult<PollingStation> {
        self.inner.insert_polling_station(station).await
    }
    async fn insert_voter(&self, voter: VoterCore) -> StoreResult<Voter> {
        self.inner.insert_voter(voter).await
    }
    async fn insert_candidate(&self, candidate: CandidateCore) -> StoreResult<Candidate> {
        self.inner.insert_candidate(candidate).await
    }
    async fn insert_election(&self, election: ElectionCore) -> StoreResult<Election> {
        self.inner.insert_election(election).await
    }
    async fn replace_election(&self, election: &Election) -> StoreResult<bool> {
        self.inner.replace_election(election).await
    }
    async fn replace_polling_station(&self, station: &PollingStation) -> StoreResult<bool> {
        self.inner.replace_polling_station(station).await
    }

    async fn election_candidate_ids(&self, election: ElectionId) -> StoreResult<Vec<CandidateId>> {
        self.inner.election_candidate_ids(election).await
    }
    async fn candidate_election_ids(&self, candidate: CandidateId) -> StoreResult<Vec<ElectionId>> {
        self.inner.candidate_election_ids(candidate).await
    }
    async fn is_candidate_in_election(
        &self,
        candidate: CandidateId,
        election: ElectionId,
    ) -> StoreResult<bool> {
        self.inner.is_candidate_in_election(candidate, election).await
    }
    async fn set_election_candidates(
        &self,
        election: ElectionId,
        candidates: &[CandidateId],
    ) -> StoreResult<()> {
        self.inner.set_election_candidates(election, candidates).await
    }
    async fn station_district_ids(
        &self,
        station: PollingStationId,
    ) -> StoreResult<Vec<DistrictId>> {
        self.inner.station_district_ids(station).await
    }
    async fn district_station_ids(
        &self,
        district: DistrictId,
    ) -> StoreResult<Vec<PollingStationId>> {
        self.inner.district_station_ids(district).await
    }
    async fn set_station_districts(
        &self,
        station: PollingStationId,
        districts: &[DistrictId],
    ) -> StoreResult<()> {
        self.inner.set_station_districts(station, districts).await
    }

    async fn insert_vote(&self, vote: NewVote) -> StoreResult<Vote> {
        self.check(Fault::LedgerWrites)?;
        self.inner.insert_vote(vote).await
    }
    async fn set_vote_validity(&self, id: VoteId, valid: bool) -> StoreResult<Option<Vote>> {
        self.check(Fault::LedgerWrites)?;
        self.inner.set_vote_validity(id, valid).await
    }
    async fn delete_vote(&self, id: VoteId) -> StoreResult<bool> {
        self.check(Fault::LedgerWrites)?;
        self.inner.delete_vote(id).await
    }
    async fn find_votes(&self, filter: &VoteFilter) -> StoreResult<Vec<Vote>> {
        self.inner.find_votes(filter).await
    }
    async fn count_votes(&self, filter: &VoteFilter) -> StoreResult<u64> {
        self.inner.count_votes(filter).await
    }

    async fn count_votes_by_region(&self, filter: &VoteFilter) -> StoreResult<Vec<UnitVoteCount>> {
        self.inner.count_votes_by_region(filter).await
    }
    async fn count_votes_by_district(
        &self,
        filter: &VoteFilter,
    ) -> StoreResult<Vec<UnitVoteCount>> {
        self.inner.count_votes_by_district(filter).await
    }
    async fn count_votes_by_candidate(
        &self,
        filter: &VoteFilter,
    ) -> StoreResult<Vec<CandidateVoteCount>> {
        self.inner.count_votes_by_candidate(filter).await
    }
    async fn count_votes_by_election(
        &self,
        filter: &VoteFilter,
    ) -> StoreResult<Vec<ElectionVoteCount>> {
        self.inner.count_votes_by_election(filter).await
    }
    async fn count_valid_votes_in_region(&self, region: RegionId) -> StoreResult<u64> {
        self.inner.count_valid_votes_in_region(region).await
    }
    async fn count_valid_votes_in_district(&self, district: DistrictId) -> StoreResult<u64> {
        self.inner.count_valid_votes_in_district(district).await
    }

    async fn count_voters_in_region(&self, region: RegionId) -> StoreResult<u64> {
        self.inner.count_voters_in_region(region).await
    }
    async fn count_voters_in_district(&self, district: DistrictId) -> StoreResult<u64> {
        self.inner.count_voters_in_district(district).await
    }
    async fn count_active_voters(&self) -> StoreResult<u64> {
        self.inner.count_active_voters().await
    }
}
