use std::{future::Future, time::Duration};

use log::{error, warn};
use mongodb::{
    bson::{self, doc, Document},
    error::Error as DbError,
    options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument},
    Database,
};
use rocket::{futures::TryStreamExt, tokio::time::timeout};
use serde::de::DeserializeOwned;

use super::{Store, StoreError, StoreResult, VALID_VOTE_KEY};
use crate::model::{
    mongodb::{
        is_duplicate_key_error, Coll, Counter, DbRecord, ElectionCandidate, MongoCollection,
        StationDistrict, VoteDoc,
    },
    Candidate, CandidateCore, CandidateId, CandidateVoteCount, District, DistrictCore, DistrictId,
    Election, ElectionCore, ElectionId, ElectionVoteCount, NewVote, PollingStation,
    PollingStationCore, PollingStationId, Record, Region, RegionCore, RegionId, UnitVoteCount,
    Vote, VoteFilter, VoteId, Voter, VoterCore, VoterId,
};

/// A store backed by MongoDB.
///
/// Every operation is bounded by the configured timeout; an operation that
/// exceeds it fails with [`StoreError::Timeout`].
#[derive(Clone)]
pub struct MongoStore {
    db: Database,
    timeout: Duration,
}

impl MongoStore {
    pub fn new(db: Database, timeout: Duration) -> Self {
        Self { db, timeout }
    }

    fn coll<T: MongoCollection>(&self) -> Coll<T> {
        Coll::from_db(&self.db)
    }

    /// Run a database operation within the timeout bound.
    async fn bounded<T>(&self, op: impl Future<Output = Result<T, DbError>>) -> StoreResult<T> {
        self.bounded_unique(None, op).await
    }

    /// As [`MongoStore::bounded`], mapping duplicate key errors to
    /// [`StoreError::DuplicateKey`] with the given constraint name.
    async fn bounded_unique<T>(
        &self,
        unique: Option<&'static str>,
        op: impl Future<Output = Result<T, DbError>>,
    ) -> StoreResult<T> {
        match timeout(self.timeout, op).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => match unique {
                Some(key) if is_duplicate_key_error(&err) => Err(StoreError::DuplicateKey(key)),
                _ => {
                    error!("Database error: {err}");
                    Err(StoreError::Unavailable(err.to_string()))
                }
            },
            Err(_) => {
                warn!("Database operation exceeded {:?}", self.timeout);
                Err(StoreError::Timeout)
            }
        }
    }

    /// Allocate the next ID of the given collection.
    async fn next_id<T: MongoCollection>(&self) -> StoreResult<u32> {
        let counters = self.coll::<Counter>();
        self.bounded(Counter::next(&counters, T::NAME))
            .await?
            .ok_or_else(|| StoreError::Unavailable(format!("no counter for {}", T::NAME)))
    }

    async fn find_record<T>(&self, id: u32) -> StoreResult<Option<Record<T>>>
    where
        T: DeserializeOwned + Unpin + Send + Sync,
        DbRecord<T>: MongoCollection,
    {
        let coll = self.coll::<DbRecord<T>>();
        let record = self.bounded(coll.find_one(doc! {"_id": id}, None)).await?;
        Ok(record.map(Into::into))
    }

    async fn insert_record<T>(&self, data: T, unique: Option<&'static str>) -> StoreResult<Record<T>>
    where
        T: serde::Serialize + DeserializeOwned + Clone + Unpin + Send + Sync,
        DbRecord<T>: MongoCollection,
    {
        let id = self.next_id::<DbRecord<T>>().await?;
        let record = Record::new(id, data);
        let coll = self.coll::<DbRecord<T>>();
        self.bounded_unique(unique, coll.insert_one(DbRecord::from(record.clone()), None))
            .await?;
        Ok(record)
    }

    async fn replace_record<T>(&self, record: &Record<T>) -> StoreResult<bool>
    where
        T: serde::Serialize + DeserializeOwned + Clone + Unpin + Send + Sync,
        DbRecord<T>: MongoCollection,
    {
        let coll = self.coll::<DbRecord<T>>();
        let result = self
            .bounded(coll.replace_one(
                doc! {"_id": record.id},
                DbRecord::from(record.clone()),
                None,
            ))
            .await?;
        Ok(result.matched_count > 0)
    }

    /// Run an aggregation over the votes collection and deserialise each
    /// output document.
    async fn aggregate_votes<T: DeserializeOwned>(
        &self,
        pipeline: Vec<Document>,
    ) -> StoreResult<Vec<T>> {
        let votes = self.coll::<VoteDoc>();
        self.bounded(async {
            let docs: Vec<Document> = votes.aggregate(pipeline, None).await?.try_collect().await?;
            docs.into_iter()
                .map(|doc| bson::from_document(doc).map_err(DbError::from))
                .collect()
        })
        .await
    }

    /// Count the valid votes cast by voters whose `field` equals `id`.
    async fn count_valid_votes_by_voter_field(&self, field: &str, id: u32) -> StoreResult<u64> {
        let mut voter_match = Document::new();
        voter_match.insert(format!("voter.{field}"), id);
        let pipeline = vec![
            doc! {"$match": {"valid": true}},
            lookup_voter(),
            doc! {"$unwind": "$voter"},
            doc! {"$match": voter_match},
            doc! {"$count": "votes"},
        ];
        let counts: Vec<Document> = self.aggregate_votes(pipeline).await?;
        Ok(counts
            .first()
            .and_then(|doc| doc.get("votes"))
            .and_then(bson_count)
            .unwrap_or(0))
    }

    /// Group votes matching `filter` by a field of the voter who cast them,
    /// and name each group from `unit_collection`.
    async fn count_votes_by_voter_field(
        &self,
        filter: &VoteFilter,
        field: &str,
        unit_collection: &str,
    ) -> StoreResult<Vec<UnitVoteCount>> {
        let pipeline = vec![
            doc! {"$match": filter_doc(filter)},
            lookup_voter(),
            doc! {"$unwind": "$voter"},
            doc! {"$group": {"_id": format!("$voter.{field}"), "votes": {"$sum": 1}}},
            doc! {"$lookup": {
                "from": unit_collection,
                "localField": "_id",
                "foreignField": "_id",
                "as": "unit",
            }},
            doc! {"$unwind": "$unit"},
            doc! {"$project": {"_id": 0, "id": "$_id", "name": "$unit.name", "votes": 1}},
            doc! {"$sort": {"id": 1}},
        ];
        self.aggregate_votes(pipeline).await
    }
}

fn lookup_voter() -> Document {
    doc! {"$lookup": {
        "from": DbRecord::<VoterCore>::NAME,
        "localField": "voter_id",
        "foreignField": "_id",
        "as": "voter",
    }}
}

fn bson_count(value: &bson::Bson) -> Option<u64> {
    match value {
        bson::Bson::Int32(n) => u64::try_from(*n).ok(),
        bson::Bson::Int64(n) => u64::try_from(*n).ok(),
        _ => None,
    }
}

/// Translate a vote filter into a query document.
fn filter_doc(filter: &VoteFilter) -> Document {
    let mut query = Document::new();
    if let Some(id) = filter.voter_id {
        query.insert("voter_id", id);
    }
    if let Some(id) = filter.candidate_id {
        query.insert("candidate_id", id);
    }
    if let Some(id) = filter.election_id {
        query.insert("election_id", id);
    }
    if let Some(id) = filter.polling_station_id {
        query.insert("polling_station_id", id);
    }
    let mut range = Document::new();
    if let Some(start) = filter.start_time {
        range.insert("$gte", bson::DateTime::from_chrono(start));
    }
    if let Some(end) = filter.end_time {
        range.insert("$lte", bson::DateTime::from_chrono(end));
    }
    if !range.is_empty() {
        query.insert("timestamp", range);
    }
    if let Some(valid) = filter.valid {
        query.insert("valid", valid);
    }
    query
}

#[rocket::async_trait]
impl Store for MongoStore {
    async fn region(&self, id: RegionId) -> StoreResult<Option<Region>> {
        self.find_record(id).await
    }

    async fn district(&self, id: DistrictId) -> StoreResult<Option<District>> {
        self.find_record(id).await
    }

    async fn polling_station(&self, id: PollingStationId) -> StoreResult<Option<PollingStation>> {
        self.find_record(id).await
    }

    async fn voter(&self, id: VoterId) -> StoreResult<Option<Voter>> {
        self.find_record(id).await
    }

    async fn candidate(&self, id: CandidateId) -> StoreResult<Option<Candidate>> {
        self.find_record(id).await
    }

    async fn election(&self, id: ElectionId) -> StoreResult<Option<Election>> {
        self.find_record(id).await
    }

    async fn vote(&self, id: VoteId) -> StoreResult<Option<Vote>> {
        let votes = self.coll::<VoteDoc>();
        let vote = self.bounded(votes.find_one(doc! {"_id": id}, None)).await?;
        Ok(vote.map(Into::into))
    }

    async fn elections(&self) -> StoreResult<Vec<Election>> {
        let elections = self.coll::<DbRecord<ElectionCore>>();
        let options = FindOptions::builder().sort(doc! {"_id": 1}).build();
        let records: Vec<DbRecord<ElectionCore>> = self
            .bounded(async {
                elections
                    .find(doc! {}, options)
                    .await?
                    .try_collect()
                    .await
            })
            .await?;
        Ok(records.into_iter().map(Into::into).collect())
    }

    async fn insert_region(&self, region: RegionCore) -> StoreResult<Region> {
        self.insert_record(region, Some("region name")).await
    }

    async fn insert_district(&self, district: DistrictCore) -> StoreResult<District> {
        self.insert_record(district, None).await
    }

    async fn insert_polling_station(
        &self,
        station: PollingStationCore,
    ) -> StoreResult<PollingStation> {
        self.insert_record(station, None).await
    }

    async fn insert_voter(&self, voter: VoterCore) -> StoreResult<Voter> {
        self.insert_record(voter, Some("voter identification number"))
            .await
    }

    async fn insert_candidate(&self, candidate: CandidateCore) -> StoreResult<Candidate> {
        self.insert_record(candidate, None).await
    }

    async fn insert_election(&self, election: ElectionCore) -> StoreResult<Election> {
        self.insert_record(election, None).await
    }

    async fn replace_election(&self, election: &Election) -> StoreResult<bool> {
        self.replace_record(election).await
    }

    async fn replace_polling_station(&self, station: &PollingStation) -> StoreResult<bool> {
        self.replace_record(station).await
    }

    async fn election_candidate_ids(&self, election: ElectionId) -> StoreResult<Vec<CandidateId>> {
        let links = self.coll::<ElectionCandidate>();
        let options = FindOptions::builder().sort(doc! {"candidate_id": 1}).build();
        let links: Vec<ElectionCandidate> = self
            .bounded(async {
                links
                    .find(doc! {"election_id": election}, options)
                    .await?
                    .try_collect()
                    .await
            })
            .await?;
        Ok(links.into_iter().map(|link| link.candidate_id).collect())
    }

    async fn candidate_election_ids(&self, candidate: CandidateId) -> StoreResult<Vec<ElectionId>> {
        let links = self.coll::<ElectionCandidate>();
        let options = FindOptions::builder().sort(doc! {"election_id": 1}).build();
        let links: Vec<ElectionCandidate> = self
            .bounded(async {
                links
                    .find(doc! {"candidate_id": candidate}, options)
                    .await?
                    .try_collect()
                    .await
            })
            .await?;
        Ok(links.into_iter().map(|link| link.election_id).collect())
    }

    async fn is_candidate_in_election(
        &self,
        candidate: CandidateId,
        election: ElectionId,
    ) -> StoreResult<bool> {
        let links = self.coll::<ElectionCandidate>();
        let filter = doc! {"election_id": election, "candidate_id": candidate};
        Ok(self.bounded(links.count_documents(filter, None)).await? > 0)
    }

    async fn set_election_candidates(
        &self,
        election: ElectionId,
        candidates: &[CandidateId],
    ) -> StoreResult<()> {
        let links = self.coll::<ElectionCandidate>();
        let new_links: Vec<_> = candidates
            .iter()
            .map(|&candidate_id| ElectionCandidate {
                election_id: election,
                candidate_id,
            })
            .collect();
        self.bounded(async {
            links
                .delete_many(doc! {"election_id": election}, None)
                .await?;
            if !new_links.is_empty() {
                links.insert_many(new_links, None).await?;
            }
            Ok(())
        })
        .await
    }

    async fn station_district_ids(
        &self,
        station: PollingStationId,
    ) -> StoreResult<Vec<DistrictId>> {
        let links = self.coll::<StationDistrict>();
        let options = FindOptions::builder().sort(doc! {"district_id": 1}).build();
        let links: Vec<StationDistrict> = self
            .bounded(async {
                links
                    .find(doc! {"polling_station_id": station}, options)
                    .await?
                    .try_collect()
                    .await
            })
            .await?;
        Ok(links.into_iter().map(|link| link.district_id).collect())
    }

    async fn district_station_ids(
        &self,
        district: DistrictId,
    ) -> StoreResult<Vec<PollingStationId>> {
        let links = self.coll::<StationDistrict>();
        let options = FindOptions::builder()
            .sort(doc! {"polling_station_id": 1})
            .build();
        let links: Vec<StationDistrict> = self
            .bounded(async {
                links
                    .find(doc! {"district_id": district}, options)
                    .await?
                    .try_collect()
                    .await
            })
            .await?;
        Ok(links.into_iter().map(|link| link.polling_station_id).collect())
    }

    async fn set_station_districts(
        &self,
        station: PollingStationId,
        districts: &[DistrictId],
    ) -> StoreResult<()> {
        let links = self.coll::<StationDistrict>();
        let new_links: Vec<_> = districts
            .iter()
            .map(|&district_id| StationDistrict {
                polling_station_id: station,
                district_id,
            })
            .collect();
        self.bounded(async {
            links
                .delete_many(doc! {"polling_station_id": station}, None)
                .await?;
            if !new_links.is_empty() {
                links.insert_many(new_links, None).await?;
            }
            Ok(())
        })
        .await
    }

    async fn insert_vote(&self, vote: NewVote) -> StoreResult<Vote> {
        let id = self.next_id::<VoteDoc>().await?;
        let doc = VoteDoc::new(id, vote);
        let votes = self.coll::<VoteDoc>();
        self.bounded_unique(Some(VALID_VOTE_KEY), votes.insert_one(doc.clone(), None))
            .await?;
        Ok(doc.into())
    }

    async fn set_vote_validity(&self, id: VoteId, valid: bool) -> StoreResult<Option<Vote>> {
        let votes = self.coll::<VoteDoc>();
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        let vote = self
            .bounded_unique(
                Some(VALID_VOTE_KEY),
                votes.find_one_and_update(
                    doc! {"_id": id},
                    doc! {"$set": {"valid": valid}},
                    options,
                ),
            )
            .await?;
        Ok(vote.map(Into::into))
    }

    async fn delete_vote(&self, id: VoteId) -> StoreResult<bool> {
        let votes = self.coll::<VoteDoc>();
        let result = self
            .bounded(votes.delete_one(doc! {"_id": id}, None))
            .await?;
        Ok(result.deleted_count > 0)
    }

    async fn find_votes(&self, filter: &VoteFilter) -> StoreResult<Vec<Vote>> {
        let votes = self.coll::<VoteDoc>();
        let options = FindOptions::builder().sort(doc! {"_id": 1}).build();
        let docs: Vec<VoteDoc> = self
            .bounded(async {
                votes
                    .find(filter_doc(filter), options)
                    .await?
                    .try_collect()
                    .await
            })
            .await?;
        Ok(docs.into_iter().map(Into::into).collect())
    }

    async fn count_votes(&self, filter: &VoteFilter) -> StoreResult<u64> {
        let votes = self.coll::<VoteDoc>();
        self.bounded(votes.count_documents(filter_doc(filter), None))
            .await
    }

    async fn count_votes_by_region(&self, filter: &VoteFilter) -> StoreResult<Vec<UnitVoteCount>> {
        self.count_votes_by_voter_field(filter, "region_id", DbRecord::<RegionCore>::NAME)
            .await
    }

    async fn count_votes_by_district(
        &self,
        filter: &VoteFilter,
    ) -> StoreResult<Vec<UnitVoteCount>> {
        self.count_votes_by_voter_field(filter, "district_id", DbRecord::<DistrictCore>::NAME)
            .await
    }

    async fn count_votes_by_candidate(
        &self,
        filter: &VoteFilter,
    ) -> StoreResult<Vec<CandidateVoteCount>> {
        let pipeline = vec![
            doc! {"$match": filter_doc(filter)},
            doc! {"$group": {"_id": "$candidate_id", "votes": {"$sum": 1}}},
            doc! {"$lookup": {
                "from": DbRecord::<CandidateCore>::NAME,
                "localField": "_id",
                "foreignField": "_id",
                "as": "candidate",
            }},
            doc! {"$unwind": "$candidate"},
            doc! {"$project": {
                "_id": 0,
                "candidate_id": "$_id",
                "first_name": "$candidate.first_name",
                "last_name": "$candidate.last_name",
                "votes": 1,
            }},
            doc! {"$sort": {"candidate_id": 1}},
        ];
        self.aggregate_votes(pipeline).await
    }

    async fn count_votes_by_election(
        &self,
        filter: &VoteFilter,
    ) -> StoreResult<Vec<ElectionVoteCount>> {
        let pipeline = vec![
            doc! {"$match": filter_doc(filter)},
            doc! {"$group": {"_id": "$election_id", "votes": {"$sum": 1}}},
            doc! {"$project": {"_id": 0, "election_id": "$_id", "votes": 1}},
            doc! {"$sort": {"election_id": 1}},
        ];
        self.aggregate_votes(pipeline).await
    }

    async fn count_valid_votes_in_region(&self, region: RegionId) -> StoreResult<u64> {
        self.count_valid_votes_by_voter_field("region_id", region)
            .await
    }

    async fn count_valid_votes_in_district(&self, district: DistrictId) -> StoreResult<u64> {
        self.count_valid_votes_by_voter_field("district_id", district)
            .await
    }

    async fn count_voters_in_region(&self, region: RegionId) -> StoreResult<u64> {
        let voters = self.coll::<DbRecord<VoterCore>>();
        self.bounded(voters.count_documents(doc! {"region_id": region}, None))
            .await
    }

    async fn count_voters_in_district(&self, district: DistrictId) -> StoreResult<u64> {
        let voters = self.coll::<DbRecord<VoterCore>>();
        self.bounded(voters.count_documents(doc! {"district_id": district}, None))
            .await
    }

    async fn count_active_voters(&self) -> StoreResult<u64> {
        let voters = self.coll::<DbRecord<VoterCore>>();
        self.bounded(voters.count_documents(doc! {"active": true}, None))
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use mongodb::bson::Bson;
    use rocket::futures::future::join_all;

    use super::*;
    use crate::error::Error;
    use crate::model::Ballot;
    use crate::service::VoteAdmission;
    use crate::testing::Fixture;

    /// Voter `voter` of the fixture votes for `candidate` in the active
    /// election, written straight into the store.
    async fn record_vote(fixture: &Fixture, voter: usize, candidate: usize) -> StoreResult<Vote> {
        let ballot = Ballot {
            voter_id: fixture.voters[voter],
            candidate_id: fixture.candidates[candidate],
            ..fixture.ballot()
        };
        fixture.store.insert_vote(ballot.into_vote(Utc::now())).await
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(filter_doc(&VoteFilter::all()).is_empty());
    }

    #[test]
    fn filter_translates_each_condition() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let filter = VoteFilter::all()
            .election(3)
            .candidate(2)
            .between(Some(start), None)
            .valid_only();
        let query = filter_doc(&filter);

        assert!(query.get("election_id").is_some());
        assert!(query.get("candidate_id").is_some());
        assert!(query.get("voter_id").is_none());
        assert_eq!(query.get("valid"), Some(&Bson::Boolean(true)));
        let range = query.get_document("timestamp").unwrap();
        assert_eq!(
            range.get("$gte"),
            Some(&Bson::DateTime(bson::DateTime::from_chrono(start)))
        );
        assert!(range.get("$lte").is_none());
    }

    #[backend_test(mongo)]
    async fn valid_vote_index_rejects_a_second_valid_vote(fixture: Fixture) {
        let first = record_vote(&fixture, 0, 0).await.unwrap();
        assert_eq!(
            record_vote(&fixture, 0, 1).await,
            Err(StoreError::DuplicateKey(VALID_VOTE_KEY))
        );

        // Invalid votes sit alongside the valid one.
        let mut spoiled = Ballot {
            candidate_id: fixture.candidates[1],
            ..fixture.ballot()
        }
        .into_vote(Utc::now());
        spoiled.valid = false;
        fixture.store.insert_vote(spoiled).await.unwrap();

        let votes = fixture.store.find_votes(&VoteFilter::all()).await.unwrap();
        let validity: Vec<_> = votes.iter().map(|vote| vote.valid).collect();
        assert_eq!(validity, vec![true, false]);
        assert_eq!(votes[0].id, first.id);
    }

    #[backend_test(mongo)]
    async fn revalidation_is_checked_by_the_index(fixture: Fixture) {
        let first = record_vote(&fixture, 0, 0).await.unwrap();
        fixture.store.set_vote_validity(first.id, false).await.unwrap();
        let second = record_vote(&fixture, 0, 1).await.unwrap();

        assert_eq!(
            fixture.store.set_vote_validity(first.id, true).await,
            Err(StoreError::DuplicateKey(VALID_VOTE_KEY))
        );
        let unchanged = fixture.store.vote(first.id).await.unwrap().unwrap();
        assert!(!unchanged.valid);
        let kept = fixture.store.vote(second.id).await.unwrap().unwrap();
        assert!(kept.valid);
        assert_eq!(fixture.store.set_vote_validity(999, true).await, Ok(None));
    }

    #[backend_test(mongo)]
    async fn second_ballot_is_refused(fixture: Fixture) {
        let admission = fixture.admission();
        admission.cast_vote(fixture.ballot()).await.unwrap();

        let again = Ballot {
            candidate_id: fixture.candidates[1],
            ..fixture.ballot()
        };
        let err = admission.cast_vote(again).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateVote { .. }));

        let valid = VoteFilter::all()
            .voter(fixture.voters[0])
            .election(fixture.active_election)
            .valid_only();
        assert_eq!(fixture.store.count_votes(&valid).await.unwrap(), 1);
    }

    #[backend_test(mongo)]
    async fn racing_servers_admit_one_vote(fixture: Fixture) {
        // Two admission services share nothing but the database, like two
        // server processes.
        let servers = [Arc::new(fixture.admission()), Arc::new(fixture.admission())];
        let tasks = (0..50).map(|i| {
            let admission = servers[i % 2].clone();
            let ballot = Ballot {
                candidate_id: fixture.candidates[i / 25],
                ..fixture.ballot()
            };
            rocket::tokio::spawn(async move { admission.cast_vote(ballot).await })
        });
        let results: Vec<_> = join_all(tasks)
            .await
            .into_iter()
            .map(|joined| joined.unwrap())
            .collect();

        assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
        assert!(results.iter().all(|result| matches!(
            result,
            Ok(_) | Err(Error::DuplicateVote { .. }) | Err(Error::ConcurrentConflict)
        )));
        let valid = VoteFilter::all()
            .voter(fixture.voters[0])
            .election(fixture.active_election)
            .valid_only();
        assert_eq!(fixture.store.count_votes(&valid).await.unwrap(), 1);
    }

    #[backend_test(mongo)]
    async fn votes_group_by_voter_and_candidate(fixture: Fixture) {
        for (voter, candidate) in [(0, 0), (1, 0), (3, 1), (4, 0)] {
            record_vote(&fixture, voter, candidate).await.unwrap();
        }
        let all = VoteFilter::all();
        let unit = |id, name: &str, votes| UnitVoteCount {
            id,
            name: name.to_string(),
            votes,
        };

        // Voter 4 lives in no region or district.
        assert_eq!(
            fixture.store.count_votes_by_region(&all).await.unwrap(),
            vec![
                unit(fixture.regions[0], "North", 2),
                unit(fixture.regions[1], "South", 1)
            ]
        );
        assert_eq!(
            fixture.store.count_votes_by_district(&all).await.unwrap(),
            vec![
                unit(fixture.districts[0], "Northgate", 2),
                unit(fixture.districts[1], "Southbank", 1)
            ]
        );

        let by_candidate: Vec<_> = fixture
            .store
            .count_votes_by_candidate(&all)
            .await
            .unwrap()
            .into_iter()
            .map(|count| (count.candidate_id, count.first_name, count.votes))
            .collect();
        assert_eq!(
            by_candidate,
            vec![
                (fixture.candidates[0], "Alice".to_string(), 3),
                (fixture.candidates[1], "Bob".to_string(), 1)
            ]
        );

        assert_eq!(
            fixture.store.count_votes_by_election(&all).await.unwrap(),
            vec![ElectionVoteCount {
                election_id: fixture.active_election,
                votes: 4
            }]
        );
        assert_eq!(
            fixture
                .store
                .count_valid_votes_in_region(fixture.regions[0])
                .await
                .unwrap(),
            2
        );
        assert_eq!(
            fixture
                .store
                .count_valid_votes_in_district(fixture.districts[1])
                .await
                .unwrap(),
            1
        );
    }

    #[backend_test(mongo)]
    async fn elections_without_votes_are_listed(fixture: Fixture) {
        fixture
            .insert_votes(fixture.candidates[1], fixture.stations[0], 2)
            .await;

        let totals: Vec<_> = fixture
            .aggregator()
            .elections_with_vote_counts()
            .await
            .unwrap()
            .into_iter()
            .map(|summary| (summary.election.id, summary.total_votes))
            .collect();
        assert_eq!(
            totals,
            vec![(fixture.active_election, 2), (fixture.inactive_election, 0)]
        );
    }
}
