use std::ops::Deref;

use log::debug;
use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};

use crate::model::{
    CandidateCore, DistrictCore, ElectionCore, PollingStationCore, RegionCore, VoterCore,
};

use super::{
    counter::Counter,
    record::{DbRecord, ElectionCandidate, StationDistrict, VoteDoc},
};

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

pub const REGIONS: &str = "regions";
impl MongoCollection for DbRecord<RegionCore> {
    const NAME: &'static str = REGIONS;
}

pub const DISTRICTS: &str = "districts";
impl MongoCollection for DbRecord<DistrictCore> {
    const NAME: &'static str = DISTRICTS;
}

pub const POLLING_STATIONS: &str = "polling_stations";
impl MongoCollection for DbRecord<PollingStationCore> {
    const NAME: &'static str = POLLING_STATIONS;
}

pub const VOTERS: &str = "voters";
impl MongoCollection for DbRecord<VoterCore> {
    const NAME: &'static str = VOTERS;
}

pub const CANDIDATES: &str = "candidates";
impl MongoCollection for DbRecord<CandidateCore> {
    const NAME: &'static str = CANDIDATES;
}

pub const ELECTIONS: &str = "elections";
impl MongoCollection for DbRecord<ElectionCore> {
    const NAME: &'static str = ELECTIONS;
}

pub const VOTES: &str = "votes";
impl MongoCollection for VoteDoc {
    const NAME: &'static str = VOTES;
}

// Join collections
impl MongoCollection for ElectionCandidate {
    const NAME: &'static str = "election_candidates";
}
impl MongoCollection for StationDistrict {
    const NAME: &'static str = "district_polling_stations";
}

// Counter collection
impl MongoCollection for Counter {
    const NAME: &'static str = "counters";
}

/// Ensure that all the required indexes exist on the given database.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();

    // Region collection.
    let region_index = IndexModel::builder()
        .keys(doc! {"name": 1})
        .options(unique.clone())
        .build();
    Coll::<DbRecord<RegionCore>>::from_db(db)
        .create_index(region_index, None)
        .await?;

    // Voter collection.
    let voter_index = IndexModel::builder()
        .keys(doc! {"identification_number": 1})
        .options(unique.clone())
        .build();
    Coll::<DbRecord<VoterCore>>::from_db(db)
        .create_index(voter_index, None)
        .await?;

    // Vote collection. Only one valid vote per voter and election; any
    // number of invalidated ones may sit alongside it.
    let valid_vote_index = IndexModel::builder()
        .keys(doc! {"voter_id": 1, "election_id": 1})
        .options(
            IndexOptions::builder()
                .unique(true)
                .partial_filter_expression(doc! {"valid": true})
                .name("one_valid_vote".to_string())
                .build(),
        )
        .build();
    let election_index = IndexModel::builder()
        .keys(doc! {"election_id": 1, "candidate_id": 1})
        .build();
    let votes = Coll::<VoteDoc>::from_db(db);
    votes.create_index(valid_vote_index, None).await?;
    votes.create_index(election_index, None).await?;

    // Join collections.
    let election_candidate_index = IndexModel::builder()
        .keys(doc! {"election_id": 1, "candidate_id": 1})
        .options(unique.clone())
        .build();
    Coll::<ElectionCandidate>::from_db(db)
        .create_index(election_candidate_index, None)
        .await?;

    let station_district_index = IndexModel::builder()
        .keys(doc! {"polling_station_id": 1, "district_id": 1})
        .options(unique)
        .build();
    Coll::<StationDistrict>::from_db(db)
        .create_index(station_district_index, None)
        .await?;

    Ok(())
}
