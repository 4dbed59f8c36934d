//! Document shapes as stored in MongoDB.
//!
//! Entities are stored with their ID in `_id`. Votes get their own document
//! type so the timestamp is stored as a BSON date, which keeps range queries
//! on it correct.

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{
    CandidateId, DistrictId, ElectionId, PollingStationId, Record, Vote, VoteCore, VoteId,
    VoterId,
};

/// An entity document: the ID plus the flattened entity data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbRecord<T> {
    #[serde(rename = "_id")]
    pub id: u32,
    #[serde(flatten)]
    pub data: T,
}

impl<T> From<Record<T>> for DbRecord<T> {
    fn from(record: Record<T>) -> Self {
        Self {
            id: record.id,
            data: record.data,
        }
    }
}

impl<T> From<DbRecord<T>> for Record<T> {
    fn from(record: DbRecord<T>) -> Self {
        Record::new(record.id, record.data)
    }
}

/// A vote document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteDoc {
    #[serde(rename = "_id")]
    pub id: VoteId,
    pub voter_id: VoterId,
    pub candidate_id: CandidateId,
    pub election_id: ElectionId,
    pub polling_station_id: PollingStationId,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub timestamp: DateTime<Utc>,
    pub valid: bool,
}

impl VoteDoc {
    pub fn new(id: VoteId, vote: VoteCore) -> Self {
        Self {
            id,
            voter_id: vote.voter_id,
            candidate_id: vote.candidate_id,
            election_id: vote.election_id,
            polling_station_id: vote.polling_station_id,
            timestamp: vote.timestamp,
            valid: vote.valid,
        }
    }
}

impl From<VoteDoc> for Vote {
    fn from(doc: VoteDoc) -> Self {
        Record::new(
            doc.id,
            VoteCore {
                voter_id: doc.voter_id,
                candidate_id: doc.candidate_id,
                election_id: doc.election_id,
                polling_station_id: doc.polling_station_id,
                timestamp: doc.timestamp,
                valid: doc.valid,
            },
        )
    }
}

/// Membership of a candidate in an election.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ElectionCandidate {
    pub election_id: ElectionId,
    pub candidate_id: CandidateId,
}

/// Attachment of a polling station to a district.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StationDistrict {
    pub polling_station_id: PollingStationId,
    pub district_id: DistrictId,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use mongodb::bson::{self, Bson};

    use super::*;
    use crate::model::{Ballot, RegionCore};

    #[test]
    fn entity_id_is_stored_in_underscore_id() {
        let record = DbRecord::from(Record::new(7, RegionCore::example("North")));
        let doc = bson::to_document(&record).unwrap();
        assert!(matches!(
            doc.get("_id"),
            Some(Bson::Int32(7)) | Some(Bson::Int64(7))
        ));
        assert_eq!(doc.get_str("name").unwrap(), "North");

        let back: Record<RegionCore> = bson::from_document::<DbRecord<RegionCore>>(doc)
            .unwrap()
            .into();
        assert_eq!(back.id, 7);
        assert_eq!(back.name, "North");
    }

    #[test]
    fn vote_timestamp_is_a_bson_date() {
        let ballot = Ballot {
            voter_id: 1,
            candidate_id: 2,
            election_id: 3,
            polling_station_id: 4,
        };
        let timestamp = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        let doc = bson::to_document(&VoteDoc::new(1, ballot.into_vote(timestamp))).unwrap();
        assert!(matches!(doc.get("timestamp"), Some(Bson::DateTime(_))));

        let vote: Vote = bson::from_document::<VoteDoc>(doc).unwrap().into();
        assert_eq!(vote.timestamp, timestamp);
        assert!(vote.valid);
    }
}
