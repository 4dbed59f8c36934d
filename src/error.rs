use log::{debug, error};
use rocket::{http::Status, response::Responder, serde::json::Json, Request};
use serde::Serialize;
use thiserror::Error;

use crate::cache::CacheError;
use crate::model::{CandidateId, ElectionId, EntityKind, VoterId};
use crate::service::Ineligible;
use crate::store::StoreError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Referenced {0} does not exist")]
    ReferenceNotFound(EntityKind),
    #[error("Candidate {candidate} is not standing in election {election}")]
    CandidateNotInElection {
        candidate: CandidateId,
        election: ElectionId,
    },
    #[error("Election {0} is not active")]
    ElectionNotActive(ElectionId),
    #[error("Voter {voter} has already cast a valid vote in election {election}")]
    DuplicateVote { voter: VoterId, election: ElectionId },
    #[error("Storage did not respond in time")]
    StorageTimeout,
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("Concurrent modification detected, retry the request")]
    ConcurrentConflict,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Build the error for an ineligible ballot.
    pub fn ineligible(
        reason: Ineligible,
        voter: VoterId,
        candidate: CandidateId,
        election: ElectionId,
    ) -> Self {
        match reason {
            Ineligible::ReferenceNotFound(kind) => Self::ReferenceNotFound(kind),
            Ineligible::CandidateNotInElection => {
                Self::CandidateNotInElection { candidate, election }
            }
            Ineligible::ElectionNotActive => Self::ElectionNotActive(election),
            Ineligible::DuplicateVote => Self::DuplicateVote { voter, election },
        }
    }

    /// Machine-readable name of this error, stable across releases.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ReferenceNotFound(_) => "reference_not_found",
            Self::CandidateNotInElection { .. } => "candidate_not_in_election",
            Self::ElectionNotActive(_) => "election_not_active",
            Self::DuplicateVote { .. } => "duplicate_vote",
            Self::StorageTimeout => "storage_timeout",
            Self::StorageUnavailable(_) => "storage_unavailable",
            Self::ConcurrentConflict => "concurrent_conflict",
            Self::NotFound(_) => "not_found",
            Self::BadRequest(_) => "bad_request",
        }
    }

    pub fn status(&self) -> Status {
        match self {
            Self::ReferenceNotFound(_) | Self::NotFound(_) => Status::NotFound,
            Self::CandidateNotInElection { .. } | Self::ElectionNotActive(_) => {
                Status::UnprocessableEntity
            }
            Self::DuplicateVote { .. } | Self::ConcurrentConflict => Status::Conflict,
            Self::StorageTimeout => Status::GatewayTimeout,
            Self::StorageUnavailable(_) => Status::ServiceUnavailable,
            Self::BadRequest(_) => Status::BadRequest,
        }
    }

    /// Can the caller expect a retry of the same request to behave differently?
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::StorageTimeout | Self::StorageUnavailable(_) | Self::ConcurrentConflict
        )
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Timeout => Self::StorageTimeout,
            StoreError::Unavailable(msg) => Self::StorageUnavailable(msg),
            StoreError::Conflict => Self::ConcurrentConflict,
            StoreError::DuplicateKey(what) => Self::BadRequest(format!("{what} already in use")),
        }
    }
}

impl From<CacheError> for Error {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::Timeout => Self::StorageTimeout,
            CacheError::Unavailable(msg) => Self::StorageUnavailable(format!("cache: {msg}")),
        }
    }
}

/// Body of every error response.
#[derive(Debug, Serialize)]
struct ErrorBody {
    kind: &'static str,
    message: String,
}

impl<'r> Responder<'r, 'static> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> rocket::response::Result<'static> {
        let status = self.status();
        if status.code >= 500 {
            error!("{self}");
        } else {
            debug!("{self}");
        }
        let body = ErrorBody {
            kind: self.kind(),
            message: self.to_string(),
        };
        (status, Json(body)).respond_to(req)
    }
}
