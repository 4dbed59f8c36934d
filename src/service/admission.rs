use std::sync::Arc;

use chrono::Utc;
use log::{info, warn};

use super::{check_eligibility, invalidate, KeyedLocks};
use crate::cache::{ResultCache, Scope};
use crate::error::{Error, Result};
use crate::model::{Ballot, ElectionId, Vote, VoteId, VoterId};
use crate::store::{Store, StoreError, StoreResult, VALID_VOTE_KEY};

/// Admits votes into the ledger, and applies administrative corrections.
///
/// At most one valid vote exists per voter and election. The eligibility
/// check and the write happen under a per-(voter, election) lock, and the
/// store rejects any duplicate that another process slips in.
pub struct VoteAdmission {
    store: Arc<dyn Store>,
    cache: Arc<dyn ResultCache>,
    locks: KeyedLocks<(VoterId, ElectionId)>,
}

impl VoteAdmission {
    pub fn new(store: Arc<dyn Store>, cache: Arc<dyn ResultCache>) -> Self {
        Self {
            store,
            cache,
            locks: KeyedLocks::new(),
        }
    }

    /// Cast a ballot, returning the recorded vote.
    ///
    /// Nothing is written, and no cache is touched, unless the ballot is
    /// admitted.
    pub async fn cast_vote(&self, ballot: Ballot) -> Result<Vote> {
        let vote = {
            let _guard = self
                .locks
                .lock((ballot.voter_id, ballot.election_id))
                .await;

            if let Err(reason) = check_eligibility(&*self.store, &ballot).await? {
                warn!(
                    "Rejected ballot of voter {} in election {}: {reason}",
                    ballot.voter_id, ballot.election_id
                );
                return Err(Error::ineligible(
                    reason,
                    ballot.voter_id,
                    ballot.candidate_id,
                    ballot.election_id,
                ));
            }

            let inserted = self.store.insert_vote(ballot.into_vote(Utc::now())).await;
            self.settled(inserted)
                .await?
                .map_err(|err| duplicate_vote(err, ballot.voter_id, ballot.election_id))?
        };
        info!(
            "Admitted vote {} of voter {} in election {}",
            vote.id, vote.voter_id, vote.election_id
        );

        invalidate(&*self.cache, &Scope::ALL).await?;
        Ok(vote)
    }

    pub async fn vote(&self, id: VoteId) -> Result<Vote> {
        self.store
            .vote(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Vote with ID '{id}'")))
    }

    /// Mark a vote valid or invalid.
    ///
    /// Re-validating a vote fails with [`Error::DuplicateVote`] if its voter
    /// already holds another valid vote in the election.
    pub async fn update_vote_validity(&self, id: VoteId, valid: bool) -> Result<Vote> {
        let existing = self.vote(id).await?;
        let vote = {
            let _guard = self
                .locks
                .lock((existing.voter_id, existing.election_id))
                .await;
            let updated = self.store.set_vote_validity(id, valid).await;
            self.settled(updated)
                .await?
                .map_err(|err| duplicate_vote(err, existing.voter_id, existing.election_id))?
                .ok_or_else(|| Error::not_found(format!("Vote with ID '{id}'")))?
        };
        info!("Set validity of vote {id} to {valid}");

        invalidate(&*self.cache, &Scope::ALL).await?;
        Ok(vote)
    }

    /// Remove a vote from the ledger entirely.
    pub async fn delete_vote(&self, id: VoteId) -> Result<()> {
        let deleted = self.store.delete_vote(id).await;
        if !self.settled(deleted).await?? {
            return Err(Error::not_found(format!("Vote with ID '{id}'")));
        }
        warn!("Deleted vote {id}");

        invalidate(&*self.cache, &Scope::ALL).await
    }

    /// Hand back the outcome of a ledger write. A write that timed out may
    /// still land, so results derived from votes are dropped first.
    async fn settled<T>(&self, written: StoreResult<T>) -> Result<StoreResult<T>> {
        if let Err(StoreError::Timeout) = written {
            warn!("Ledger write timed out, dropping cached vote results");
            invalidate(&*self.cache, &[Scope::Votes]).await?;
        }
        Ok(written)
    }
}

/// The store's one-valid-vote constraint surfaces as a duplicate vote.
fn duplicate_vote(err: StoreError, voter: VoterId, election: ElectionId) -> Error {
    match err {
        StoreError::DuplicateKey(VALID_VOTE_KEY) => Error::DuplicateVote { voter, election },
        err => err.into(),
    }
}
