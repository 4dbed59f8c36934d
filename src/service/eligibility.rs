use thiserror::Error;

use crate::model::{Ballot, EntityKind, VoteFilter};
use crate::store::{Store, StoreResult};

/// Why a ballot may not be admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Ineligible {
    #[error("referenced {0} does not exist")]
    ReferenceNotFound(EntityKind),
    #[error("candidate is not standing in the election")]
    CandidateNotInElection,
    #[error("election is not active")]
    ElectionNotActive,
    #[error("voter already holds a valid vote in the election")]
    DuplicateVote,
}

/// The outcome of an eligibility check.
pub type Verdict = Result<(), Ineligible>;

/// Decide whether `ballot` may be admitted, given the current state of the
/// store.
///
/// The checks run in a fixed order and the first failure is reported. This
/// performs no writes. The outer `Result` carries storage failures only.
pub async fn check_eligibility(store: &dyn Store, ballot: &Ballot) -> StoreResult<Verdict> {
    if store.voter(ballot.voter_id).await?.is_none() {
        return Ok(Err(Ineligible::ReferenceNotFound(EntityKind::Voter)));
    }
    if store.candidate(ballot.candidate_id).await?.is_none() {
        return Ok(Err(Ineligible::ReferenceNotFound(EntityKind::Candidate)));
    }
    let election = match store.election(ballot.election_id).await? {
        Some(election) => election,
        None => return Ok(Err(Ineligible::ReferenceNotFound(EntityKind::Election))),
    };
    if store
        .polling_station(ballot.polling_station_id)
        .await?
        .is_none()
    {
        return Ok(Err(Ineligible::ReferenceNotFound(EntityKind::PollingStation)));
    }

    if !store
        .is_candidate_in_election(ballot.candidate_id, ballot.election_id)
        .await?
    {
        return Ok(Err(Ineligible::CandidateNotInElection));
    }
    if !election.active {
        return Ok(Err(Ineligible::ElectionNotActive));
    }

    let existing = VoteFilter::all()
        .voter(ballot.voter_id)
        .election(ballot.election_id)
        .valid_only();
    if store.count_votes(&existing).await? > 0 {
        return Ok(Err(Ineligible::DuplicateVote));
    }

    Ok(Ok(()))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::testing::Fixture;

    #[backend_test]
    async fn eligible_ballot_passes(fixture: Fixture) {
        let verdict = check_eligibility(&*fixture.store, &fixture.ballot())
            .await
            .unwrap();
        assert_eq!(verdict, Ok(()));
    }

    #[backend_test]
    async fn missing_references_are_reported_in_order(fixture: Fixture) {
        let store = &*fixture.store;

        // Every reference is missing: the voter is reported first.
        let ballot = Ballot {
            voter_id: 999,
            candidate_id: 999,
            election_id: 999,
            polling_station_id: 999,
        };
        assert_eq!(
            check_eligibility(store, &ballot).await.unwrap(),
            Err(Ineligible::ReferenceNotFound(EntityKind::Voter))
        );

        let ballot = Ballot {
            voter_id: fixture.voters[0],
            ..ballot
        };
        assert_eq!(
            check_eligibility(store, &ballot).await.unwrap(),
            Err(Ineligible::ReferenceNotFound(EntityKind::Candidate))
        );

        let ballot = Ballot {
            candidate_id: fixture.candidates[0],
            ..ballot
        };
        assert_eq!(
            check_eligibility(store, &ballot).await.unwrap(),
            Err(Ineligible::ReferenceNotFound(EntityKind::Election))
        );

        let ballot = Ballot {
            election_id: fixture.active_election,
            ..ballot
        };
        assert_eq!(
            check_eligibility(store, &ballot).await.unwrap(),
            Err(Ineligible::ReferenceNotFound(EntityKind::PollingStation))
        );
    }

    #[backend_test]
    async fn candidate_must_stand_in_election(fixture: Fixture) {
        let ballot = Ballot {
            candidate_id: fixture.candidates[2],
            ..fixture.ballot()
        };
        assert_eq!(
            check_eligibility(&*fixture.store, &ballot).await.unwrap(),
            Err(Ineligible::CandidateNotInElection)
        );
    }

    #[backend_test]
    async fn election_must_be_active(fixture: Fixture) {
        let ballot = Ballot {
            election_id: fixture.inactive_election,
            ..fixture.ballot()
        };
        assert_eq!(
            check_eligibility(&*fixture.store, &ballot).await.unwrap(),
            Err(Ineligible::ElectionNotActive)
        );
    }

    #[backend_test]
    async fn only_valid_votes_block_a_new_one(fixture: Fixture) {
        let store = &*fixture.store;
        let ballot = fixture.ballot();
        let vote = store.insert_vote(ballot.into_vote(Utc::now())).await.unwrap();
        assert_eq!(
            check_eligibility(store, &ballot).await.unwrap(),
            Err(Ineligible::DuplicateVote)
        );

        store.set_vote_validity(vote.id, false).await.unwrap();
        assert_eq!(check_eligibility(store, &ballot).await.unwrap(), Ok(()));
    }
}
