use log::debug;
use rocket::{http::Status, serde::json::Json, Route, State};

use crate::error::Result;
use crate::logging::RequestId;
use crate::model::{Ballot, ValidityUpdate, Vote, VoteFilter, VoteId, VoteList};
use crate::service::{Aggregator, VoteAdmission};

pub fn routes() -> Vec<Route> {
    routes![cast_vote, vote, update_validity, delete_vote, search_votes]
}

#[post("/votes", data = "<ballot>", format = "json")]
async fn cast_vote(
    request_id: &RequestId,
    ballot: Json<Ballot>,
    admission: &State<VoteAdmission>,
) -> Result<(Status, Json<Vote>)> {
    debug!(
        "req{request_id} casting ballot of voter {} in election {}",
        ballot.voter_id, ballot.election_id
    );
    let vote = admission.cast_vote(ballot.into_inner()).await?;
    Ok((Status::Created, Json(vote)))
}

#[get("/votes/<vote_id>")]
async fn vote(vote_id: VoteId, admission: &State<VoteAdmission>) -> Result<Json<Vote>> {
    Ok(Json(admission.vote(vote_id).await?))
}

#[put("/votes/<vote_id>/validity", data = "<update>", format = "json")]
async fn update_validity(
    vote_id: VoteId,
    update: Json<ValidityUpdate>,
    admission: &State<VoteAdmission>,
) -> Result<Json<Vote>> {
    let vote = admission.update_vote_validity(vote_id, update.valid).await?;
    Ok(Json(vote))
}

#[delete("/votes/<vote_id>")]
async fn delete_vote(vote_id: VoteId, admission: &State<VoteAdmission>) -> Result<()> {
    admission.delete_vote(vote_id).await
}

#[post("/votes/search", data = "<filter>", format = "json")]
async fn search_votes(
    filter: Json<VoteFilter>,
    aggregator: &State<Aggregator>,
) -> Result<Json<VoteList>> {
    let votes = aggregator.find_votes(&filter).await?;
    Ok(Json(votes.into()))
}
