use rocket::{http::Status, serde::json::Json, Route, State};

use crate::error::Result;
use crate::model::{
    Candidate, CandidateId, CandidateSummary, District, DistrictId, DistrictSummary, Election,
    ElectionId, ElectionPatch, ElectionSummary, NewCandidate, NewDistrict, NewElection,
    NewPollingStation, NewRegion, NewVoter, PollingStation, PollingStationId,
    PollingStationPatch, PollingStationSummary, Region, RegionId, RegionSummary, Voter, VoterId,
};
use crate::service::{Aggregator, Registry};

pub fn routes() -> Vec<Route> {
    routes![
        region,
        district,
        polling_station,
        election,
        candidate,
        voter,
        create_region,
        create_district,
        create_polling_station,
        create_voter,
        create_candidate,
        create_election,
        modify_election,
        modify_polling_station,
    ]
}

type Created<T> = Result<(Status, Json<T>)>;

#[get("/regions/<region_id>")]
async fn region(region_id: RegionId, aggregator: &State<Aggregator>) -> Result<Json<RegionSummary>> {
    Ok(Json(aggregator.region_summary(region_id).await?))
}

#[get("/districts/<district_id>")]
async fn district(
    district_id: DistrictId,
    aggregator: &State<Aggregator>,
) -> Result<Json<DistrictSummary>> {
    Ok(Json(aggregator.district_summary(district_id).await?))
}

#[get("/polling-stations/<station_id>")]
async fn polling_station(
    station_id: PollingStationId,
    aggregator: &State<Aggregator>,
) -> Result<Json<PollingStationSummary>> {
    Ok(Json(aggregator.polling_station_summary(station_id).await?))
}

#[get("/elections/<election_id>")]
async fn election(
    election_id: ElectionId,
    aggregator: &State<Aggregator>,
) -> Result<Json<ElectionSummary>> {
    Ok(Json(aggregator.election_summary(election_id).await?))
}

#[get("/candidates/<candidate_id>")]
async fn candidate(
    candidate_id: CandidateId,
    aggregator: &State<Aggregator>,
) -> Result<Json<CandidateSummary>> {
    Ok(Json(aggregator.candidate_summary(candidate_id).await?))
}

#[get("/voters/<voter_id>")]
async fn voter(voter_id: VoterId, registry: &State<Registry>) -> Result<Json<Voter>> {
    Ok(Json(registry.voter(voter_id).await?))
}

#[post("/regions", data = "<region>", format = "json")]
async fn create_region(region: Json<NewRegion>, registry: &State<Registry>) -> Created<Region> {
    let region = registry.create_region(region.into_inner()).await?;
    Ok((Status::Created, Json(region)))
}

#[post("/districts", data = "<district>", format = "json")]
async fn create_district(
    district: Json<NewDistrict>,
    registry: &State<Registry>,
) -> Created<District> {
    let district = registry.create_district(district.into_inner()).await?;
    Ok((Status::Created, Json(district)))
}

#[post("/polling-stations", data = "<station>", format = "json")]
async fn create_polling_station(
    station: Json<NewPollingStation>,
    registry: &State<Registry>,
) -> Created<PollingStation> {
    let station = registry.create_polling_station(station.into_inner()).await?;
    Ok((Status::Created, Json(station)))
}

#[post("/voters", data = "<voter>", format = "json")]
async fn create_voter(voter: Json<NewVoter>, registry: &State<Registry>) -> Created<Voter> {
    let voter = registry.create_voter(voter.into_inner()).await?;
    Ok((Status::Created, Json(voter)))
}

#[post("/candidates", data = "<candidate>", format = "json")]
async fn create_candidate(
    candidate: Json<NewCandidate>,
    registry: &State<Registry>,
) -> Created<Candidate> {
    let candidate = registry.create_candidate(candidate.into_inner()).await?;
    Ok((Status::Created, Json(candidate)))
}

#[post("/elections", data = "<election>", format = "json")]
async fn create_election(
    election: Json<NewElection>,
    registry: &State<Registry>,
) -> Created<Election> {
    let election = registry.create_election(election.into_inner()).await?;
    Ok((Status::Created, Json(election)))
}

#[patch("/elections/<election_id>", data = "<patch>", format = "json")]
async fn modify_election(
    election_id: ElectionId,
    patch: Json<ElectionPatch>,
    registry: &State<Registry>,
) -> Result<Json<Election>> {
    let election = registry
        .update_election(election_id, patch.into_inner())
        .await?;
    Ok(Json(election))
}

#[patch("/polling-stations/<station_id>", data = "<patch>", format = "json")]
async fn modify_polling_station(
    station_id: PollingStationId,
    patch: Json<PollingStationPatch>,
    registry: &State<Registry>,
) -> Result<Json<PollingStation>> {
    let station = registry
        .update_polling_station(station_id, patch.into_inner())
        .await?;
    Ok(Json(station))
}
