use std::collections::BTreeMap;

use rocket::{serde::json::Json, Route, State};

use crate::error::Result;
use crate::model::{
    CandidateSummary, DistrictId, ElectionId, ElectionSummary, ParticipationUnit,
    PollingStationId, Rate, RegionId, VoteStatistics,
};
use crate::service::Aggregator;

pub fn routes() -> Vec<Route> {
    routes![
        counts_by_region,
        counts_by_district,
        counts_by_candidate,
        election_statistics,
        region_participation,
        district_participation,
        election_participation,
        station_utilization,
        top_candidates,
        elections,
    ]
}

/// Number of candidates listed when the request does not say.
const DEFAULT_TOP_CANDIDATES: usize = 10;

#[get("/statistics/regions")]
async fn counts_by_region(aggregator: &State<Aggregator>) -> Result<Json<BTreeMap<String, u64>>> {
    Ok(Json(aggregator.vote_counts_by_region().await?))
}

#[get("/statistics/districts")]
async fn counts_by_district(
    aggregator: &State<Aggregator>,
) -> Result<Json<BTreeMap<String, u64>>> {
    Ok(Json(aggregator.vote_counts_by_district().await?))
}

#[get("/statistics/elections/<election_id>/candidates")]
async fn counts_by_candidate(
    election_id: ElectionId,
    aggregator: &State<Aggregator>,
) -> Result<Json<BTreeMap<String, u64>>> {
    let counts = aggregator
        .vote_counts_by_candidate_in_election(election_id)
        .await?;
    Ok(Json(counts))
}

#[get("/statistics/elections/<election_id>")]
async fn election_statistics(
    election_id: ElectionId,
    aggregator: &State<Aggregator>,
) -> Result<Json<Vec<VoteStatistics>>> {
    Ok(Json(aggregator.vote_statistics(election_id).await?))
}

async fn participation(aggregator: &Aggregator, unit: ParticipationUnit) -> Result<Json<Rate>> {
    let rate = aggregator.participation_rate(unit).await?;
    Ok(Json(Rate { rate }))
}

#[get("/statistics/regions/<region_id>/participation")]
async fn region_participation(
    region_id: RegionId,
    aggregator: &State<Aggregator>,
) -> Result<Json<Rate>> {
    participation(aggregator, ParticipationUnit::Region(region_id)).await
}

#[get("/statistics/districts/<district_id>/participation")]
async fn district_participation(
    district_id: DistrictId,
    aggregator: &State<Aggregator>,
) -> Result<Json<Rate>> {
    participation(aggregator, ParticipationUnit::District(district_id)).await
}

#[get("/statistics/elections/<election_id>/participation")]
async fn election_participation(
    election_id: ElectionId,
    aggregator: &State<Aggregator>,
) -> Result<Json<Rate>> {
    participation(aggregator, ParticipationUnit::Election(election_id)).await
}

#[get("/statistics/polling-stations/<station_id>/utilization")]
async fn station_utilization(
    station_id: PollingStationId,
    aggregator: &State<Aggregator>,
) -> Result<Json<Rate>> {
    let rate = aggregator.utilization_rate(station_id).await?;
    Ok(Json(Rate { rate }))
}

#[get("/statistics/candidates/top?<limit>")]
async fn top_candidates(
    limit: Option<usize>,
    aggregator: &State<Aggregator>,
) -> Result<Json<Vec<CandidateSummary>>> {
    let limit = limit.unwrap_or(DEFAULT_TOP_CANDIDATES);
    Ok(Json(aggregator.top_candidates(limit).await?))
}

#[get("/statistics/elections")]
async fn elections(aggregator: &State<Aggregator>) -> Result<Json<Vec<ElectionSummary>>> {
    Ok(Json(aggregator.elections_with_vote_counts().await?))
}
