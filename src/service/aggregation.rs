use std::{
    collections::{BTreeMap, BTreeSet},
    future::Future,
    sync::Arc,
    time::Duration,
};

use crate::cache::{CacheKey, Cacheable, ResultCache, Scope};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{
    ratio, CandidateId, CandidateSummary, DistrictId, DistrictSummary, Election, ElectionId,
    ElectionSummary, EntityKind, ParticipationUnit, PollingStationId, PollingStationSummary,
    RegionId, RegionSummary, UnitVoteCount, Vote, VoteFilter, VoteStatistics,
};
use crate::store::Store;

/// Read-only queries over the vote ledger.
///
/// Results are deterministic for a fixed ledger state and are cached, tagged
/// with every scope that can change them. Participation, utilization,
/// statistics and the summaries count valid votes only; the plain counts and
/// group-by counts include invalidated votes unless the filter says
/// otherwise.
pub struct Aggregator {
    store: Arc<dyn Store>,
    cache: Arc<dyn ResultCache>,
    election_eligible_voters: Option<u64>,
    ttl: Duration,
}

impl Aggregator {
    pub fn new(store: Arc<dyn Store>, cache: Arc<dyn ResultCache>, config: &Config) -> Self {
        Self {
            store,
            cache,
            election_eligible_voters: config.election_eligible_voters(),
            ttl: config.cache_ttl(),
        }
    }

    /// Serve `key` from the cache, or compute it and cache the result.
    async fn cached<T, F>(&self, key: CacheKey, scopes: &[Scope], compute: F) -> Result<T>
    where
        T: Cacheable + Clone,
        F: Future<Output = Result<T>>,
    {
        if let Some(value) = self.cache.get(&key).await?.and_then(T::from_cached) {
            return Ok(value);
        }
        let seen = self.cache.generation(scopes).await?;
        let value = compute.await?;
        self.cache
            .put(key, value.clone().into_cached(), scopes, self.ttl, seen)
            .await?;
        Ok(value)
    }

    pub async fn find_votes(&self, filter: &VoteFilter) -> Result<Vec<Vote>> {
        self.cached(CacheKey::FindVotes(filter.clone()), &[Scope::Votes], async {
            Ok(self.store.find_votes(filter).await?)
        })
        .await
    }

    pub async fn count_votes(&self, filter: &VoteFilter) -> Result<u64> {
        self.cached(CacheKey::CountVotes(filter.clone()), &[Scope::Votes], async {
            Ok(self.store.count_votes(filter).await?)
        })
        .await
    }

    /// Number of votes cast by the voters of each region, by region name.
    /// Regions without votes are absent.
    pub async fn vote_counts_by_region(&self) -> Result<BTreeMap<String, u64>> {
        let scopes = [Scope::Votes, Scope::Voters, Scope::Regions];
        self.cached(CacheKey::CountsByRegion, &scopes, async {
            let counts = self.store.count_votes_by_region(&VoteFilter::all()).await?;
            Ok(by_name(counts))
        })
        .await
    }

    /// Number of votes cast by the voters of each district, by district name.
    /// Districts without votes are absent.
    pub async fn vote_counts_by_district(&self) -> Result<BTreeMap<String, u64>> {
        let scopes = [Scope::Votes, Scope::Voters, Scope::Districts];
        self.cached(CacheKey::CountsByDistrict, &scopes, async {
            let counts = self
                .store
                .count_votes_by_district(&VoteFilter::all())
                .await?;
            Ok(by_name(counts))
        })
        .await
    }

    /// Number of votes for each candidate of an election, by "first last"
    /// name. Empty for an unknown election.
    pub async fn vote_counts_by_candidate_in_election(
        &self,
        election: ElectionId,
    ) -> Result<BTreeMap<String, u64>> {
        let scopes = [Scope::Votes, Scope::Candidates];
        self.cached(CacheKey::CountsByCandidate(election), &scopes, async {
            let filter = VoteFilter::all().election(election);
            let mut counts = BTreeMap::new();
            for count in self.store.count_votes_by_candidate(&filter).await? {
                let name = format!("{} {}", count.first_name, count.last_name);
                *counts.entry(name).or_insert(0) += count.votes;
            }
            Ok(counts)
        })
        .await
    }

    /// Valid votes over eligible voters of the unit.
    pub async fn participation_rate(&self, unit: ParticipationUnit) -> Result<f64> {
        let scopes = match unit {
            ParticipationUnit::Region(_) => [Scope::Votes, Scope::Voters, Scope::Regions],
            ParticipationUnit::District(_) => [Scope::Votes, Scope::Voters, Scope::Districts],
            ParticipationUnit::Election(_) => [Scope::Votes, Scope::Voters, Scope::Elections],
        };
        self.cached(CacheKey::Participation(unit), &scopes, async {
            match unit {
                ParticipationUnit::Region(id) => {
                    self.require(EntityKind::Region, self.store.region(id).await?)?;
                    let (voters, votes) = self.region_figures(id).await?;
                    Ok(ratio(votes, voters))
                }
                ParticipationUnit::District(id) => {
                    self.require(EntityKind::District, self.store.district(id).await?)?;
                    let (voters, votes) = self.district_figures(id).await?;
                    Ok(ratio(votes, voters))
                }
                ParticipationUnit::Election(id) => {
                    self.require(EntityKind::Election, self.store.election(id).await?)?;
                    let (_, rate) = self.election_figures(id).await?;
                    Ok(rate)
                }
            }
        })
        .await
    }

    /// Valid votes cast at the station over its capacity.
    pub async fn utilization_rate(&self, station: PollingStationId) -> Result<f64> {
        let scopes = [Scope::Votes, Scope::PollingStations];
        self.cached(CacheKey::Utilization(station), &scopes, async {
            let station = self.require(
                EntityKind::PollingStation,
                self.store.polling_station(station).await?,
            )?;
            let (_, rate) = self.station_figures(station.id, station.capacity).await?;
            Ok(rate)
        })
        .await
    }

    /// Per-candidate results of an election.
    ///
    /// Covers every registered candidate, plus any other candidate holding
    /// votes in the election. Ordered by vote count, highest first, then by
    /// candidate ID.
    pub async fn vote_statistics(&self, election: ElectionId) -> Result<Vec<VoteStatistics>> {
        let scopes = [Scope::Votes, Scope::Candidates, Scope::Elections];
        self.cached(CacheKey::Statistics(election), &scopes, async {
            let election = self.require(EntityKind::Election, self.store.election(election).await?)?;
            let valid = VoteFilter::all().election(election.id).valid_only();
            let total = self.store.count_votes(&valid).await?;

            let mut counts: BTreeMap<CandidateId, u64> = self
                .store
                .count_votes_by_candidate(&valid)
                .await?
                .into_iter()
                .map(|count| (count.candidate_id, count.votes))
                .collect();
            let registered = self.store.election_candidate_ids(election.id).await?;
            let candidate_ids: BTreeSet<CandidateId> =
                registered.into_iter().chain(counts.keys().copied()).collect();

            let mut statistics = Vec::with_capacity(candidate_ids.len());
            for id in candidate_ids {
                let candidate = match self.store.candidate(id).await? {
                    Some(candidate) => candidate,
                    None => continue,
                };
                let vote_count = counts.remove(&id).unwrap_or(0);
                statistics.push(VoteStatistics {
                    candidate_id: candidate.id,
                    candidate_first_name: candidate.data.first_name,
                    candidate_last_name: candidate.data.last_name,
                    candidate_party: candidate.data.party,
                    election_id: election.id,
                    election_name: election.name.clone(),
                    vote_count,
                    vote_percentage: ratio(vote_count, total) * 100.0,
                });
            }
            statistics.sort_by(|a, b| {
                b.vote_count
                    .cmp(&a.vote_count)
                    .then(a.candidate_id.cmp(&b.candidate_id))
            });
            Ok(statistics)
        })
        .await
    }

    /// The candidates with the most valid votes across all elections, at
    /// most `limit` of them. Candidates without votes are left out.
    pub async fn top_candidates(&self, limit: usize) -> Result<Vec<CandidateSummary>> {
        if limit == 0 {
            return Err(Error::BadRequest("limit must be at least 1".to_string()));
        }
        let scopes = [Scope::Votes, Scope::Candidates, Scope::Elections];
        self.cached(CacheKey::TopCandidates(limit), &scopes, async {
            let mut counts = self
                .store
                .count_votes_by_candidate(&VoteFilter::all().valid_only())
                .await?;
            counts.sort_by(|a, b| {
                b.votes
                    .cmp(&a.votes)
                    .then(a.candidate_id.cmp(&b.candidate_id))
            });

            let mut top = Vec::with_capacity(limit.min(counts.len()));
            for count in counts.into_iter().take(limit) {
                let candidate = match self.store.candidate(count.candidate_id).await? {
                    Some(candidate) => candidate,
                    None => continue,
                };
                let election_ids = self.store.candidate_election_ids(candidate.id).await?;
                top.push(CandidateSummary {
                    candidate,
                    election_ids,
                    vote_count: count.votes,
                });
            }
            Ok(top)
        })
        .await
    }

    /// Every election with its valid vote total and participation rate, in
    /// ID order. Elections without votes are included with a total of 0.
    pub async fn elections_with_vote_counts(&self) -> Result<Vec<ElectionSummary>> {
        let scopes = [
            Scope::Votes,
            Scope::Voters,
            Scope::Candidates,
            Scope::Elections,
        ];
        self.cached(CacheKey::ElectionsWithVotes, &scopes, async {
            let totals: BTreeMap<ElectionId, u64> = self
                .store
                .count_votes_by_election(&VoteFilter::all().valid_only())
                .await?
                .into_iter()
                .map(|count| (count.election_id, count.votes))
                .collect();
            let eligible = self.eligible_voters().await?;

            let elections = self.store.elections().await?;
            let mut summaries = Vec::with_capacity(elections.len());
            for election in elections {
                let candidate_ids = self.store.election_candidate_ids(election.id).await?;
                let total_votes = totals.get(&election.id).copied().unwrap_or(0);
                summaries.push(ElectionSummary {
                    election,
                    candidate_ids,
                    total_votes,
                    participation_rate: ratio(total_votes, eligible),
                });
            }
            Ok(summaries)
        })
        .await
    }

    pub async fn region_summary(&self, id: RegionId) -> Result<RegionSummary> {
        let scopes = [Scope::Regions, Scope::Voters, Scope::Votes];
        self.cached(CacheKey::RegionSummary(id), &scopes, async {
            let region = self.require(EntityKind::Region, self.store.region(id).await?)?;
            let (voter_count, vote_count) = self.region_figures(id).await?;
            Ok(RegionSummary {
                region,
                voter_count,
                vote_count,
                participation_rate: ratio(vote_count, voter_count),
            })
        })
        .await
    }

    pub async fn district_summary(&self, id: DistrictId) -> Result<DistrictSummary> {
        let scopes = [
            Scope::Districts,
            Scope::PollingStations,
            Scope::Voters,
            Scope::Votes,
        ];
        self.cached(CacheKey::DistrictSummary(id), &scopes, async {
            let district = self.require(EntityKind::District, self.store.district(id).await?)?;
            let polling_station_ids = self.store.district_station_ids(id).await?;
            let (voter_count, vote_count) = self.district_figures(id).await?;
            Ok(DistrictSummary {
                district,
                polling_station_ids,
                voter_count,
                vote_count,
                participation_rate: ratio(vote_count, voter_count),
            })
        })
        .await
    }

    pub async fn polling_station_summary(
        &self,
        id: PollingStationId,
    ) -> Result<PollingStationSummary> {
        let scopes = [Scope::PollingStations, Scope::Districts, Scope::Votes];
        self.cached(CacheKey::PollingStationSummary(id), &scopes, async {
            let polling_station = self.require(
                EntityKind::PollingStation,
                self.store.polling_station(id).await?,
            )?;
            let district_ids = self.store.station_district_ids(id).await?;
            let (vote_count, utilization_rate) =
                self.station_figures(id, polling_station.capacity).await?;
            Ok(PollingStationSummary {
                polling_station,
                district_ids,
                vote_count,
                utilization_rate,
            })
        })
        .await
    }

    pub async fn election_summary(&self, id: ElectionId) -> Result<ElectionSummary> {
        let scopes = [
            Scope::Elections,
            Scope::Candidates,
            Scope::Voters,
            Scope::Votes,
        ];
        self.cached(CacheKey::ElectionSummary(id), &scopes, async {
            let election: Election =
                self.require(EntityKind::Election, self.store.election(id).await?)?;
            let candidate_ids = self.store.election_candidate_ids(id).await?;
            let (total_votes, participation_rate) = self.election_figures(id).await?;
            Ok(ElectionSummary {
                election,
                candidate_ids,
                total_votes,
                participation_rate,
            })
        })
        .await
    }

    pub async fn candidate_summary(&self, id: CandidateId) -> Result<CandidateSummary> {
        let scopes = [Scope::Candidates, Scope::Elections, Scope::Votes];
        self.cached(CacheKey::CandidateSummary(id), &scopes, async {
            let candidate = self.require(EntityKind::Candidate, self.store.candidate(id).await?)?;
            let election_ids = self.store.candidate_election_ids(id).await?;
            let vote_count = self
                .store
                .count_votes(&VoteFilter::all().candidate(id).valid_only())
                .await?;
            Ok(CandidateSummary {
                candidate,
                election_ids,
                vote_count,
            })
        })
        .await
    }

    fn require<T>(&self, kind: EntityKind, entity: Option<T>) -> Result<T> {
        entity.ok_or(Error::ReferenceNotFound(kind))
    }

    /// Registered voters and valid votes of a region.
    async fn region_figures(&self, id: RegionId) -> Result<(u64, u64)> {
        let voters = self.store.count_voters_in_region(id).await?;
        let votes = self.store.count_valid_votes_in_region(id).await?;
        Ok((voters, votes))
    }

    /// Registered voters and valid votes of a district.
    async fn district_figures(&self, id: DistrictId) -> Result<(u64, u64)> {
        let voters = self.store.count_voters_in_district(id).await?;
        let votes = self.store.count_valid_votes_in_district(id).await?;
        Ok((voters, votes))
    }

    /// Valid votes and participation rate of an election.
    async fn election_figures(&self, id: ElectionId) -> Result<(u64, f64)> {
        let votes = self
            .store
            .count_votes(&VoteFilter::all().election(id).valid_only())
            .await?;
        let eligible = self.eligible_voters().await?;
        Ok((votes, ratio(votes, eligible)))
    }

    /// The electorate that election participation is measured against.
    async fn eligible_voters(&self) -> Result<u64> {
        match self.election_eligible_voters {
            Some(eligible) => Ok(eligible),
            None => Ok(self.store.count_active_voters().await?),
        }
    }

    /// Valid votes and utilization rate of a polling station.
    async fn station_figures(
        &self,
        id: PollingStationId,
        capacity: Option<u32>,
    ) -> Result<(u64, f64)> {
        let votes = self
            .store
            .count_votes(&VoteFilter::all().polling_station(id).valid_only())
            .await?;
        Ok((votes, ratio(votes, capacity.map_or(0, u64::from))))
    }
}

/// Fold unit counts into a map by unit name. Units sharing a name are
/// summed.
fn by_name(counts: Vec<UnitVoteCount>) -> BTreeMap<String, u64> {
    let mut by_name = BTreeMap::new();
    for count in counts {
        *by_name.entry(count.name).or_insert(0) += count.votes;
    }
    by_name
}
