use std::sync::Arc;

use log::{info, warn};

use super::invalidate;
use crate::cache::{ResultCache, Scope};
use crate::error::{Error, Result};
use crate::model::{
    Candidate, CandidateId, District, DistrictId, Election, ElectionId, ElectionPatch, EntityKind,
    NewCandidate, NewDistrict, NewElection, NewPollingStation, NewRegion, NewVoter,
    PollingStation, PollingStationId, PollingStationPatch, Region, RegionId, Voter, VoterId,
};
use crate::store::Store;

/// Administrative creation, lookup and partial update of the entities votes
/// refer to.
pub struct Registry {
    store: Arc<dyn Store>,
    cache: Arc<dyn ResultCache>,
}

impl Registry {
    pub fn new(store: Arc<dyn Store>, cache: Arc<dyn ResultCache>) -> Self {
        Self { store, cache }
    }

    pub async fn create_region(&self, region: NewRegion) -> Result<Region> {
        let region = self.store.insert_region(region).await?;
        info!("Created region {} ({})", region.id, region.name);
        invalidate(&*self.cache, &[Scope::Regions]).await?;
        Ok(region)
    }

    pub async fn create_district(&self, district: NewDistrict) -> Result<District> {
        self.region(district.region_id).await?;
        let district = self.store.insert_district(district).await?;
        info!("Created district {} ({})", district.id, district.name);
        invalidate(&*self.cache, &[Scope::Districts]).await?;
        Ok(district)
    }

    pub async fn create_polling_station(
        &self,
        station: NewPollingStation,
    ) -> Result<PollingStation> {
        let districts = self.resolve_districts(&station.district_ids).await?;
        let station_record = self
            .store
            .insert_polling_station(station.polling_station)
            .await?;
        self.store
            .set_station_districts(station_record.id, &districts)
            .await?;
        info!(
            "Created polling station {} ({})",
            station_record.id, station_record.name
        );
        invalidate(&*self.cache, &[Scope::PollingStations]).await?;
        Ok(station_record)
    }

    pub async fn create_voter(&self, voter: NewVoter) -> Result<Voter> {
        if let Some(region) = voter.region_id {
            self.region(region).await?;
        }
        if let Some(district) = voter.district_id {
            self.district(district).await?;
        }
        let voter = self.store.insert_voter(voter).await?;
        info!("Registered voter {}", voter.id);
        invalidate(&*self.cache, &[Scope::Voters]).await?;
        Ok(voter)
    }

    pub async fn create_candidate(&self, candidate: NewCandidate) -> Result<Candidate> {
        let candidate = self.store.insert_candidate(candidate).await?;
        info!("Created candidate {} ({})", candidate.id, candidate.full_name());
        invalidate(&*self.cache, &[Scope::Candidates]).await?;
        Ok(candidate)
    }

    pub async fn create_election(&self, election: NewElection) -> Result<Election> {
        let candidates = self.resolve_candidates(&election.candidate_ids).await?;
        let record = self.store.insert_election(election.election).await?;
        self.store
            .set_election_candidates(record.id, &candidates)
            .await?;
        info!("Created election {} ({})", record.id, record.name);
        invalidate(&*self.cache, &[Scope::Elections]).await?;
        Ok(record)
    }

    pub async fn region(&self, id: RegionId) -> Result<Region> {
        self.store
            .region(id)
            .await?
            .ok_or(Error::ReferenceNotFound(EntityKind::Region))
    }

    pub async fn district(&self, id: DistrictId) -> Result<District> {
        self.store
            .district(id)
            .await?
            .ok_or(Error::ReferenceNotFound(EntityKind::District))
    }

    pub async fn polling_station(&self, id: PollingStationId) -> Result<PollingStation> {
        self.store
            .polling_station(id)
            .await?
            .ok_or(Error::ReferenceNotFound(EntityKind::PollingStation))
    }

    pub async fn voter(&self, id: VoterId) -> Result<Voter> {
        self.store
            .voter(id)
            .await?
            .ok_or(Error::ReferenceNotFound(EntityKind::Voter))
    }

    pub async fn candidate(&self, id: CandidateId) -> Result<Candidate> {
        self.store
            .candidate(id)
            .await?
            .ok_or(Error::ReferenceNotFound(EntityKind::Candidate))
    }

    pub async fn election(&self, id: ElectionId) -> Result<Election> {
        self.store
            .election(id)
            .await?
            .ok_or(Error::ReferenceNotFound(EntityKind::Election))
    }

    /// Apply a partial update to an election.
    ///
    /// The candidate set is only touched if the patch carries a candidate
    /// list. Listed candidates that do not exist are skipped.
    pub async fn update_election(&self, id: ElectionId, patch: ElectionPatch) -> Result<Election> {
        let mut election = self
            .store
            .election(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Election with ID '{id}'")))?;
        patch.apply(&mut election);
        if !self.store.replace_election(&election).await? {
            return Err(Error::not_found(format!("Election with ID '{id}'")));
        }
        if let Some(ref candidate_ids) = patch.candidate_ids {
            let candidates = self.resolve_candidates(candidate_ids).await?;
            self.store.set_election_candidates(id, &candidates).await?;
        }
        info!("Updated election {id}");
        invalidate(&*self.cache, &[Scope::Elections]).await?;
        Ok(election)
    }

    /// Apply a partial update to a polling station.
    ///
    /// The district set is only touched if the patch carries a district
    /// list. Listed districts that do not exist are skipped.
    pub async fn update_polling_station(
        &self,
        id: PollingStationId,
        patch: PollingStationPatch,
    ) -> Result<PollingStation> {
        let mut station = self
            .store
            .polling_station(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Polling station with ID '{id}'")))?;
        patch.apply(&mut station);
        if !self.store.replace_polling_station(&station).await? {
            return Err(Error::not_found(format!("Polling station with ID '{id}'")));
        }
        if let Some(ref district_ids) = patch.district_ids {
            let districts = self.resolve_districts(district_ids).await?;
            self.store.set_station_districts(id, &districts).await?;
        }
        info!("Updated polling station {id}");
        invalidate(&*self.cache, &[Scope::PollingStations]).await?;
        Ok(station)
    }

    /// The listed candidates that exist, deduplicated, in the given order.
    async fn resolve_candidates(&self, ids: &[CandidateId]) -> Result<Vec<CandidateId>> {
        let mut resolved = Vec::with_capacity(ids.len());
        for &id in ids {
            if resolved.contains(&id) {
                continue;
            }
            if self.store.candidate(id).await?.is_some() {
                resolved.push(id);
            } else {
                warn!("Skipping unknown candidate {id}");
            }
        }
        Ok(resolved)
    }

    /// The listed districts that exist, deduplicated, in the given order.
    async fn resolve_districts(&self, ids: &[DistrictId]) -> Result<Vec<DistrictId>> {
        let mut resolved = Vec::with_capacity(ids.len());
        for &id in ids {
            if resolved.contains(&id) {
                continue;
            }
            if self.store.district(id).await?.is_some() {
                resolved.push(id);
            } else {
                warn!("Skipping unknown district {id}");
            }
        }
        Ok(resolved)
    }
}
