//! Cache for aggregation results.
//!
//! Every cached result is tagged with the scopes it derives from, so a write
//! can drop exactly the results it may have made stale.

use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};

use dashmap::DashMap;
use log::debug;
use thiserror::Error;

use crate::model::{
    CandidateId, CandidateSummary, DistrictId, DistrictSummary, ElectionId, ElectionSummary,
    ParticipationUnit, PollingStationId, PollingStationSummary, RegionId, RegionSummary, Vote,
    VoteFilter, VoteStatistics,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("cache operation timed out")]
    Timeout,
    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

/// A family of stored data that cached results can derive from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    Votes,
    Voters,
    Candidates,
    Elections,
    Regions,
    Districts,
    PollingStations,
}

impl Scope {
    pub const ALL: [Scope; 7] = [
        Scope::Votes,
        Scope::Voters,
        Scope::Candidates,
        Scope::Elections,
        Scope::Regions,
        Scope::Districts,
        Scope::PollingStations,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// Identifies one aggregation query and its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    FindVotes(VoteFilter),
    CountVotes(VoteFilter),
    CountsByRegion,
    CountsByDistrict,
    CountsByCandidate(ElectionId),
    Participation(ParticipationUnit),
    Utilization(PollingStationId),
    Statistics(ElectionId),
    RegionSummary(RegionId),
    DistrictSummary(DistrictId),
    PollingStationSummary(PollingStationId),
    ElectionSummary(ElectionId),
    CandidateSummary(CandidateId),
    TopCandidates(usize),
    ElectionsWithVotes,
}

/// A cached aggregation result.
#[derive(Debug, Clone, PartialEq)]
pub enum Cached {
    Votes(Vec<Vote>),
    Count(u64),
    Counts(BTreeMap<String, u64>),
    Rate(f64),
    Statistics(Vec<VoteStatistics>),
    Region(RegionSummary),
    District(DistrictSummary),
    PollingStation(PollingStationSummary),
    Election(ElectionSummary),
    Candidate(CandidateSummary),
    Candidates(Vec<CandidateSummary>),
    Elections(Vec<ElectionSummary>),
}

/// A result type that can be stored as a [`Cached`] value.
pub trait Cacheable: Sized {
    fn into_cached(self) -> Cached;
    fn from_cached(cached: Cached) -> Option<Self>;
}

macro_rules! cacheable {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl Cacheable for $ty {
                fn into_cached(self) -> Cached {
                    Cached::$variant(self)
                }

                fn from_cached(cached: Cached) -> Option<Self> {
                    match cached {
                        Cached::$variant(value) => Some(value),
                        _ => None,
                    }
                }
            }
        )*
    };
}

cacheable! {
    Vec<Vote> => Votes,
    u64 => Count,
    BTreeMap<String, u64> => Counts,
    f64 => Rate,
    Vec<VoteStatistics> => Statistics,
    RegionSummary => Region,
    DistrictSummary => District,
    PollingStationSummary => PollingStation,
    ElectionSummary => Election,
    CandidateSummary => Candidate,
    Vec<CandidateSummary> => Candidates,
    Vec<ElectionSummary> => Elections,
}

/// How many times a set of scopes had been invalidated when a result was
/// computed. A result computed under a stale generation is not cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generation(u64);

#[rocket::async_trait]
pub trait ResultCache: Send + Sync {
    /// The live entry for `key`, if any.
    async fn get(&self, key: &CacheKey) -> Result<Option<Cached>, CacheError>;

    /// The current generation of `scopes`. Read it before computing a value
    /// to [`put`](ResultCache::put).
    async fn generation(&self, scopes: &[Scope]) -> Result<Generation, CacheError>;

    /// Store `value` under `key` for `ttl`, tagged with `scopes`.
    ///
    /// The value is dropped if any of `scopes` has been invalidated since
    /// `seen` was read.
    async fn put(
        &self,
        key: CacheKey,
        value: Cached,
        scopes: &[Scope],
        ttl: Duration,
        seen: Generation,
    ) -> Result<(), CacheError>;

    /// Drop every entry tagged with `scope`.
    async fn invalidate(&self, scope: Scope) -> Result<(), CacheError>;
}

#[derive(Debug)]
struct Entry {
    value: Cached,
    scopes: Vec<Scope>,
    expires_at: Instant,
    stamp: u64,
}

impl Entry {
    fn is_live(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// In-process [`ResultCache`] with per-entry TTL and bounded size.
#[derive(Debug)]
pub struct MemoryCache {
    entries: DashMap<CacheKey, Entry>,
    capacity: usize,
    /// Invalidation count of each scope, indexed by [`Scope::index`].
    generations: [AtomicU64; 7],
    stamps: AtomicU64,
}

impl MemoryCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: DashMap::with_capacity(capacity),
            capacity: capacity.max(1),
            generations: Default::default(),
            stamps: AtomicU64::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn generation_of(&self, scopes: &[Scope]) -> Generation {
        Generation(
            scopes
                .iter()
                .map(|scope| self.generations[scope.index()].load(Ordering::SeqCst))
                .sum(),
        )
    }

    /// Make room for one more entry.
    ///
    /// Expired entries go first. If the cache is still full, an arbitrary
    /// tenth of the entries is dropped.
    fn evict(&self) {
        if self.entries.len() < self.capacity {
            return;
        }
        self.entries.retain(|_, entry| entry.is_live());

        if self.entries.len() >= self.capacity {
            let to_remove: Vec<CacheKey> = self
                .entries
                .iter()
                .take((self.capacity / 10).max(1))
                .map(|entry| entry.key().clone())
                .collect();
            for key in to_remove {
                self.entries.remove(&key);
            }
        }
    }
}

#[rocket::async_trait]
impl ResultCache for MemoryCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<Cached>, CacheError> {
        let hit = self
            .entries
            .get(key)
            .filter(|entry| entry.is_live())
            .map(|entry| entry.value.clone());
        if hit.is_none() {
            self.entries.remove_if(key, |_, entry| !entry.is_live());
        }
        Ok(hit)
    }

    async fn generation(&self, scopes: &[Scope]) -> Result<Generation, CacheError> {
        Ok(self.generation_of(scopes))
    }

    async fn put(
        &self,
        key: CacheKey,
        value: Cached,
        scopes: &[Scope],
        ttl: Duration,
        seen: Generation,
    ) -> Result<(), CacheError> {
        if self.generation_of(scopes) != seen {
            debug!("Discarded stale result for {key:?}");
            return Ok(());
        }
        self.evict();
        let stamp = self.stamps.fetch_add(1, Ordering::SeqCst);
        self.entries.insert(
            key.clone(),
            Entry {
                value,
                scopes: scopes.to_vec(),
                expires_at: Instant::now() + ttl,
                stamp,
            },
        );
        // An invalidation between the check above and the insert may have
        // missed this entry.
        if self.generation_of(scopes) != seen {
            self.entries.remove_if(&key, |_, entry| entry.stamp == stamp);
            debug!("Discarded stale result for {key:?}");
        }
        Ok(())
    }

    async fn invalidate(&self, scope: Scope) -> Result<(), CacheError> {
        // Bump first, so a concurrent put either sees the bump or has its
        // entry swept below.
        self.generations[scope.index()].fetch_add(1, Ordering::SeqCst);
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| !entry.scopes.contains(&scope));
        debug!(
            "Invalidated {} cached results for {scope:?}",
            before.saturating_sub(self.entries.len())
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    async fn fill(
        cache: &MemoryCache,
        key: &CacheKey,
        value: Cached,
        scopes: &[Scope],
        ttl: Duration,
    ) {
        let seen = cache.generation(scopes).await.unwrap();
        cache.put(key.clone(), value, scopes, ttl, seen).await.unwrap();
    }

    #[rocket::async_test]
    async fn get_returns_what_was_put() {
        let cache = MemoryCache::new(10);
        let key = CacheKey::CountVotes(VoteFilter::all());
        assert_eq!(cache.get(&key).await, Ok(None));

        fill(&cache, &key, Cached::Count(3), &[Scope::Votes], TTL).await;
        assert_eq!(cache.get(&key).await, Ok(Some(Cached::Count(3))));
    }

    #[rocket::async_test]
    async fn filters_are_distinct_keys() {
        let cache = MemoryCache::new(10);
        let all = CacheKey::CountVotes(VoteFilter::all());
        let valid = CacheKey::CountVotes(VoteFilter::all().valid_only());
        fill(&cache, &all, Cached::Count(3), &[Scope::Votes], TTL).await;
        assert_eq!(cache.get(&valid).await, Ok(None));
    }

    #[rocket::async_test]
    async fn expired_entries_are_not_returned() {
        let cache = MemoryCache::new(10);
        let key = CacheKey::Utilization(1);
        fill(&cache, &key, Cached::Rate(0.5), &[Scope::Votes], Duration::ZERO).await;
        assert_eq!(cache.get(&key).await, Ok(None));
        assert!(cache.is_empty());
    }

    #[rocket::async_test]
    async fn invalidation_drops_only_tagged_entries() {
        let cache = MemoryCache::new(10);
        let statistics = CacheKey::Statistics(1);
        let utilization = CacheKey::Utilization(1);
        fill(
            &cache,
            &statistics,
            Cached::Statistics(vec![]),
            &[Scope::Votes, Scope::Candidates, Scope::Elections],
            TTL,
        )
        .await;
        fill(
            &cache,
            &utilization,
            Cached::Rate(0.1),
            &[Scope::Votes, Scope::PollingStations],
            TTL,
        )
        .await;

        cache.invalidate(Scope::Candidates).await.unwrap();
        assert_eq!(cache.get(&statistics).await, Ok(None));
        assert_eq!(cache.get(&utilization).await, Ok(Some(Cached::Rate(0.1))));

        cache.invalidate(Scope::Votes).await.unwrap();
        assert!(cache.is_empty());
    }

    #[rocket::async_test]
    async fn result_computed_before_invalidation_is_not_stored() {
        let cache = MemoryCache::new(10);
        let key = CacheKey::CountVotes(VoteFilter::all());
        let seen = cache.generation(&[Scope::Votes]).await.unwrap();

        // A write lands while the result is being computed.
        cache.invalidate(Scope::Votes).await.unwrap();
        cache
            .put(key.clone(), Cached::Count(0), &[Scope::Votes], TTL, seen)
            .await
            .unwrap();
        assert_eq!(cache.get(&key).await, Ok(None));

        // Invalidating an unrelated scope does not hold results back.
        let seen = cache.generation(&[Scope::Votes]).await.unwrap();
        cache.invalidate(Scope::Regions).await.unwrap();
        cache
            .put(key.clone(), Cached::Count(1), &[Scope::Votes], TTL, seen)
            .await
            .unwrap();
        assert_eq!(cache.get(&key).await, Ok(Some(Cached::Count(1))));
    }

    #[rocket::async_test]
    async fn size_stays_bounded() {
        let cache = MemoryCache::new(20);
        for id in 0..100 {
            let key = CacheKey::Utilization(id);
            fill(&cache, &key, Cached::Rate(0.0), &[Scope::Votes], TTL).await;
        }
        assert!(cache.len() <= 20);
        // The most recent entry always survives its own insertion.
        assert!(cache.get(&CacheKey::Utilization(99)).await.unwrap().is_some());
    }
}
