//! The core services: vote admission, aggregation and the registry.
//!
//! Each service is placed in Rocket's managed state and shares the store and
//! the result cache with the others.

use log::debug;

use crate::cache::{ResultCache, Scope};
use crate::error::Result;

mod admission;
mod aggregation;
mod eligibility;
mod locks;
mod registry;

pub use admission::VoteAdmission;
pub use aggregation::Aggregator;
pub use eligibility::{check_eligibility, Ineligible, Verdict};
pub use locks::{KeyGuard, KeyedLocks};
pub use registry::Registry;

/// Drop every cached result tagged with one of `scopes`.
pub(crate) async fn invalidate(cache: &dyn ResultCache, scopes: &[Scope]) -> Result<()> {
    for &scope in scopes {
        cache.invalidate(scope).await?;
    }
    debug!("Invalidated cache scopes {scopes:?}");
    Ok(())
}
