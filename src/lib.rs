#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use std::sync::Arc;

use rocket::{Build, Rocket};

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod service;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Config;

use cache::{MemoryCache, ResultCache};
use config::{ConfigFairing, DatabaseFairing};
use logging::LoggerFairing;
use service::{Aggregator, Registry, VoteAdmission};
use store::Store;

/// The production server: configuration and MongoDB are loaded on ignite.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(DatabaseFairing)
        .mount("/", api::routes())
}

/// A server over the given store and result cache, configured by `config`
/// rather than by the figment.
pub fn rocket_for(
    store: Arc<dyn Store>,
    cache: Arc<dyn ResultCache>,
    config: Config,
) -> Rocket<Build> {
    let rocket = rocket::build()
        .attach(LoggerFairing)
        .mount("/", api::routes());
    with_services(rocket, store, cache, &config).manage(config)
}

/// Place the services over `store` into managed state, sharing one
/// in-process result cache.
pub(crate) fn manage_services(
    rocket: Rocket<Build>,
    store: Arc<dyn Store>,
    config: &Config,
) -> Rocket<Build> {
    let cache = Arc::new(MemoryCache::new(config.cache_capacity()));
    with_services(rocket, store, cache, config)
}

fn with_services(
    rocket: Rocket<Build>,
    store: Arc<dyn Store>,
    cache: Arc<dyn ResultCache>,
    config: &Config,
) -> Rocket<Build> {
    rocket
        .manage(VoteAdmission::new(store.clone(), cache.clone()))
        .manage(Aggregator::new(store.clone(), cache.clone(), config))
        .manage(Registry::new(store, cache))
}
