use log::{error, info, LevelFilter};
use rocket::Error as RocketError;
use tally_backend::Config;
use thiserror::Error;

/// Errors that are critical to the entire server.
#[derive(Debug, Error)]
enum Error {
    #[error(transparent)]
    RocketError(#[from] RocketError),
}

async fn run() -> Result<(), Error> {
    info!("Configuring server...");
    let rocket = tally_backend::build().ignite().await?;
    info!("...server configured!");
    if let Some(config) = rocket.state::<Config>() {
        info!(
            "Caching up to {} results for {:?}",
            config.cache_capacity(),
            config.cache_ttl()
        );
        match config.election_eligible_voters() {
            Some(voters) => info!("Election participation measured against {voters} voters"),
            None => info!("Election participation measured against active voters"),
        }
    }
    // The launch address itself is logged by the logger fairing on liftoff.
    // Disable rocket logging from now on.
    log4rs_dynamic_filters::DynamicLevelFilter::set("rocket", LevelFilter::Off);
    let _ = rocket.launch().await?;
    Ok(())
}

#[rocket::main]
async fn main() {
    // Set up logging.
    log4rs::init_file("log4rs.yaml", log4rs_dynamic_filters::default_deserializers())
        .expect("Failed to initialise logging");
    info!("Initialised logging");

    // Launch server.
    if let Err(err) = run().await {
        error!("{err}");
        error!("Critical failure, shutting down");
        std::process::exit(1)
    }
}
