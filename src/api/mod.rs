use rocket::Route;

mod registry;
mod statistics;
mod votes;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(votes::routes());
    routes.extend(statistics::routes());
    routes.extend(registry::routes());
    routes
}
