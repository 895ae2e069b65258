use axum::{Router, routing::get};
use crate::{AppState, controllers::home_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    let health = Router::new()
        .route("/", get(home_controller::health))
        .route("/db", get(home_controller::health_db))
        .route("/watch", get(home_controller::health_watch));

    router
        .route("/", get(home_controller::home))
        .nest("/health", health)
}
