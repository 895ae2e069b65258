use axum::{
    middleware::{from_fn, from_fn_with_state},
    Router,
};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::{controllers::home_controller, AppState};

pub mod auth_routes;
pub mod home_routes;
pub mod realtime_routes;
pub mod watch_routes;

type AddRoutes = fn(Router<AppState>) -> Router<AppState>;

const AREAS: &[AddRoutes] = &[
    home_routes::add_routes,
    auth_routes::add_routes,
    watch_routes::add_routes,
    realtime_routes::add_routes,
];

pub fn app(state: AppState) -> Router {
    let router = AREAS.iter().fold(Router::new(), |router, add| add(router));

    // layers run bottom-up: trace, resolve the user, then gate on it
    router
        .nest_service("/static", ServeDir::new("static"))
        .fallback(home_controller::not_found)
        .layer(from_fn(crate::auth::require_auth))
        .layer(from_fn_with_state(state.clone(), crate::auth::inject_current_user))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
