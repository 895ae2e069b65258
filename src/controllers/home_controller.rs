use axum::{
    extract::{Extension, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use mongodb::bson::doc;
use serde_json::json;

use crate::{models::CurrentUser, render, AppState};

pub async fn home() -> Redirect {
    Redirect::to("/watch")
}

pub async fn not_found(
    State(state): State<AppState>,
    headers: HeaderMap,
    user: Option<Extension<CurrentUser>>,
) -> Response {
    let body = render::render_partial(&state, "pages/not_found", &json!({}));
    let user = user.as_ref().map(|Extension(u)| u);

    render::render_page(&state, &headers, StatusCode::NOT_FOUND, "Not found", body, user)
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn health_db(State(state): State<AppState>) -> Response {
    match state.db.run_command(doc! { "ping": 1 }, None).await {
        Ok(_) => (StatusCode::OK, Html("mongo: ok")).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "mongo ping failed");
            (StatusCode::SERVICE_UNAVAILABLE, Html(format!("mongo error: {e}"))).into_response()
        }
    }
}

// GET /health/watch
pub async fn health_watch(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "sessions": state.sessions.len(),
        "subscribers": state.events_tx.receiver_count(),
    }))
}
