use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use mongodb::bson::{doc, oid::ObjectId};
use serde::{Deserialize, Serialize};

use crate::{
    config::Settings,
    models::{CurrentUser, User},
    render::{hx_redirect, is_htmx},
    services::db_init,
    AppState,
};

/// JWT payload of the session cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// user id, hex
    pub sub: String,
    pub exp: usize,
}

const PUBLIC_PATHS: &[&str] = &["/login", "/logout", "/health", "/favicon.ico"];
const PUBLIC_PREFIXES: &[&str] = &["/static/", "/health/"];

/// User id named by a valid, unexpired session cookie.
pub fn session_user_id(settings: &Settings, headers: &HeaderMap) -> Option<ObjectId> {
    let jar = CookieJar::from_headers(headers);
    let token = jar.get(&settings.jwt_cookie_name)?;

    let validation = Validation::new(Algorithm::HS256);
    let key = DecodingKey::from_secret(settings.jwt_secret.as_bytes());

    match decode::<Claims>(token.value(), &key, &validation) {
        Ok(data) => ObjectId::parse_str(&data.claims.sub).ok(),
        Err(e) => {
            tracing::debug!(error = %e, "rejected session cookie");
            None
        }
    }
}

/// Resolves the session cookie to a [`CurrentUser`] request extension.
pub async fn inject_current_user(State(state): State<AppState>, mut req: Request<Body>, next: Next) -> Response {
    let Some(user_id) = session_user_id(&state.settings, req.headers()) else {
        return next.run(req).await;
    };

    let users = state.db.collection::<User>(db_init::USERS);
    match users.find_one(doc! { "_id": user_id }, None).await {
        Ok(Some(user)) => {
            req.extensions_mut().insert(CurrentUser::from(user));
        }
        Ok(None) => tracing::debug!(user_id = %user_id, "session names an unknown user"),
        Err(e) => tracing::warn!(user_id = %user_id, error = %e, "session user lookup failed"),
    }

    next.run(req).await
}

fn is_public_path(path: &str) -> bool {
    PUBLIC_PATHS.contains(&path) || PUBLIC_PREFIXES.iter().any(|p| path.starts_with(p))
}

pub async fn require_auth(req: Request<Body>, next: Next) -> Response {
    let path = req.uri().path();

    if is_public_path(path) || req.extensions().get::<CurrentUser>().is_some() {
        return next.run(req).await;
    }

    // event streams can't follow a redirect
    if path == "/events" {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    if is_htmx(req.headers()) {
        return hx_redirect("/login");
    }

    Redirect::to("/login").into_response()
}
