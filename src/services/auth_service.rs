use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use mongodb::bson::{doc, oid::ObjectId};

use crate::{
    auth::Claims,
    config::Settings,
    error::{WatchError, WatchResult},
    models::User,
    services::db_init,
};

pub const INVALID_CREDENTIALS: &str = "Invalid email or password.";

/// Session lifetime in days.
pub const SESSION_DAYS: i64 = 7;

pub fn issue_session_token(settings: &Settings, user_id: &ObjectId) -> WatchResult<String> {
    let exp = (Utc::now() + Duration::days(SESSION_DAYS)).timestamp();
    let claims = Claims {
        sub: user_id.to_hex(),
        exp: usize::try_from(exp).unwrap_or(usize::MAX),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(settings.jwt_secret.as_bytes()),
    )
    .map_err(|e| WatchError::Validation(format!("Could not start a session: {e}")))
}

fn session_cookie(settings: &Settings, value: String) -> Cookie<'static> {
    let mut cookie = Cookie::new(settings.jwt_cookie_name.clone(), value);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_secure(settings.cookie_secure);
    cookie
}

pub fn auth_cookie(settings: &Settings, token: String) -> Cookie<'static> {
    session_cookie(settings, token)
}

pub fn clear_auth_cookie(settings: &Settings) -> Cookie<'static> {
    let mut cookie = session_cookie(settings, String::new());
    cookie.make_removal();
    cookie
}

/// Checks credentials. An unreachable store is reported as
/// [`WatchError::Connection`], wrong credentials as a validation error.
pub async fn user_login(db: &mongodb::Database, email: &str, password: &str) -> WatchResult<User> {
    let users = db.collection::<User>(db_init::USERS);

    let user = users
        .find_one(doc! { "email": email }, None)
        .await
        .map_err(|e| WatchError::Connection(e.to_string()))?
        .ok_or_else(|| WatchError::Validation(INVALID_CREDENTIALS.to_string()))?;

    match bcrypt::verify(password, &user.password_hash) {
        Ok(true) => Ok(user),
        Ok(false) => Err(WatchError::Validation(INVALID_CREDENTIALS.to_string())),
        Err(e) => {
            tracing::warn!(user_id = %user.id, error = %e, "stored password hash is unreadable");
            Err(WatchError::Validation(INVALID_CREDENTIALS.to_string()))
        }
    }
}
