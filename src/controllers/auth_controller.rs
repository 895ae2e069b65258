use axum::{
    extract::{Extension, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    Form,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use serde_json::json;

use crate::{
    models::{is_valid_email, CurrentUser},
    render::{self, hx_redirect, is_htmx},
    services::auth_service,
    AppState,
};

type FieldErrors = serde_json::Map<String, serde_json::Value>;

fn login_form(state: &AppState, email: &str, errors: &FieldErrors) -> Response {
    let html = render::render_partial(
        state,
        "pages/login",
        &json!({ "values": { "email": email }, "errors": errors }),
    );
    (StatusCode::OK, Html(html)).into_response()
}

// GET /login
pub async fn get_login(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let body = render::render_partial(&state, "pages/login", &json!({}));
    render::render_page(&state, &headers, StatusCode::OK, "Log in", body, None)
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl LoginForm {
    fn check(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        let email = self.email.trim();

        if email.is_empty() {
            errors.insert("email".into(), json!("Email is required."));
        } else if !is_valid_email(email) {
            errors.insert("email".into(), json!("Invalid email."));
        }
        if self.password.trim().is_empty() {
            errors.insert("password".into(), json!("Password is required."));
        }

        errors
    }
}

// POST /login
pub async fn post_login(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    let email = form.email.trim();

    let mut errors = form.check();
    if !errors.is_empty() {
        return login_form(&state, email, &errors);
    }

    let session = async {
        let user = auth_service::user_login(&state.db, email, form.password.trim()).await?;
        let token = auth_service::issue_session_token(&state.settings, &user.id)?;
        Ok::<_, crate::error::WatchError>((user, token))
    };

    let (user, token) = match session.await {
        Ok(x) => x,
        Err(e) => {
            if e.is_connection() {
                tracing::error!(error = %e, "login backend unreachable");
            }
            errors.insert("_form".into(), json!(e.to_string()));
            return login_form(&state, email, &errors);
        }
    };

    tracing::info!(user_id = %user.id, "user logged in");
    let jar = jar.add(auth_service::auth_cookie(&state.settings, token));

    if is_htmx(&headers) {
        return (jar, hx_redirect("/watch")).into_response();
    }
    (StatusCode::SEE_OTHER, jar, [(header::LOCATION, "/watch")]).into_response()
}

// POST /logout
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
    user: Option<Extension<CurrentUser>>,
) -> Response {
    if let Some(Extension(u)) = user {
        let stopped = state.sessions.stop(&u.id);
        tracing::info!(user_id = %u.id, stopped, "user logged out");
    }

    let jar = jar.add(auth_service::clear_auth_cookie(&state.settings));
    (StatusCode::SEE_OTHER, jar, [(header::LOCATION, "/login")]).into_response()
}
