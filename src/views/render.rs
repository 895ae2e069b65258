use axum::{
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
};
use serde_json::json;

use crate::{models::CurrentUser, AppState};

pub fn is_htmx(headers: &HeaderMap) -> bool {
    headers
        .get("HX-Request")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Empty 200 asking htmx to navigate to `path`.
pub fn hx_redirect(path: &'static str) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("HX-Redirect", HeaderValue::from_static(path));
    (StatusCode::OK, headers, Html(String::new())).into_response()
}

pub fn render_partial(state: &AppState, tpl: &str, ctx: &serde_json::Value) -> String {
    state
        .hbs
        .render(tpl, ctx)
        .unwrap_or_else(|e| format!("template error: {e}"))
}

fn layout_context(title: &str, body_html: String, user: Option<&CurrentUser>) -> serde_json::Value {
    let user_json = user.map(|u| {
        json!({
            "id": u.id.to_hex(),
            "email": u.email,
            "username": u.username,
        })
    });

    json!({
        "title": title,
        "body": body_html,
        "is_logged_in": user.is_some(),
        "user": user_json,
    })
}

/// Wraps a rendered page body in the base layout.
pub fn render_full(
    state: &AppState,
    title: &str,
    body_html: String,
    user: Option<&CurrentUser>,
) -> Result<String, String> {
    state
        .hbs
        .render("layouts/base", &layout_context(title, body_html, user))
        .map_err(|e| e.to_string())
}

/// htmx navigations get the bare body, full loads get the layout around it.
pub fn render_page(
    state: &AppState,
    headers: &HeaderMap,
    status: StatusCode,
    title: &str,
    body_html: String,
    user: Option<&CurrentUser>,
) -> Response {
    if is_htmx(headers) {
        return (status, Html(body_html)).into_response();
    }

    match render_full(state, title, body_html, user) {
        Ok(page) => (status, Html(page)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, template = "layouts/base", "layout render failed");
            (StatusCode::INTERNAL_SERVER_ERROR, Html(e)).into_response()
        }
    }
}
