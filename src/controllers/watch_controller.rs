use axum::{
    extract::{Extension, Form, Path, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
};
use mongodb::bson::oid::ObjectId;
use serde::Deserialize;
use serde_json::json;

use crate::{
    error::WatchError,
    models::{AlertDraft, AlertRecord, CurrentUser, Frequency},
    render,
    services::{
        sessions::watch_for,
        watch_component::{
            Confirmation, DeleteOutcome, DialogClose, DialogMode, DialogOutcome, DialogRequest, DialogState,
            DIALOG_WIDTH,
        },
    },
    AppState,
};

fn hx_trigger_value(events: &[&str]) -> HeaderValue {
    if events.len() == 1 {
        return HeaderValue::from_str(events[0]).unwrap_or_else(|_| HeaderValue::from_static(""));
    }

    let mut map = serde_json::Map::new();
    for &e in events {
        map.insert(e.to_string(), serde_json::Value::Bool(true));
    }

    let json = serde_json::Value::Object(map).to_string();
    HeaderValue::from_str(&json).unwrap_or_else(|_| HeaderValue::from_static(""))
}

fn unauthorized_snippet() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Html(r#"<div class="text-danger">Unauthorized</div>"#.to_string()),
    )
        .into_response()
}

fn message_snippet(state: &AppState, status: StatusCode, kind: &str, message: &str) -> Response {
    let html = render::render_partial(
        state,
        "partials/alert_message",
        &json!({ "kind": kind, "message": message }),
    );
    (status, Html(html)).into_response()
}

fn error_response(state: &AppState, e: &WatchError) -> Response {
    let status = match e {
        WatchError::NotFound(_) => StatusCode::NOT_FOUND,
        WatchError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        WatchError::InvalidState(_) => StatusCode::CONFLICT,
        e if e.is_connection() => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    message_snippet(state, status, "danger", &e.to_string())
}

/// Empty body (closes the modal) plus a list refresh trigger.
fn closed_with_refresh() -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("HX-Trigger", hx_trigger_value(&["alertsUpdated"]));
    (StatusCode::OK, headers, Html(String::new())).into_response()
}

fn parse_id(id: &str) -> Result<ObjectId, Response> {
    ObjectId::parse_str(id).map_err(|_| (StatusCode::BAD_REQUEST, Html("bad id".to_string())).into_response())
}

fn fmt2(x: f64) -> String {
    format!("{:.2}", x)
}

fn alert_json(a: &AlertRecord) -> serde_json::Value {
    json!({
        "id": a.id.to_hex(),
        "subject": a.subject,
        "url": a.url,
        "email": a.email,
        "frequency": a.frequency.label(),
        "min": fmt2(a.min),
        "max": fmt2(a.max),
        "advertisement": a.advertisement,
    })
}

fn render_dialog(
    state: &AppState,
    editing: bool,
    data: serde_json::Value,
    errors: serde_json::Map<String, serde_json::Value>,
) -> String {
    render::render_partial(
        state,
        "partials/watch_dialog",
        &json!({
            "width": DIALOG_WIDTH,
            "editing": editing,
            "data": data,
            "errors": errors,
        }),
    )
}

fn render_dialog_request(state: &AppState, req: &DialogRequest) -> Response {
    let data = serde_json::to_value(&req.data).unwrap_or(serde_json::Value::Null);
    let editing = matches!(req.mode, DialogMode::Edit(_));
    let html = render_dialog(state, editing, data, serde_json::Map::new());
    (StatusCode::OK, Html(html)).into_response()
}

// ---------------- Page ----------------

// GET /watch
pub async fn get_watch_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    user: Option<Extension<CurrentUser>>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized_snippet();
    };

    let watch = watch_for(&state, &u);
    watch.start();

    let body = render::render_partial(&state, "pages/watch", &json!({}));
    render::render_page(&state, &headers, StatusCode::OK, "Alerts", body, Some(&u))
}

// GET /watch/list
pub async fn get_watch_list(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized_snippet();
    };

    let alerts = watch_for(&state, &u).alerts();
    let items: Vec<serde_json::Value> = alerts.iter().map(alert_json).collect();

    let html = render::render_partial(
        &state,
        "partials/watch_list",
        &json!({ "alerts": items, "has_alerts": !items.is_empty() }),
    );
    (StatusCode::OK, Html(html)).into_response()
}

// POST /watch/reload
pub async fn post_reload(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized_snippet();
    };

    let watch = watch_for(&state, &u);
    watch.start();
    watch.reload();

    (StatusCode::OK, Html(String::new())).into_response()
}

// POST /watch/stop
pub async fn post_stop(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized_snippet();
    };

    let stopped = state.sessions.stop(&u.id);
    tracing::info!(user_id = %u.id, stopped, "watch processing stop requested");

    message_snippet(&state, StatusCode::OK, "info", "Alert processing stopped.")
}

// ---------------- Dialog ----------------

#[derive(Debug, Default, Deserialize)]
pub struct AlertForm {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub frequency: String,
    #[serde(default)]
    pub min: String,
    #[serde(default)]
    pub max: String,
    #[serde(default)]
    pub advertisement: String,
}

impl AlertForm {
    fn values(&self) -> serde_json::Value {
        json!({
            "subject": self.subject,
            "url": self.url,
            "email": self.email,
            "frequency": self.frequency,
            "min": self.min,
            "max": self.max,
            "advertisement": self.advertisement,
        })
    }

    /// Parses and validates the form; errors are keyed by field name.
    pub fn to_draft(&self) -> Result<AlertDraft, serde_json::Map<String, serde_json::Value>> {
        let mut errors = serde_json::Map::new();

        let frequency = match self.frequency.parse::<Frequency>() {
            Ok(f) => Some(f),
            Err(e) => {
                errors.insert("frequency".into(), json!(e));
                None
            }
        };

        let mut bound = |field: &str, raw: &str| match raw.trim().parse::<f64>() {
            Ok(v) => Some(v),
            Err(_) => {
                errors.insert(field.into(), json!("Enter a valid price."));
                None
            }
        };
        let min = bound("min", &self.min);
        let max = bound("max", &self.max);

        let (Some(frequency), Some(min), Some(max)) = (frequency, min, max) else {
            return Err(errors);
        };

        let draft = AlertDraft {
            subject: self.subject.clone(),
            url: self.url.clone(),
            email: self.email.clone(),
            frequency,
            min,
            max,
            advertisement: self.advertisement.clone(),
        };

        draft.validate().map_err(|errs| {
            errs.into_iter()
                .map(|(field, msg)| (field.to_string(), json!(msg)))
                .collect()
        })
    }
}

// GET /watch/new
pub async fn get_new_dialog(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized_snippet();
    };

    let req = watch_for(&state, &u).open_dialog();
    render_dialog_request(&state, &req)
}

// GET /watch/:id/edit
pub async fn get_edit_dialog(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: Option<Extension<CurrentUser>>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized_snippet();
    };

    let oid = match parse_id(&id) {
        Ok(x) => x,
        Err(res) => return res,
    };

    match watch_for(&state, &u).edit_notification(oid) {
        Ok(req) => render_dialog_request(&state, &req),
        Err(e) => error_response(&state, &e),
    }
}

// POST /watch/dialog
pub async fn post_dialog(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    Form(form): Form<AlertForm>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized_snippet();
    };

    let watch = watch_for(&state, &u);
    let editing = match watch.dialog_state() {
        DialogState::DialogOpen(mode) => matches!(mode, DialogMode::Edit(_)),
        _ => return error_response(&state, &WatchError::InvalidState("no dialog is open")),
    };

    let draft = match form.to_draft() {
        Ok(d) => d,
        Err(errors) => {
            let html = render_dialog(&state, editing, form.values(), errors);
            return (StatusCode::OK, Html(html)).into_response();
        }
    };

    match watch.close_dialog(DialogClose::Saved(draft)).await {
        Ok(DialogOutcome::Reloaded) | Ok(DialogOutcome::Refreshed(_)) => closed_with_refresh(),
        Ok(DialogOutcome::Dismissed) => (StatusCode::OK, Html(String::new())).into_response(),
        Err(e @ WatchError::InvalidState(_)) => error_response(&state, &e),
        Err(e) => {
            tracing::warn!(user_id = %u.id, error = %e, "saving alert failed");
            let mut errors = serde_json::Map::new();
            errors.insert("_form".into(), json!(e.to_string()));
            let html = render_dialog(&state, editing, form.values(), errors);
            (StatusCode::OK, Html(html)).into_response()
        }
    }
}

// POST /watch/dialog/cancel
pub async fn post_dialog_cancel(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized_snippet();
    };

    // a stale modal may be closed twice
    let _ = watch_for(&state, &u).close_dialog(DialogClose::Cancelled).await;
    (StatusCode::OK, Html(String::new())).into_response()
}

// ---------------- Delete ----------------

// GET /watch/:id/delete
pub async fn get_delete_prompt(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: Option<Extension<CurrentUser>>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized_snippet();
    };

    let oid = match parse_id(&id) {
        Ok(x) => x,
        Err(res) => return res,
    };

    match watch_for(&state, &u).delete_notification(oid) {
        Ok(message) => {
            let html = render::render_partial(&state, "partials/confirm_delete", &json!({ "message": message }));
            (StatusCode::OK, Html(html)).into_response()
        }
        Err(e) => error_response(&state, &e),
    }
}

#[derive(Debug, Deserialize)]
pub struct DecisionForm {
    #[serde(default)]
    pub decision: String,
}

// POST /watch/delete
pub async fn post_delete(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    Form(form): Form<DecisionForm>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized_snippet();
    };

    let confirmation = if form.decision.eq_ignore_ascii_case("confirm") {
        Confirmation::Confirmed
    } else {
        Confirmation::Cancelled
    };

    match watch_for(&state, &u).resolve_delete(confirmation).await {
        Ok(DeleteOutcome::Deleted(_)) => closed_with_refresh(),
        Ok(DeleteOutcome::Kept) => (StatusCode::OK, Html(String::new())).into_response(),
        Err(e) => {
            tracing::warn!(user_id = %u.id, error = %e, "deleting alert failed");
            error_response(&state, &e)
        }
    }
}
