use std::{convert::Infallible, time::Duration};

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
};
use futures_util::stream::{self, Stream};
use serde_json::json;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::{
    models::{CurrentUser, WatchEvent},
    render, AppState,
};

fn event_payload(state: &AppState, evt: &WatchEvent) -> String {
    match evt {
        WatchEvent::AlertsUpdated { count, .. } => count.to_string(),
        WatchEvent::Error { message, .. } => render::render_partial(
            state,
            "partials/alert_message",
            &json!({ "kind": "danger", "message": message }),
        ),
        WatchEvent::Notified { message, .. } => render::render_partial(
            state,
            "partials/alert_message",
            &json!({ "kind": "info", "message": message }),
        ),
    }
}

/// SSE data fields split on `\n` but must never carry `\r`.
fn sse_event(name: &str, data: &str) -> Event {
    let data = if data.contains('\r') {
        data.replace("\r\n", "\n").replace('\r', "\n")
    } else {
        data.to_string()
    };
    Event::default().event(name).data(data)
}

/// The user's own watch events as an SSE stream.
pub fn user_event_stream(
    state: AppState,
    user: CurrentUser,
    rx: broadcast::Receiver<WatchEvent>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(rx, move |mut rx| {
        let state = state.clone();
        let user_id = user.id;

        async move {
            loop {
                match rx.recv().await {
                    Ok(evt) if evt.user_id() == user_id => {
                        let data = event_payload(&state, &evt);
                        return Some((Ok(sse_event(evt.name(), &data)), rx));
                    }
                    Ok(_) => continue,
                    Err(RecvError::Lagged(n)) => {
                        tracing::debug!(user_id = %user_id, skipped = n, "event stream lagged");
                        return Some((Ok(sse_event("ping", "lagged")), rx));
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        }
    })
}

// GET /events
pub async fn sse_events(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
) -> Response {
    let Some(Extension(u)) = user else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    let rx = state.events_tx.subscribe();
    let stream = user_event_stream(state, u, rx);

    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(Duration::from_secs(20))
                .text("keep-alive"),
        )
        .into_response()
}
