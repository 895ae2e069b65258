use mongodb::bson::oid::ObjectId;
use serde::Serialize;

/// Something a user's open pages should react to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WatchEvent {
    AlertsUpdated {
        #[serde(skip)]
        user_id: ObjectId,
        count: usize,
    },
    Error {
        #[serde(skip)]
        user_id: ObjectId,
        message: String,
    },
    Notified {
        #[serde(skip)]
        user_id: ObjectId,
        alert_id: String,
        message: String,
    },
}

impl WatchEvent {
    pub fn user_id(&self) -> ObjectId {
        match self {
            WatchEvent::AlertsUpdated { user_id, .. }
            | WatchEvent::Error { user_id, .. }
            | WatchEvent::Notified { user_id, .. } => *user_id,
        }
    }

    /// SSE event name, also used as the htmx trigger on the client.
    pub fn name(&self) -> &'static str {
        match self {
            WatchEvent::AlertsUpdated { .. } => "alertsUpdated",
            WatchEvent::Error { .. } => "watchError",
            WatchEvent::Notified { .. } => "watchNotification",
        }
    }
}
