use chrono::Utc;
use futures_util::StreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId},
    options::FindOptions,
    Collection, Database,
};
use serde_json::json;
use tokio::sync::broadcast;

use crate::{
    error::{mongo_unreachable, WatchError, WatchResult},
    models::{Acknowledgement, AlertDraft, AlertRecord, PersistedUpdate, PollResult, WatchEvent},
    services::{advert_client::AdvertClient, db_init, notification_service::NotificationService},
};

/// Production [`NotificationService`] for one user: MongoDB for records, the
/// advertisement API for polling, SSE (and an optional webhook) for delivery.
#[derive(Clone)]
pub struct MongoNotificationService {
    db: Database,
    user_id: ObjectId,
    adverts: AdvertClient,
    events_tx: broadcast::Sender<WatchEvent>,
    webhook: Option<String>,
    http: reqwest::Client,
}

impl MongoNotificationService {
    pub fn new(
        db: Database,
        user_id: ObjectId,
        adverts: AdvertClient,
        events_tx: broadcast::Sender<WatchEvent>,
        webhook: Option<String>,
    ) -> Self {
        Self {
            db,
            user_id,
            adverts,
            events_tx,
            webhook,
            http: reqwest::Client::new(),
        }
    }

    fn alerts(&self) -> Collection<AlertRecord> {
        self.db.collection::<AlertRecord>(db_init::ALERTS)
    }

    fn updates(&self) -> Collection<PersistedUpdate> {
        self.db.collection::<PersistedUpdate>(db_init::UPDATES)
    }

    async fn list_alerts(&self) -> WatchResult<Vec<AlertRecord>> {
        let find_opts = FindOptions::builder().sort(doc! { "created_at": 1 }).build();

        let mut cursor = self
            .alerts()
            .find(doc! { "user_id": self.user_id }, find_opts)
            .await
            .map_err(connection_or_fetch)?;

        let mut items = Vec::new();
        while let Some(res) = cursor.next().await {
            items.push(res?);
        }

        Ok(items)
    }

    async fn post_webhook(&self, url: &str, update: &PersistedUpdate, message: &str) -> WatchResult<()> {
        let payload = json!({
            "alert_id": update.alert_id.to_hex(),
            "email": update.email,
            "subject": update.subject,
            "advertisement": update.advertisement,
            "price": update.price,
            "available": update.available,
            "message": message,
            "timestamp": update.saved_at,
        });

        let res = self
            .http
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| WatchError::Send(e.to_string()))?;

        if !res.status().is_success() {
            return Err(WatchError::Send(format!("webhook returned {}", res.status())));
        }

        Ok(())
    }
}

fn connection_or_fetch(e: mongodb::error::Error) -> WatchError {
    if mongo_unreachable(&e) {
        WatchError::Connection(e.to_string())
    } else {
        WatchError::Fetch(e.to_string())
    }
}

impl NotificationService for MongoNotificationService {
    async fn count_notification(&self) -> WatchResult<Vec<AlertRecord>> {
        self.list_alerts().await
    }

    async fn query_advertisement(&self, alert: &AlertRecord) -> WatchResult<PollResult> {
        let state = self.adverts.advertisement(&alert.advertisement).await?;
        Ok(PollResult::for_alert(alert, state.price, state.available, Utc::now().timestamp()))
    }

    async fn save_notification(&self, result: PollResult) -> WatchResult<PersistedUpdate> {
        let update = PersistedUpdate::from_poll(ObjectId::new(), result, Utc::now().timestamp());

        self.updates()
            .insert_one(&update, None)
            .await
            .map_err(|e| WatchError::Save(e.to_string()))?;

        Ok(update)
    }

    async fn send_notification(&self, update: &PersistedUpdate) -> WatchResult<Acknowledgement> {
        let message = update.message();

        if !update.matched {
            return Ok(Acknowledgement {
                update_id: update.id,
                delivered: false,
                message,
            });
        }

        if let Some(url) = self.webhook.as_deref() {
            self.post_webhook(url, update, &message).await?;
        }

        // no open page is not a failure, the webhook (if any) already went out
        let _ = self.events_tx.send(WatchEvent::Notified {
            user_id: update.user_id,
            alert_id: update.alert_id.to_hex(),
            message: message.clone(),
        });

        Ok(Acknowledgement {
            update_id: update.id,
            delivered: true,
            message,
        })
    }

    async fn delete_notification(&self, id: ObjectId) -> WatchResult<Vec<AlertRecord>> {
        let res = self
            .alerts()
            .delete_one(doc! { "_id": id, "user_id": self.user_id }, None)
            .await
            .map_err(|e| WatchError::Delete(e.to_string()))?;

        if res.deleted_count == 0 {
            return Err(WatchError::NotFound(id.to_hex()));
        }

        self.list_alerts().await
    }

    async fn create_notification(&self, draft: AlertDraft) -> WatchResult<AlertRecord> {
        let alert = AlertRecord::from_draft(ObjectId::new(), self.user_id, draft, Utc::now().timestamp());

        self.alerts()
            .insert_one(&alert, None)
            .await
            .map_err(|e| WatchError::Save(e.to_string()))?;

        Ok(alert)
    }

    async fn update_notification(&self, id: ObjectId, draft: AlertDraft) -> WatchResult<AlertRecord> {
        let filter = doc! { "_id": id, "user_id": self.user_id };

        let existing = self
            .alerts()
            .find_one(filter.clone(), None)
            .await
            .map_err(connection_or_fetch)?
            .ok_or_else(|| WatchError::NotFound(id.to_hex()))?;

        let updated = AlertRecord::from_draft(id, self.user_id, draft, existing.created_at);

        self.alerts()
            .replace_one(filter, &updated, None)
            .await
            .map_err(|e| WatchError::Save(e.to_string()))?;

        Ok(updated)
    }
}
