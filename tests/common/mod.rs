#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    time::Duration,
};

use adwatch::{
    config,
    error::{WatchError, WatchResult},
    models::{Acknowledgement, AlertDraft, AlertRecord, Frequency, PersistedUpdate, PollResult},
    services::notification_service::NotificationService,
    AppState,
};
use http_body_util::BodyExt;
use mongodb::{bson::oid::ObjectId, Client};
use parking_lot::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Count,
    Query(ObjectId),
    Save(ObjectId),
    Send(ObjectId),
    Delete(ObjectId),
    Create,
    Update(ObjectId),
}

/// In-memory service that records every call.
///
/// `query_advertisement` reports the per-alert call number as the price, so
/// tests can tell which tick produced a result.
pub struct FakeNotifications {
    pub user_id: ObjectId,
    alerts: Mutex<Vec<AlertRecord>>,
    calls: Mutex<Vec<Call>>,
    count_delay: Mutex<Duration>,
    query_delays: Mutex<HashMap<ObjectId, VecDeque<Duration>>>,
    query_counts: Mutex<HashMap<ObjectId, u32>>,
    failing: Mutex<HashSet<ObjectId>>,
    fail_count: AtomicBool,
    save_delay: Mutex<Duration>,
    saving: AtomicUsize,
    saving_peak: AtomicUsize,
}

impl FakeNotifications {
    pub fn new(user_id: ObjectId, alerts: Vec<AlertRecord>) -> Self {
        Self {
            user_id,
            alerts: Mutex::new(alerts),
            calls: Mutex::new(Vec::new()),
            count_delay: Mutex::new(Duration::ZERO),
            query_delays: Mutex::new(HashMap::new()),
            query_counts: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            fail_count: AtomicBool::new(false),
            save_delay: Mutex::new(Duration::ZERO),
            saving: AtomicUsize::new(0),
            saving_peak: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub fn queries_for(&self, id: &ObjectId) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| **c == Call::Query(*id))
            .count()
    }

    pub fn set_alerts(&self, alerts: Vec<AlertRecord>) {
        *self.alerts.lock() = alerts;
    }

    pub fn set_count_delay(&self, d: Duration) {
        *self.count_delay.lock() = d;
    }

    pub fn set_save_delay(&self, d: Duration) {
        *self.save_delay.lock() = d;
    }

    /// Most saves ever running at the same time.
    pub fn saving_peak(&self) -> usize {
        self.saving_peak.load(Ordering::SeqCst)
    }

    pub fn count_calls(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| matches(c)).count()
    }

    pub fn fail_count(&self, fail: bool) {
        self.fail_count.store(fail, Ordering::SeqCst);
    }

    pub fn fail_queries_for(&self, id: ObjectId) {
        self.failing.lock().insert(id);
    }

    /// Delays for the next queries of `id`, consumed in order.
    pub fn queue_query_delays(&self, id: ObjectId, delays: &[Duration]) {
        self.query_delays
            .lock()
            .entry(id)
            .or_default()
            .extend(delays.iter().copied());
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }
}

impl NotificationService for FakeNotifications {
    async fn count_notification(&self) -> WatchResult<Vec<AlertRecord>> {
        self.record(Call::Count);

        let delay = *self.count_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.fail_count.load(Ordering::SeqCst) {
            return Err(WatchError::Fetch("alert store unavailable".to_string()));
        }
        Ok(self.alerts.lock().clone())
    }

    async fn query_advertisement(&self, alert: &AlertRecord) -> WatchResult<PollResult> {
        self.record(Call::Query(alert.id));

        let n = {
            let mut counts = self.query_counts.lock();
            let n = counts.entry(alert.id).or_insert(0);
            *n += 1;
            *n
        };
        let delay = self
            .query_delays
            .lock()
            .get_mut(&alert.id)
            .and_then(|q| q.pop_front())
            .unwrap_or(Duration::ZERO);

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.failing.lock().contains(&alert.id) {
            return Err(WatchError::Fetch(format!("advertisement {} unreachable", alert.advertisement)));
        }

        Ok(PollResult::for_alert(alert, f64::from(n), true, i64::from(n)))
    }

    async fn save_notification(&self, result: PollResult) -> WatchResult<PersistedUpdate> {
        self.record(Call::Save(result.alert_id));

        let running = self.saving.fetch_add(1, Ordering::SeqCst) + 1;
        self.saving_peak.fetch_max(running, Ordering::SeqCst);
        let delay = *self.save_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.saving.fetch_sub(1, Ordering::SeqCst);

        Ok(PersistedUpdate::from_poll(ObjectId::new(), result, 0))
    }

    async fn send_notification(&self, update: &PersistedUpdate) -> WatchResult<Acknowledgement> {
        self.record(Call::Send(update.alert_id));
        Ok(Acknowledgement {
            update_id: update.id,
            delivered: update.matched,
            message: update.message(),
        })
    }

    async fn delete_notification(&self, id: ObjectId) -> WatchResult<Vec<AlertRecord>> {
        self.record(Call::Delete(id));

        let mut alerts = self.alerts.lock();
        let before = alerts.len();
        alerts.retain(|a| a.id != id);
        if alerts.len() == before {
            return Err(WatchError::NotFound(id.to_hex()));
        }
        Ok(alerts.clone())
    }

    async fn create_notification(&self, draft: AlertDraft) -> WatchResult<AlertRecord> {
        self.record(Call::Create);

        let alert = AlertRecord::from_draft(ObjectId::new(), self.user_id, draft, 0);
        self.alerts.lock().push(alert.clone());
        Ok(alert)
    }

    async fn update_notification(&self, id: ObjectId, draft: AlertDraft) -> WatchResult<AlertRecord> {
        self.record(Call::Update(id));

        let mut alerts = self.alerts.lock();
        let slot = alerts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| WatchError::NotFound(id.to_hex()))?;
        *slot = AlertRecord::from_draft(id, self.user_id, draft, slot.created_at);
        Ok(slot.clone())
    }
}

pub fn draft(subject: &str, frequency: Frequency) -> AlertDraft {
    AlertDraft {
        subject: subject.to_string(),
        url: "https://ads.example.com/item/42".to_string(),
        email: "watcher@example.com".to_string(),
        frequency,
        min: 0.0,
        max: 1000.0,
        advertisement: "ad-42".to_string(),
    }
}

pub fn alert(user_id: ObjectId, subject: &str, frequency: Frequency) -> AlertRecord {
    AlertRecord::from_draft(ObjectId::new(), user_id, draft(subject, frequency), 0)
}

pub fn every_minute() -> Frequency {
    Frequency::every_minutes(1).expect("non-zero")
}

/// Lets spawned tasks run without moving the paused clock noticeably.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

/// App state over a lazily connecting client; nothing here needs a live server.
pub async fn test_state() -> AppState {
    let uri = config::load().mongodb_uri;
    state_with_mongo(&uri).await
}

/// App state whose store lives at `uri`.
pub async fn state_with_mongo(uri: &str) -> AppState {
    let mut settings = config::load();
    settings.mongodb_uri = uri.to_string();
    settings.advert_api_url = String::new();
    settings.notify_webhook_url = None;

    let client = Client::with_uri_str(&settings.mongodb_uri)
        .await
        .expect("mongodb client");
    let db = client.database(&settings.mongodb_db);

    AppState::new(db, settings)
}

pub async fn response_body_string(res: axum::response::Response) -> String {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8_lossy(&bytes).to_string()
}
