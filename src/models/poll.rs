use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use super::AlertRecord;

/// One observation of an alert's advertisement. Never stored as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollResult {
    pub alert_id: ObjectId,
    pub user_id: ObjectId,
    pub advertisement: String,
    pub subject: String,
    pub email: String,

    pub price: f64,
    pub available: bool,
    pub min: f64,
    pub max: f64,

    pub observed_at: i64,
}

impl PollResult {
    pub fn for_alert(alert: &AlertRecord, price: f64, available: bool, observed_at: i64) -> Self {
        Self {
            alert_id: alert.id,
            user_id: alert.user_id,
            advertisement: alert.advertisement.clone(),
            subject: alert.subject.clone(),
            email: alert.email.clone(),
            price,
            available,
            min: alert.min,
            max: alert.max,
            observed_at,
        }
    }

    /// Available and priced inside the alert's bounds.
    pub fn matches(&self) -> bool {
        self.available && self.price.is_finite() && self.price >= self.min && self.price <= self.max
    }
}

/// A poll result after the store acknowledged it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedUpdate {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub alert_id: ObjectId,
    pub user_id: ObjectId,
    pub advertisement: String,
    pub subject: String,
    pub email: String,

    pub price: f64,
    pub available: bool,
    pub matched: bool,

    pub observed_at: i64,
    pub saved_at: i64,
}

impl PersistedUpdate {
    pub fn from_poll(id: ObjectId, poll: PollResult, saved_at: i64) -> Self {
        let matched = poll.matches();
        Self {
            id,
            alert_id: poll.alert_id,
            user_id: poll.user_id,
            advertisement: poll.advertisement,
            subject: poll.subject,
            email: poll.email,
            price: poll.price,
            available: poll.available,
            matched,
            observed_at: poll.observed_at,
            saved_at,
        }
    }

    pub fn message(&self) -> String {
        if self.available {
            format!("{}: advertisement {} is at {:.2}", self.subject, self.advertisement, self.price)
        } else {
            format!("{}: advertisement {} is no longer available", self.subject, self.advertisement)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Acknowledgement {
    pub update_id: ObjectId,
    pub delivered: bool,
    pub message: String,
}
