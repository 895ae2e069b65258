use mongodb::bson::oid::ObjectId;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use super::Frequency;

/// A user-configured watch on one advertisement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub user_id: ObjectId,

    pub subject: String,
    pub url: String,
    pub email: String,
    pub frequency: Frequency,

    // price bounds, inclusive
    pub min: f64,
    pub max: f64,

    // id of the watched advertisement at the source
    pub advertisement: String,

    pub created_at: i64,
}

impl AlertRecord {
    pub fn from_draft(id: ObjectId, user_id: ObjectId, draft: AlertDraft, created_at: i64) -> Self {
        Self {
            id,
            user_id,
            subject: draft.subject,
            url: draft.url,
            email: draft.email,
            frequency: draft.frequency,
            min: draft.min,
            max: draft.max,
            advertisement: draft.advertisement,
            created_at,
        }
    }

    pub fn to_draft(&self) -> AlertDraft {
        AlertDraft {
            subject: self.subject.clone(),
            url: self.url.clone(),
            email: self.email.clone(),
            frequency: self.frequency,
            min: self.min,
            max: self.max,
            advertisement: self.advertisement.clone(),
        }
    }
}

/// The editable part of an alert, as returned by the configuration dialog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertDraft {
    pub subject: String,
    pub url: String,
    pub email: String,
    pub frequency: Frequency,
    pub min: f64,
    pub max: f64,
    pub advertisement: String,
}

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex"))
}

fn url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^https?://[^\s/$.?#].[^\s]*$").expect("url regex"))
}

pub fn is_valid_email(email: &str) -> bool {
    email_re().is_match(email)
}

/// Advertisement ids end up as one URL path segment at the source.
fn is_valid_advertisement(id: &str) -> bool {
    id != "."
        && id != ".."
        && !id
            .chars()
            .any(|c| c.is_control() || c.is_whitespace() || matches!(c, '/' | '\\' | '?' | '#' | '%'))
}

impl AlertDraft {
    /// Trims text fields and checks them. Errors are keyed by form field name.
    pub fn validate(mut self) -> Result<Self, Vec<(&'static str, String)>> {
        self.subject = self.subject.trim().to_string();
        self.url = self.url.trim().to_string();
        self.email = self.email.trim().to_string();
        self.advertisement = self.advertisement.trim().to_string();

        let mut errs = Vec::new();

        if self.subject.is_empty() {
            errs.push(("subject", "Subject is required.".to_string()));
        } else if self.subject.chars().any(char::is_control) {
            errs.push(("subject", "Subject must be a single line of text.".to_string()));
        }
        if self.advertisement.is_empty() {
            errs.push(("advertisement", "Advertisement is required.".to_string()));
        } else if !is_valid_advertisement(&self.advertisement) {
            errs.push((
                "advertisement",
                "Advertisement id may not contain spaces, '/', '?', '#' or '%'.".to_string(),
            ));
        }
        if !is_valid_email(&self.email) {
            errs.push(("email", "Invalid email.".to_string()));
        }
        if !url_re().is_match(&self.url) {
            errs.push(("url", "Enter a valid http(s) URL.".to_string()));
        }

        let bounds_ok = self.min.is_finite() && self.max.is_finite() && self.min >= 0.0 && self.max >= 0.0;
        if !bounds_ok {
            errs.push(("min", "Bounds must be non-negative numbers.".to_string()));
        } else if self.min > self.max {
            errs.push(("max", "Max must not be lower than min.".to_string()));
        }

        if errs.is_empty() { Ok(self) } else { Err(errs) }
    }
}
