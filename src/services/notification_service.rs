//! The operations the watch component needs from the outside world.
//!
//! One service instance is scoped to one user: `count_notification` returns
//! that user's alerts only.

use std::{future::Future, time::Duration};

use mongodb::bson::oid::ObjectId;

use crate::{
    error::WatchResult,
    models::{calculate_interval, Acknowledgement, AlertDraft, AlertRecord, Frequency, PersistedUpdate, PollResult},
};

pub trait NotificationService: Send + Sync + 'static {
    /// Fetches the full alert set.
    fn count_notification(&self) -> impl Future<Output = WatchResult<Vec<AlertRecord>>> + Send;

    fn calculate_interval(&self, frequency: Frequency) -> Duration {
        calculate_interval(frequency)
    }

    /// One fetch of the current state of the alert's advertisement.
    fn query_advertisement(&self, alert: &AlertRecord) -> impl Future<Output = WatchResult<PollResult>> + Send;

    fn save_notification(&self, result: PollResult) -> impl Future<Output = WatchResult<PersistedUpdate>> + Send;

    fn send_notification(&self, update: &PersistedUpdate) -> impl Future<Output = WatchResult<Acknowledgement>> + Send;

    /// Deletes one alert and returns the remaining set.
    fn delete_notification(&self, id: ObjectId) -> impl Future<Output = WatchResult<Vec<AlertRecord>>> + Send;

    fn create_notification(&self, draft: AlertDraft) -> impl Future<Output = WatchResult<AlertRecord>> + Send;

    fn update_notification(&self, id: ObjectId, draft: AlertDraft) -> impl Future<Output = WatchResult<AlertRecord>> + Send;
}
