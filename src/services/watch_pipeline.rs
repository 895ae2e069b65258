//! Reload-driven polling pipeline for one user's alerts.
//!
//! A reload fetches the alert set (superseding any fetch still pending and
//! cancelling every timer of the previous set), publishes it as the displayed
//! list and starts one timer per alert. All timers feed a single channel whose
//! results are saved and then sent, one task per result.

use std::sync::Arc;

use mongodb::bson::oid::ObjectId;
use parking_lot::{Mutex, RwLock};
use tokio::{
    sync::{broadcast, mpsc, watch, Semaphore},
    task::{JoinHandle, JoinSet},
};

use crate::{
    error::WatchResult,
    models::{Acknowledgement, AlertRecord, PollResult, WatchEvent},
    services::{notification_service::NotificationService, scheduler::AlertTimers},
};

pub struct WatchPipeline<S: NotificationService> {
    service: Arc<S>,
    user_id: ObjectId,
    alerts: Arc<RwLock<Vec<AlertRecord>>>,
    timers: Arc<Mutex<AlertTimers>>,
    reload_tx: watch::Sender<u64>,
    events_tx: broadcast::Sender<WatchEvent>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    max_in_flight: usize,
}

impl<S: NotificationService> WatchPipeline<S> {
    /// `max_in_flight` caps concurrent save+send chains; 0 means unbounded.
    pub fn new(
        service: Arc<S>,
        user_id: ObjectId,
        events_tx: broadcast::Sender<WatchEvent>,
        max_in_flight: usize,
    ) -> Self {
        let (reload_tx, _) = watch::channel(0);

        Self {
            service,
            user_id,
            alerts: Arc::new(RwLock::new(Vec::new())),
            timers: Arc::new(Mutex::new(AlertTimers::new())),
            reload_tx,
            events_tx,
            tasks: Mutex::new(Vec::new()),
            max_in_flight,
        }
    }

    /// Spawns the supervisor and delivery tasks and fires the initial reload.
    /// Calling it again while running does nothing.
    pub fn start(&self) {
        let mut tasks = self.tasks.lock();
        if !tasks.is_empty() {
            return;
        }

        let (poll_tx, poll_rx) = mpsc::unbounded_channel::<PollResult>();
        let limit = (self.max_in_flight > 0).then(|| Arc::new(Semaphore::new(self.max_in_flight)));

        tasks.push(tokio::spawn(supervise(
            Arc::clone(&self.service),
            self.user_id,
            Arc::clone(&self.alerts),
            Arc::clone(&self.timers),
            self.reload_tx.subscribe(),
            poll_tx,
            self.events_tx.clone(),
        )));
        tasks.push(tokio::spawn(deliver(Arc::clone(&self.service), poll_rx, limit)));
        drop(tasks);

        tracing::info!(user_id = %self.user_id, "watch pipeline started");
        self.reload();
    }

    pub fn is_running(&self) -> bool {
        self.tasks.lock().iter().any(|t| !t.is_finished())
    }

    /// Invalidates the current alert set; the supervisor re-fetches it.
    pub fn reload(&self) {
        self.reload_tx.send_modify(|generation| *generation += 1);
    }

    pub fn reload_generation(&self) -> u64 {
        *self.reload_tx.borrow()
    }

    /// Snapshot of the displayed alert list.
    pub fn alerts(&self) -> Vec<AlertRecord> {
        self.alerts.read().clone()
    }

    pub fn find_alert(&self, id: &ObjectId) -> Option<AlertRecord> {
        self.alerts.read().iter().find(|a| a.id == *id).cloned()
    }

    /// Replaces the displayed list without touching the timers.
    pub fn replace_alerts(&self, alerts: Vec<AlertRecord>) {
        publish_alerts(&self.alerts, &self.events_tx, self.user_id, alerts);
    }

    /// Drops one alert from the displayed list and stops its timer.
    pub fn forget_alert(&self, id: &ObjectId) {
        let remaining: Vec<AlertRecord> = self
            .alerts
            .read()
            .iter()
            .filter(|a| a.id != *id)
            .cloned()
            .collect();
        self.timers.lock().cancel(id);
        publish_alerts(&self.alerts, &self.events_tx, self.user_id, remaining);
    }

    pub fn active_timers(&self) -> Vec<ObjectId> {
        self.timers.lock().active_ids()
    }

    /// Stops the supervisor, the delivery chain, every timer and every
    /// in-flight fetch. The pipeline can be started again afterwards.
    pub fn shutdown(&self) {
        let tasks: Vec<JoinHandle<()>> = self.tasks.lock().drain(..).collect();
        if tasks.is_empty() {
            return;
        }

        for task in tasks {
            task.abort();
        }
        self.timers.lock().cancel_all();

        tracing::info!(user_id = %self.user_id, "watch pipeline stopped");
    }
}

impl<S: NotificationService> Drop for WatchPipeline<S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn publish_alerts(
    displayed: &RwLock<Vec<AlertRecord>>,
    events_tx: &broadcast::Sender<WatchEvent>,
    user_id: ObjectId,
    alerts: Vec<AlertRecord>,
) {
    let count = alerts.len();
    *displayed.write() = alerts;
    let _ = events_tx.send(WatchEvent::AlertsUpdated { user_id, count });
}

async fn supervise<S: NotificationService>(
    service: Arc<S>,
    user_id: ObjectId,
    displayed: Arc<RwLock<Vec<AlertRecord>>>,
    timers: Arc<Mutex<AlertTimers>>,
    mut reload_rx: watch::Receiver<u64>,
    poll_tx: mpsc::UnboundedSender<PollResult>,
    events_tx: broadcast::Sender<WatchEvent>,
) {
    while reload_rx.changed().await.is_ok() {
        let fetched = loop {
            let generation = *reload_rx.borrow_and_update();
            timers.lock().cancel_all();

            tokio::select! {
                res = service.count_notification() => break res,
                changed = reload_rx.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    tracing::debug!(user_id = %user_id, generation, "reload superseded pending alert fetch");
                }
            }
        };

        match fetched {
            Ok(alerts) => {
                publish_alerts(&displayed, &events_tx, user_id, alerts.clone());

                let count = alerts.len();
                {
                    let mut running = timers.lock();
                    for alert in alerts {
                        running.start(Arc::clone(&service), alert, poll_tx.clone());
                    }
                }

                tracing::info!(user_id = %user_id, alerts = count, "alert timers scheduled");
            }
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "alert list fetch failed");
                let _ = events_tx.send(WatchEvent::Error {
                    user_id,
                    message: e.to_string(),
                });
            }
        }
    }
}

async fn deliver<S: NotificationService>(
    service: Arc<S>,
    mut poll_rx: mpsc::UnboundedReceiver<PollResult>,
    limit: Option<Arc<Semaphore>>,
) {
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            Some(result) = poll_rx.recv() => {
                // no chain is spawned without a permit
                let permit = match &limit {
                    Some(sem) => match Arc::clone(sem).acquire_owned().await {
                        Ok(permit) => Some(permit),
                        Err(_) => break,
                    },
                    None => None,
                };
                let service = Arc::clone(&service);

                in_flight.spawn(async move {
                    let _permit = permit;

                    let alert_id = result.alert_id;
                    match persist_and_notify(service.as_ref(), result).await {
                        Ok(ack) => tracing::info!(
                            alert_id = %alert_id,
                            update_id = %ack.update_id,
                            delivered = ack.delivered,
                            "{}",
                            ack.message
                        ),
                        Err(e) => tracing::warn!(alert_id = %alert_id, error = %e, "watch update not delivered"),
                    }
                });
            }

            Some(joined) = in_flight.join_next() => {
                if let Err(e) = joined {
                    if e.is_panic() {
                        tracing::error!(error = %e, "delivery task panicked");
                    }
                }
            }

            else => break,
        }
    }
}

/// Saves one poll result, then sends a notification for the saved record.
pub async fn persist_and_notify<S: NotificationService>(service: &S, result: PollResult) -> WatchResult<Acknowledgement> {
    let saved = service.save_notification(result).await?;
    service.send_notification(&saved).await
}
