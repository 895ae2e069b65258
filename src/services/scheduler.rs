//! Per-alert polling timers.
//!
//! Every alert gets its own task that ticks at the alert's interval and issues
//! one advertisement fetch per tick. A tick that fires while the previous fetch
//! is still pending drops that fetch, so at most one fetch per alert is in
//! flight and results for one alert are never reordered.

use std::{collections::HashMap, future::Future, pin::Pin, sync::Arc, time::Duration};

use mongodb::bson::oid::ObjectId;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};

use crate::{
    error::WatchResult,
    models::{AlertRecord, PollResult},
    services::notification_service::NotificationService,
};

type PendingFetch = Pin<Box<dyn Future<Output = WatchResult<PollResult>> + Send>>;

/// Running timers keyed by alert id. Dropping the set aborts every timer.
#[derive(Default)]
pub struct AlertTimers {
    handles: HashMap<ObjectId, JoinHandle<()>>,
}

impl AlertTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts polling `alert`, replacing any timer already running for its id.
    pub fn start<S: NotificationService>(
        &mut self,
        service: Arc<S>,
        alert: AlertRecord,
        out: mpsc::UnboundedSender<PollResult>,
    ) {
        let period = service.calculate_interval(alert.frequency);
        let id = alert.id;

        tracing::debug!(alert_id = %id, period_secs = period.as_secs(), "starting alert timer");

        let handle = tokio::spawn(poll_alert(service, alert, period, out));
        if let Some(previous) = self.handles.insert(id, handle) {
            previous.abort();
        }
    }

    pub fn cancel(&mut self, id: &ObjectId) -> bool {
        match self.handles.remove(id) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, handle) in self.handles.drain() {
            handle.abort();
        }
    }

    /// Ids of timers that are still running.
    pub fn active_ids(&self) -> Vec<ObjectId> {
        self.handles
            .iter()
            .filter(|(_, h)| !h.is_finished())
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

impl Drop for AlertTimers {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

async fn poll_alert<S: NotificationService>(
    service: Arc<S>,
    alert: AlertRecord,
    period: Duration,
    out: mpsc::UnboundedSender<PollResult>,
) {
    // first tick one full period after start
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let alert = Arc::new(alert);
    let mut pending: Option<PendingFetch> = None;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if pending.is_some() {
                    tracing::debug!(alert_id = %alert.id, "tick superseded a pending fetch");
                }

                let service = Arc::clone(&service);
                let alert = Arc::clone(&alert);
                pending = Some(Box::pin(async move { service.query_advertisement(&alert).await }));
            }

            res = async {
                match pending.as_mut() {
                    Some(fetch) => fetch.await,
                    None => std::future::pending().await,
                }
            } => {
                pending = None;

                match res {
                    Ok(result) => {
                        if out.send(result).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(alert_id = %alert.id, error = %e, "advertisement fetch failed");
                    }
                }
            }

            _ = out.closed() => break,
        }
    }

    tracing::debug!(alert_id = %alert.id, "alert timer stopped");
}
