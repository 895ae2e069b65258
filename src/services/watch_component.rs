//! One user's watch screen: the polling pipeline plus the configuration
//! dialog and delete confirmation flows.

use std::sync::Arc;

use mongodb::bson::oid::ObjectId;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::{
    error::{WatchError, WatchResult},
    models::{AlertDraft, AlertRecord, WatchEvent},
    services::{notification_service::NotificationService, watch_pipeline::WatchPipeline},
};

pub const DIALOG_WIDTH: &str = "450px";
pub const DELETE_PROMPT: &str = "Are you sure you want to delete this alert?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogMode {
    Create,
    Edit(ObjectId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogState {
    Idle,
    DialogOpen(DialogMode),
    ConfirmOpen(ObjectId),
}

/// Values the dialog opens with.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DialogData {
    pub id: Option<String>,
    pub name: Option<String>,
    pub subject: Option<String>,
    pub url: Option<String>,
    pub email: Option<String>,
    pub frequency: Option<String>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub advertisement: Option<String>,
}

impl From<&AlertRecord> for DialogData {
    fn from(a: &AlertRecord) -> Self {
        Self {
            id: Some(a.id.to_hex()),
            name: None,
            subject: Some(a.subject.clone()),
            url: Some(a.url.clone()),
            email: Some(a.email.clone()),
            frequency: Some(a.frequency.to_string()),
            min: Some(a.min),
            max: Some(a.max),
            advertisement: Some(a.advertisement.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DialogRequest {
    pub width: &'static str,
    pub mode: DialogMode,
    pub data: DialogData,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DialogClose {
    Saved(AlertDraft),
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DialogOutcome {
    Dismissed,
    /// A new alert was stored and the whole pipeline reloads.
    Reloaded,
    /// An alert was edited and the displayed list re-fetched.
    Refreshed(Vec<AlertRecord>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
    Kept,
    Deleted(Vec<AlertRecord>),
}

pub struct WatchComponent<S: NotificationService> {
    service: Arc<S>,
    pipeline: WatchPipeline<S>,
    state: Mutex<DialogState>,
    display_name: String,
}

impl<S: NotificationService> WatchComponent<S> {
    pub fn new(
        service: Arc<S>,
        user_id: ObjectId,
        display_name: impl Into<String>,
        events_tx: broadcast::Sender<WatchEvent>,
        max_in_flight: usize,
    ) -> Self {
        let pipeline = WatchPipeline::new(Arc::clone(&service), user_id, events_tx, max_in_flight);

        Self {
            service,
            pipeline,
            state: Mutex::new(DialogState::Idle),
            display_name: display_name.into(),
        }
    }

    /// Starts notification processing. Idempotent.
    pub fn start(&self) {
        self.pipeline.start();
    }

    pub fn reload(&self) {
        self.pipeline.reload();
    }

    pub fn pipeline(&self) -> &WatchPipeline<S> {
        &self.pipeline
    }

    pub fn alerts(&self) -> Vec<AlertRecord> {
        self.pipeline.alerts()
    }

    pub fn dialog_state(&self) -> DialogState {
        *self.state.lock()
    }

    pub fn open_dialog(&self) -> DialogRequest {
        *self.state.lock() = DialogState::DialogOpen(DialogMode::Create);

        DialogRequest {
            width: DIALOG_WIDTH,
            mode: DialogMode::Create,
            data: DialogData {
                name: Some(self.display_name.clone()),
                ..DialogData::default()
            },
        }
    }

    pub fn edit_notification(&self, id: ObjectId) -> WatchResult<DialogRequest> {
        let alert = self
            .pipeline
            .find_alert(&id)
            .ok_or_else(|| WatchError::NotFound(id.to_hex()))?;

        *self.state.lock() = DialogState::DialogOpen(DialogMode::Edit(id));

        Ok(DialogRequest {
            width: DIALOG_WIDTH,
            mode: DialogMode::Edit(id),
            data: DialogData::from(&alert),
        })
    }

    pub async fn close_dialog(&self, close: DialogClose) -> WatchResult<DialogOutcome> {
        let mode = {
            let mut state = self.state.lock();
            match *state {
                DialogState::DialogOpen(mode) => {
                    *state = DialogState::Idle;
                    mode
                }
                _ => return Err(WatchError::InvalidState("no dialog is open")),
            }
        };

        let draft = match close {
            DialogClose::Cancelled => return Ok(DialogOutcome::Dismissed),
            DialogClose::Saved(draft) => draft,
        };

        let res = self.apply_dialog(mode, draft).await;
        if res.is_err() {
            // failed saves leave the dialog open
            *self.state.lock() = DialogState::DialogOpen(mode);
        }
        res
    }

    async fn apply_dialog(&self, mode: DialogMode, draft: AlertDraft) -> WatchResult<DialogOutcome> {
        let draft = draft.validate().map_err(|errs| {
            let msgs: Vec<String> = errs.into_iter().map(|(_, m)| m).collect();
            WatchError::Validation(msgs.join(" "))
        })?;

        match mode {
            DialogMode::Create => {
                let created = self.service.create_notification(draft).await?;
                tracing::info!(alert_id = %created.id, "alert created");
                self.pipeline.reload();
                Ok(DialogOutcome::Reloaded)
            }
            DialogMode::Edit(id) => {
                self.service.update_notification(id, draft).await?;
                tracing::info!(alert_id = %id, "alert updated");

                let alerts = self.service.count_notification().await?;
                self.pipeline.replace_alerts(alerts.clone());
                Ok(DialogOutcome::Refreshed(alerts))
            }
        }
    }

    /// Opens the delete confirmation for `id` and returns the prompt text.
    pub fn delete_notification(&self, id: ObjectId) -> WatchResult<&'static str> {
        if self.pipeline.find_alert(&id).is_none() {
            return Err(WatchError::NotFound(id.to_hex()));
        }

        *self.state.lock() = DialogState::ConfirmOpen(id);
        Ok(DELETE_PROMPT)
    }

    pub async fn resolve_delete(&self, confirmation: Confirmation) -> WatchResult<DeleteOutcome> {
        let id = {
            let mut state = self.state.lock();
            match *state {
                DialogState::ConfirmOpen(id) => {
                    *state = DialogState::Idle;
                    id
                }
                _ => return Err(WatchError::InvalidState("no delete confirmation is open")),
            }
        };

        if confirmation == Confirmation::Cancelled {
            return Ok(DeleteOutcome::Kept);
        }

        self.service.delete_notification(id).await?;
        tracing::info!(alert_id = %id, "alert deleted");

        // the record is gone whether or not the list can be re-read
        let refreshed = self.service.count_notification().await;
        match &refreshed {
            Ok(alerts) => self.pipeline.replace_alerts(alerts.clone()),
            Err(e) => {
                tracing::warn!(alert_id = %id, error = %e, "alert list refresh after delete failed");
                self.pipeline.forget_alert(&id);
            }
        }
        self.pipeline.reload();

        Ok(DeleteOutcome::Deleted(refreshed?))
    }

    /// Tears the component down: no timer or fetch survives this call.
    pub fn destroy(&self) {
        *self.state.lock() = DialogState::Idle;
        self.pipeline.shutdown();
    }
}
