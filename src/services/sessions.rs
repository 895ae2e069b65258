use std::{collections::HashMap, sync::Arc};

use mongodb::bson::oid::ObjectId;
use parking_lot::Mutex;

use crate::{
    models::CurrentUser,
    services::{
        mongo_notifications::MongoNotificationService, notification_service::NotificationService,
        watch_component::WatchComponent,
    },
    AppState,
};

pub type UserWatch = WatchComponent<MongoNotificationService>;

/// Live watch components, one per logged-in user.
pub struct WatchSessions<S: NotificationService> {
    inner: Arc<Mutex<HashMap<ObjectId, Arc<WatchComponent<S>>>>>,
}

impl<S: NotificationService> Clone for WatchSessions<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: NotificationService> Default for WatchSessions<S> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<S: NotificationService> WatchSessions<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, user_id: &ObjectId) -> Option<Arc<WatchComponent<S>>> {
        self.inner.lock().get(user_id).cloned()
    }

    /// Returns the user's component, building it with `make` on first use.
    /// The component is not started here.
    pub fn get_or_create(
        &self,
        user_id: ObjectId,
        make: impl FnOnce() -> WatchComponent<S>,
    ) -> Arc<WatchComponent<S>> {
        let mut map = self.inner.lock();
        Arc::clone(map.entry(user_id).or_insert_with(|| Arc::new(make())))
    }

    /// Destroys and forgets the user's component.
    pub fn stop(&self, user_id: &ObjectId) -> bool {
        let removed = self.inner.lock().remove(user_id);
        match removed {
            Some(component) => {
                component.destroy();
                true
            }
            None => false,
        }
    }

    pub fn stop_all(&self) {
        let all: Vec<_> = self.inner.lock().drain().map(|(_, c)| c).collect();
        for component in all {
            component.destroy();
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

/// The current user's watch component, created on first use.
pub fn watch_for(state: &AppState, user: &CurrentUser) -> Arc<UserWatch> {
    state.sessions.get_or_create(user.id, || {
        let service = MongoNotificationService::new(
            state.db.clone(),
            user.id,
            state.adverts.clone(),
            state.events_tx.clone(),
            state.settings.notify_webhook_url.clone(),
        );

        WatchComponent::new(
            Arc::new(service),
            user.id,
            user.username.clone(),
            state.events_tx.clone(),
            state.settings.max_deliveries,
        )
    })
}
