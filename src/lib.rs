//! Library entrypoint for AdWatch.
//!
//! Integration tests under `tests/` import the app state, controllers and the
//! watch services from here.

pub mod config;
pub mod error;
pub mod models;

#[path = "middleware/auth.rs"]
pub mod auth;

pub mod services;

#[path = "views/render.rs"]
pub mod render;
#[path = "views/templates.rs"]
pub mod templates;

pub mod controllers;
pub mod routes;

use tokio::sync::broadcast;

use crate::{
    models::WatchEvent,
    services::{advert_client::AdvertClient, mongo_notifications::MongoNotificationService, sessions::WatchSessions},
};

#[derive(Clone)]
pub struct AppState {
    pub hbs: templates::Hbs,
    pub db: mongodb::Database,
    pub settings: config::Settings,
    pub adverts: AdvertClient,
    pub events_tx: broadcast::Sender<WatchEvent>,
    pub sessions: WatchSessions<MongoNotificationService>,
}

impl AppState {
    pub fn new(db: mongodb::Database, settings: config::Settings) -> Self {
        let adverts = AdvertClient::new(settings.advert_api_url.clone(), settings.advert_api_key.clone());
        let (events_tx, _) = broadcast::channel::<WatchEvent>(256);

        Self {
            hbs: templates::build_handlebars(),
            db,
            settings,
            adverts,
            events_tx,
            sessions: WatchSessions::new(),
        }
    }
}
