pub mod advert_client;
pub mod db_init;

pub mod notification_service;
pub mod mongo_notifications;
pub mod scheduler;
pub mod watch_pipeline;
pub mod watch_component;
pub mod sessions;

pub mod auth_service;
