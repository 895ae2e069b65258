pub mod home_controller;
pub mod auth_controller;
pub mod watch_controller;
pub mod realtime_controller;
