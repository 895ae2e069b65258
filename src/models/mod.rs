pub mod user;
pub mod frequency;
pub mod alert;
pub mod poll;
pub mod event;

pub use user::{CurrentUser, User};
pub use frequency::{calculate_interval, Frequency};
pub use alert::{is_valid_email, AlertDraft, AlertRecord};
pub use poll::{Acknowledgement, PersistedUpdate, PollResult};
pub use event::WatchEvent;
