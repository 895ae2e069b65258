use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub email: String,

    #[serde(default)]
    pub username: Option<String>,

    pub password_hash: String,
}

/// The logged-in user as seen by handlers (no secrets).
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: ObjectId,
    pub email: String,
    pub username: String,
}

impl From<User> for CurrentUser {
    fn from(u: User) -> Self {
        let username = u
            .username
            .unwrap_or_else(|| u.email.split('@').next().unwrap_or_default().to_string());

        Self {
            id: u.id,
            email: u.email,
            username,
        }
    }
}
