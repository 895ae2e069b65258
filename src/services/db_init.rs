use mongodb::{
    bson::doc,
    options::IndexOptions,
    Database, IndexModel,
};

pub const USERS: &str = "users";
pub const ALERTS: &str = "watch_alerts";
pub const UPDATES: &str = "watch_updates";

pub async fn ensure_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    // users: unique email
    {
        let col = db.collection::<mongodb::bson::Document>(USERS);
        let model = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        col.create_index(model, None).await?;
    }

    // alerts: listed per user, oldest first
    {
        let col = db.collection::<mongodb::bson::Document>(ALERTS);
        let model = IndexModel::builder()
            .keys(doc! { "user_id": 1, "created_at": 1 })
            .build();

        col.create_index(model, None).await?;
    }

    // updates: history per alert, newest first
    {
        let col = db.collection::<mongodb::bson::Document>(UPDATES);
        let model = IndexModel::builder()
            .keys(doc! { "alert_id": 1, "saved_at": -1 })
            .build();

        let _ = col.create_index(model, None).await;
    }

    Ok(())
}
