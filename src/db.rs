use mongodb::{
    bson::doc,
    options::IndexOptions,
    Client, Database, IndexModel,
};

use crate::auth::hash_password;
use crate::config::Config;
use crate::error::ApiError;
use crate::model::user::{Role, User};
use crate::state::AppState;

pub async fn connect(config: &Config) -> mongodb::error::Result<Database> {
    let client = Client::with_uri_str(&config.mongodb_uri).await?;
    let db = client.database(&config.mongodb_db);
    // Fail fast at startup instead of on the first request.
    db.run_command(doc! { "ping": 1 }, None).await?;
    tracing::info!("connected to MongoDB database {}", config.mongodb_db);
    Ok(db)
}

pub async fn ensure_indexes(state: &AppState) -> mongodb::error::Result<()> {
    let email_index = IndexModel::builder()
        .keys(doc! { "email": 1 })
        .options(IndexOptions::builder().unique(true).build())
        .build();
    state.users().create_index(email_index, None).await?;
    Ok(())
}

// Seeds an admin account from the environment if none exists yet, so the
// admin-only routes are reachable on a fresh database.
pub async fn seed_admin(state: &AppState) -> Result<(), ApiError> {
    let existing = state
        .users()
        .find_one(doc! { "role": "admin" }, None)
        .await?;
    if existing.is_some() {
        return Ok(());
    }

    let config = &state.config;
    if config.admin_password == "admin" {
        tracing::warn!(
            "ADMIN_PASSWORD not set. Using default password 'admin'. Set ADMIN_PASSWORD in production."
        );
    }

    let admin = User {
        id: None,
        name: config.admin_name.clone(),
        email: config.admin_email.to_lowercase(),
        password_hash: hash_password(&config.admin_password)?,
        role: Role::Admin,
        created_at: chrono::Utc::now(),
    };
    state.users().insert_one(&admin, None).await?;
    tracing::info!("seeded admin user {}", admin.email);
    Ok(())
}
