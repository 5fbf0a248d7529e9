//! User persistence: hydration of the user store. Inserts happen inside the
//! registration transaction (see `commit_registration`).

use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// Usernames are stored lowercase; `password_hash` is an argon2 PHC string.
#[derive(Debug, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
}

/// All users, for hydration.
pub async fn list_users(pool: &PgPool) -> Result<Vec<UserRow>, sqlx::Error> {
    sqlx::query_as::<_, UserRow>("SELECT id, username, password_hash FROM users")
        .fetch_all(pool)
        .await
}
