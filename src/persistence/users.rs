//! User rows.

use sqlx::Row;

use super::Conn;
use crate::error::{CoreError, CoreResult};
use crate::models::{Role, User};

fn user_from_row(row: &sqlx::postgres::PgRow) -> CoreResult<User> {
    let role: i16 = row.get("role");
    Ok(User {
        id: row.get("id"),
        email: row.get("email"),
        name: row.get("name"),
        role: Role::try_from(role)
            .map_err(|v| CoreError::InvalidState(format!("unknown role {}", v)))?,
        parent_id: row.get("parent_id"),
        created_at: row.get("created_at"),
    })
}

const USER_COLUMNS: &str = "id, email, name, role, parent_id, created_at";

pub async fn insert(
    conn: &mut Conn,
    email: &str,
    name: &str,
    role: Role,
    parent_id: Option<i64>,
) -> CoreResult<User> {
    let row = sqlx::query(&format!(
        r#"
        INSERT INTO users (email, name, role, parent_id)
        VALUES ($1, $2, $3, $4)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(email)
    .bind(name)
    .bind(i16::from(role))
    .bind(parent_id)
    .fetch_one(conn)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
            CoreError::Conflict(format!("email {} already registered", email))
        }
        _ => e.into(),
    })?;
    user_from_row(&row)
}

pub async fn get(conn: &mut Conn, user_id: i64) -> CoreResult<User> {
    let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(user_id)
        .fetch_optional(conn)
        .await?
        .ok_or(CoreError::NotFound("user"))?;
    user_from_row(&row)
}

