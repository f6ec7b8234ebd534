use crate::models::db_operations::DbError;
use crate::models::User;
use bcrypt::{hash, verify};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

const USER_COLUMNS: &str = "id, username, is_admin, created_at, last_login_time";

fn map_user(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        is_admin: row.get(2)?,
        created_at: row.get(3)?,
        last_login_time: row.get(4)?,
    })
}

pub fn create_user(
    conn: &Connection,
    username: &str,
    password: &str,
    is_admin: bool,
    hash_cost: u32,
) -> Result<i64, DbError> {
    let hashed_password = hash(password, hash_cost)?;
    conn.execute(
        "INSERT INTO users (username, password_hash, is_admin, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![username, hashed_password, is_admin, Utc::now().to_rfc3339()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn read_user_by_id(conn: &Connection, user_id: i64) -> Result<Option<User>, DbError> {
    let sql = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);
    Ok(conn.query_row(&sql, [user_id], map_user).optional()?)
}

pub fn read_user_by_username(conn: &Connection, username: &str) -> Result<Option<User>, DbError> {
    let sql = format!("SELECT {} FROM users WHERE username = ?1", USER_COLUMNS);
    Ok(conn.query_row(&sql, [username], map_user).optional()?)
}

pub fn read_admin_usernames(conn: &Connection) -> Result<Vec<String>, DbError> {
    let mut stmt = conn.prepare("SELECT username FROM users WHERE is_admin = 1 ORDER BY username")?;
    let rows = stmt.query_map([], |row| row.get(0))?;
    Ok(rows.collect::<rusqlite::Result<Vec<String>>>()?)
}

/// Returns the user when the password matches its stored bcrypt hash.
pub fn verify_credentials(
    conn: &Connection,
    username: &str,
    password: &str,
) -> Result<Option<User>, DbError> {
    let stored: Option<String> = conn
        .query_row(
            "SELECT password_hash FROM users WHERE username = ?1",
            [username],
            |row| row.get(0),
        )
        .optional()?;

    match stored {
        Some(password_hash) if verify(password, &password_hash).unwrap_or(false) => {
            read_user_by_username(conn, username)
        }
        _ => Ok(None),
    }
}

pub fn update_last_login_time(conn: &Connection, user_id: i64) -> Result<(), DbError> {
    let now = Utc::now().to_rfc3339();
    conn.execute("UPDATE users SET last_login_time = ?1 WHERE id = ?2", params![now, user_id])?;
    Ok(())
}

pub fn update_password(
    conn: &Connection,
    username: &str,
    new_password: &str,
    hash_cost: u32,
) -> Result<usize, DbError> {
    let hashed_password = hash(new_password, hash_cost)?;
    Ok(conn.execute(
        "UPDATE users SET password_hash = ?1 WHERE username = ?2",
        params![hashed_password, username],
    )?)
}

pub fn set_admin_flag(conn: &Connection, username: &str, is_admin: bool) -> Result<usize, DbError> {
    Ok(conn.execute(
        "UPDATE users SET is_admin = ?1 WHERE username = ?2",
        params![is_admin, username],
    )?)
}
