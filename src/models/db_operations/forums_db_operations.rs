use crate::models::db_operations::DbError;
use crate::models::{Comment, Forum};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

const FORUM_SELECT: &str = "SELECT f.id, f.user_id, u.username, f.title, f.body, f.created_at,
        (SELECT COUNT(*) FROM comments c WHERE c.forum_id = f.id)
    FROM forums f JOIN users u ON u.id = f.user_id";

const COMMENT_SELECT: &str = "SELECT c.id, c.user_id, u.username, c.forum_id, c.body, c.created_at
    FROM comments c JOIN users u ON u.id = c.user_id";

fn map_forum(row: &Row) -> rusqlite::Result<Forum> {
    Ok(Forum {
        id: row.get(0)?,
        user_id: row.get(1)?,
        author: row.get(2)?,
        title: row.get(3)?,
        body: row.get(4)?,
        created_at: row.get(5)?,
        comment_count: row.get(6)?,
    })
}

fn map_comment(row: &Row) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        user_id: row.get(1)?,
        author: row.get(2)?,
        forum_id: row.get(3)?,
        body: row.get(4)?,
        created_at: row.get(5)?,
    })
}

pub fn create_forum(conn: &Connection, user_id: i64, title: &str, body: &str) -> Result<i64, DbError> {
    conn.execute(
        "INSERT INTO forums (user_id, title, body, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![user_id, title, body, Utc::now().to_rfc3339()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn read_forums(conn: &Connection, limit: u32, offset: u32) -> Result<Vec<Forum>, DbError> {
    let sql = format!("{} ORDER BY f.id DESC LIMIT ?1 OFFSET ?2", FORUM_SELECT);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![limit, offset], map_forum)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn read_forum(conn: &Connection, forum_id: i64) -> Result<Option<Forum>, DbError> {
    let sql = format!("{} WHERE f.id = ?1", FORUM_SELECT);
    Ok(conn.query_row(&sql, [forum_id], map_forum).optional()?)
}

pub fn delete_forum_with_comments(conn: &mut Connection, forum_id: i64) -> Result<usize, DbError> {
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM comments WHERE forum_id = ?1", [forum_id])?;
    let deleted = tx.execute("DELETE FROM forums WHERE id = ?1", [forum_id])?;
    tx.commit()?;
    Ok(deleted)
}

pub fn create_comment(conn: &Connection, user_id: i64, forum_id: i64, body: &str) -> Result<i64, DbError> {
    conn.execute(
        "INSERT INTO comments (user_id, forum_id, body, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![user_id, forum_id, body, Utc::now().to_rfc3339()],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Comments read top to bottom, oldest first.
pub fn read_comments(conn: &Connection, forum_id: i64) -> Result<Vec<Comment>, DbError> {
    let sql = format!("{} WHERE c.forum_id = ?1 ORDER BY c.id ASC", COMMENT_SELECT);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([forum_id], map_comment)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn read_comment(conn: &Connection, comment_id: i64) -> Result<Option<Comment>, DbError> {
    let sql = format!("{} WHERE c.id = ?1", COMMENT_SELECT);
    Ok(conn.query_row(&sql, [comment_id], map_comment).optional()?)
}

pub fn delete_comment(conn: &Connection, comment_id: i64) -> Result<usize, DbError> {
    Ok(conn.execute("DELETE FROM comments WHERE id = ?1", [comment_id])?)
}
