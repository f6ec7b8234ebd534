use crate::models::db_operations::DbError;
use crate::models::Review;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

const REVIEW_SELECT: &str = "SELECT r.id, r.user_id, u.username, r.post_id, r.rating, r.comment, r.created_at
    FROM reviews r JOIN users u ON u.id = r.user_id";

fn map_review(row: &Row) -> rusqlite::Result<Review> {
    Ok(Review {
        id: row.get(0)?,
        user_id: row.get(1)?,
        author: row.get(2)?,
        post_id: row.get(3)?,
        rating: row.get(4)?,
        comment: row.get(5)?,
        created_at: row.get(6)?,
    })
}

pub fn create_review(
    conn: &Connection,
    user_id: i64,
    post_id: i64,
    rating: i64,
    comment: Option<&str>,
) -> Result<i64, DbError> {
    conn.execute(
        "INSERT INTO reviews (user_id, post_id, rating, comment, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![user_id, post_id, rating, comment, Utc::now().to_rfc3339()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn has_reviewed(conn: &Connection, user_id: i64, post_id: i64) -> Result<bool, DbError> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM reviews WHERE user_id = ?1 AND post_id = ?2)",
        params![user_id, post_id],
        |row| row.get(0),
    )?)
}

pub fn read_reviews_for_post(conn: &Connection, post_id: i64) -> Result<Vec<Review>, DbError> {
    let sql = format!("{} WHERE r.post_id = ?1 ORDER BY r.id DESC", REVIEW_SELECT);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([post_id], map_review)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn read_review(conn: &Connection, review_id: i64) -> Result<Option<Review>, DbError> {
    let sql = format!("{} WHERE r.id = ?1", REVIEW_SELECT);
    Ok(conn.query_row(&sql, [review_id], map_review).optional()?)
}

pub fn delete_review(conn: &Connection, review_id: i64) -> Result<usize, DbError> {
    Ok(conn.execute("DELETE FROM reviews WHERE id = ?1", [review_id])?)
}
