use crate::domain::moderation::ModerationState;
use crate::models::db_operations::DbError;
use crate::models::{Post, PostRecord};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

const POST_RECORD_SELECT: &str = "SELECT p.id, p.user_id, p.title, p.body, p.image, p.tags, p.validated,
        p.created_at, p.updated_at, u.username,
        (SELECT COUNT(*) FROM reviews r WHERE r.post_id = p.id),
        (SELECT AVG(r.rating) FROM reviews r WHERE r.post_id = p.id)
    FROM posts p
    JOIN users u ON u.id = p.user_id";

fn map_post(row: &Row) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        body: row.get(3)?,
        image: row.get(4)?,
        tags: row.get(5)?,
        state: ModerationState::from_flag(row.get(6)?),
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn map_post_record(row: &Row) -> rusqlite::Result<PostRecord> {
    Ok(PostRecord {
        post: map_post(row)?,
        author: row.get(9)?,
        review_count: row.get(10)?,
        average_rating: row.get(11)?,
    })
}

/// New posts always enter the moderation queue.
pub fn create_post(
    conn: &Connection,
    user_id: i64,
    title: &str,
    body: &str,
    image: Option<&str>,
    tags_mask: i64,
) -> Result<i64, DbError> {
    conn.execute(
        "INSERT INTO posts (user_id, title, body, image, tags, validated, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            user_id,
            title,
            body,
            image,
            tags_mask,
            ModerationState::Pending.as_flag(),
            Utc::now().to_rfc3339()
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn read_post(conn: &Connection, post_id: i64) -> Result<Option<Post>, DbError> {
    Ok(conn
        .query_row(
            "SELECT id, user_id, title, body, image, tags, validated, created_at, updated_at FROM posts WHERE id = ?1",
            [post_id],
            map_post,
        )
        .optional()?)
}

pub fn read_post_record(conn: &Connection, post_id: i64) -> Result<Option<PostRecord>, DbError> {
    let sql = format!("{} WHERE p.id = ?1", POST_RECORD_SELECT);
    Ok(conn.query_row(&sql, [post_id], map_post_record).optional()?)
}

/// Public listing. A post matches when it carries every bit of `required_mask`.
pub fn read_validated_posts(
    conn: &Connection,
    required_mask: i64,
    limit: u32,
    offset: u32,
) -> Result<Vec<PostRecord>, DbError> {
    let sql = format!(
        "{} WHERE p.validated = ?1 AND (p.tags & ?2) = ?2 ORDER BY p.id DESC LIMIT ?3 OFFSET ?4",
        POST_RECORD_SELECT
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        params![ModerationState::Validated.as_flag(), required_mask, limit, offset],
        map_post_record,
    )?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Moderation queue, oldest first so the backlog is worked in order.
pub fn read_pending_posts(conn: &Connection, limit: u32, offset: u32) -> Result<Vec<PostRecord>, DbError> {
    let sql = format!(
        "{} WHERE p.validated = ?1 ORDER BY p.id ASC LIMIT ?2 OFFSET ?3",
        POST_RECORD_SELECT
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        params![ModerationState::Pending.as_flag(), limit, offset],
        map_post_record,
    )?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn read_posts_by_user(
    conn: &Connection,
    user_id: i64,
    limit: u32,
    offset: u32,
) -> Result<Vec<PostRecord>, DbError> {
    let sql = format!(
        "{} WHERE p.user_id = ?1 ORDER BY p.id DESC LIMIT ?2 OFFSET ?3",
        POST_RECORD_SELECT
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![user_id, limit, offset], map_post_record)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn update_post_content(
    conn: &Connection,
    post_id: i64,
    title: &str,
    body: &str,
    image: Option<&str>,
    tags_mask: i64,
    state: ModerationState,
) -> Result<usize, DbError> {
    Ok(conn.execute(
        "UPDATE posts SET title = ?1, body = ?2, image = ?3, tags = ?4, validated = ?5, updated_at = ?6 WHERE id = ?7",
        params![title, body, image, tags_mask, state.as_flag(), Utc::now().to_rfc3339(), post_id],
    )?)
}

pub fn set_moderation_state(conn: &Connection, post_id: i64, state: ModerationState) -> Result<usize, DbError> {
    Ok(conn.execute(
        "UPDATE posts SET validated = ?1 WHERE id = ?2",
        params![state.as_flag(), post_id],
    )?)
}

/// Removes the post and every review attached to it in one transaction.
pub fn delete_post_with_reviews(conn: &mut Connection, post_id: i64) -> Result<usize, DbError> {
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM reviews WHERE post_id = ?1", [post_id])?;
    let deleted = tx.execute("DELETE FROM posts WHERE id = ?1", [post_id])?;
    tx.commit()?;
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::db_operations::{reviews_db_operations, users_db_operations};
    use crate::setup::db_setup;

    fn conn_with_user() -> (Connection, i64) {
        let mut conn = Connection::open_in_memory().unwrap();
        db_setup::setup_database(&mut conn).unwrap();
        let user_id = users_db_operations::create_user(&conn, "alice", "password1", false, 4).unwrap();
        (conn, user_id)
    }

    #[test]
    fn tag_filter_requires_every_bit() {
        let (conn, user_id) = conn_with_user();
        let both = create_post(&conn, user_id, "Both", "b", None, 0b101).unwrap();
        let first = create_post(&conn, user_id, "First", "b", None, 0b001).unwrap();
        create_post(&conn, user_id, "Hidden", "b", None, 0b101).unwrap();
        set_moderation_state(&conn, both, ModerationState::Validated).unwrap();
        set_moderation_state(&conn, first, ModerationState::Validated).unwrap();

        let ids = |mask| -> Vec<i64> {
            read_validated_posts(&conn, mask, 20, 0).unwrap().into_iter().map(|r| r.post.id).collect()
        };
        assert_eq!(ids(0), vec![first, both]);
        assert_eq!(ids(0b001), vec![first, both]);
        assert_eq!(ids(0b101), vec![both]);
        assert!(ids(0b010).is_empty());
    }

    #[test]
    fn pending_queue_excludes_validated() {
        let (conn, user_id) = conn_with_user();
        let a = create_post(&conn, user_id, "A", "b", None, 0).unwrap();
        let b = create_post(&conn, user_id, "B", "b", None, 0).unwrap();
        set_moderation_state(&conn, a, ModerationState::Validated).unwrap();

        let queue: Vec<i64> = read_pending_posts(&conn, 20, 0).unwrap().into_iter().map(|r| r.post.id).collect();
        assert_eq!(queue, vec![b]);
    }

    #[test]
    fn delete_removes_reviews() {
        let (mut conn, owner) = conn_with_user();
        let reviewer = users_db_operations::create_user(&conn, "bob", "password1", false, 4).unwrap();
        let post_id = create_post(&conn, owner, "A", "b", None, 0).unwrap();
        set_moderation_state(&conn, post_id, ModerationState::Validated).unwrap();
        reviews_db_operations::create_review(&conn, reviewer, post_id, 4, Some("solid")).unwrap();

        assert_eq!(delete_post_with_reviews(&mut conn, post_id).unwrap(), 1);
        let orphans: i64 = conn
            .query_row("SELECT COUNT(*) FROM reviews WHERE post_id = ?1", [post_id], |row| row.get(0))
            .unwrap();
        assert_eq!(orphans, 0);
        assert!(read_post(&conn, post_id).unwrap().is_none());
    }

    #[test]
    fn record_carries_author_and_rating() {
        let (conn, owner) = conn_with_user();
        let reviewer = users_db_operations::create_user(&conn, "bob", "password1", false, 4).unwrap();
        let post_id = create_post(&conn, owner, "A", "b", Some("/media/posts/x.png"), 0).unwrap();
        reviews_db_operations::create_review(&conn, reviewer, post_id, 3, None).unwrap();

        let record = read_post_record(&conn, post_id).unwrap().unwrap();
        assert_eq!(record.author, "alice");
        assert_eq!(record.review_count, 1);
        assert_eq!(record.average_rating, Some(3.0));
        assert_eq!(record.post.image.as_deref(), Some("/media/posts/x.png"));
        assert_eq!(record.post.state, ModerationState::Pending);
    }
}
