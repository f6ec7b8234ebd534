use crate::domain::tag_codec;
use crate::models::db_operations::DbError;
use crate::models::{RecommendedTag, Tag};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::collections::HashSet;

fn map_tag(row: &Row) -> rusqlite::Result<Tag> {
    Ok(Tag { id: row.get(0)?, name: row.get(1)? })
}

fn map_recommendation(row: &Row) -> rusqlite::Result<RecommendedTag> {
    Ok(RecommendedTag {
        id: row.get(0)?,
        user_id: row.get(1)?,
        suggested_by: row.get(2)?,
        name: row.get(3)?,
        created_at: row.get(4)?,
    })
}

pub fn read_all_tags(conn: &Connection) -> Result<Vec<Tag>, DbError> {
    let mut stmt = conn.prepare("SELECT id, name FROM tags ORDER BY id")?;
    let rows = stmt.query_map([], map_tag)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn read_tag(conn: &Connection, tag_id: i64) -> Result<Option<Tag>, DbError> {
    Ok(conn
        .query_row("SELECT id, name FROM tags WHERE id = ?1", [tag_id], map_tag)
        .optional()?)
}

/// Case-insensitive lookup; the column is declared `COLLATE NOCASE`.
pub fn tag_name_exists(conn: &Connection, name: &str) -> Result<bool, DbError> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM tags WHERE name = ?1)",
        [name],
        |row| row.get(0),
    )?)
}

/// Lowest id in `0..=MAX_TAG_ID` not held by a live tag. Freed ids are safe to
/// hand out again because deleting a tag clears its bit from every post.
fn lowest_free_tag_id(conn: &Connection) -> Result<Option<i64>, DbError> {
    let mut stmt = conn.prepare("SELECT id FROM tags")?;
    let used = stmt
        .query_map([], |row| row.get::<_, i64>(0))?
        .collect::<rusqlite::Result<HashSet<i64>>>()?;
    Ok((0..=tag_codec::MAX_TAG_ID).find(|id| !used.contains(id)))
}

fn allocate_tag(conn: &Connection, name: &str) -> Result<Tag, DbError> {
    let id = lowest_free_tag_id(conn)?.ok_or(DbError::TagIdsExhausted)?;
    conn.execute("INSERT INTO tags (id, name) VALUES (?1, ?2)", params![id, name])?;
    Ok(Tag { id, name: name.to_string() })
}

/// Takes the write lock up front so two writers never pick the same free id.
pub fn insert_tag(conn: &mut Connection, name: &str) -> Result<Tag, DbError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let tag = allocate_tag(&tx, name)?;
    tx.commit()?;
    Ok(tag)
}

/// Deletes the tag and clears its bit from every post, leaving the id free
/// for the next tag without any stale mask pointing at it.
pub fn delete_tag_and_clear_bits(conn: &mut Connection, tag_id: i64) -> Result<usize, DbError> {
    let tx = conn.transaction()?;
    let deleted = tx.execute("DELETE FROM tags WHERE id = ?1", [tag_id])?;
    if deleted > 0 {
        if let Ok(bit) = tag_codec::bit_for(tag_id) {
            tx.execute("UPDATE posts SET tags = tags & ~?1 WHERE (tags & ?1) != 0", [bit])?;
        }
    }
    tx.commit()?;
    Ok(deleted)
}

// --- Recommended tags ---

pub fn insert_recommendation(conn: &Connection, user_id: i64, name: &str) -> Result<i64, DbError> {
    conn.execute(
        "INSERT INTO recommended_tags (user_id, name, created_at) VALUES (?1, ?2, ?3)",
        params![user_id, name, Utc::now().to_rfc3339()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn read_recommendations(conn: &Connection) -> Result<Vec<RecommendedTag>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT rt.id, rt.user_id, u.username, rt.name, rt.created_at
         FROM recommended_tags rt JOIN users u ON u.id = rt.user_id
         ORDER BY rt.id",
    )?;
    let rows = stmt.query_map([], map_recommendation)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn read_recommendation(conn: &Connection, recommendation_id: i64) -> Result<Option<RecommendedTag>, DbError> {
    Ok(conn
        .query_row(
            "SELECT rt.id, rt.user_id, u.username, rt.name, rt.created_at
             FROM recommended_tags rt JOIN users u ON u.id = rt.user_id
             WHERE rt.id = ?1",
            [recommendation_id],
            map_recommendation,
        )
        .optional()?)
}

pub fn delete_recommendation(conn: &Connection, recommendation_id: i64) -> Result<usize, DbError> {
    Ok(conn.execute("DELETE FROM recommended_tags WHERE id = ?1", [recommendation_id])?)
}

/// Turns a suggestion into a real tag and drops the suggestion, atomically.
pub fn promote_recommendation(
    conn: &mut Connection,
    recommendation_id: i64,
    name: &str,
) -> Result<Tag, DbError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let tag = allocate_tag(&tx, name)?;
    tx.execute("DELETE FROM recommended_tags WHERE id = ?1", [recommendation_id])?;
    tx.commit()?;
    Ok(tag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::db_operations::{posts_db_operations, users_db_operations};
    use crate::setup::db_setup;

    fn setup() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        db_setup::setup_database(&mut conn).unwrap();
        conn
    }

    #[test]
    fn ids_start_at_zero_and_freed_ids_are_reused() {
        let mut conn = setup();
        let math = insert_tag(&mut conn, "Math").unwrap();
        let science = insert_tag(&mut conn, "Science").unwrap();
        let art = insert_tag(&mut conn, "Art").unwrap();
        assert_eq!((math.id, science.id, art.id), (0, 1, 2));

        delete_tag_and_clear_bits(&mut conn, science.id).unwrap();
        assert_eq!(insert_tag(&mut conn, "History").unwrap().id, 1);
        assert_eq!(insert_tag(&mut conn, "Music").unwrap().id, 3);
    }

    #[test]
    fn names_are_unique_ignoring_case() {
        let mut conn = setup();
        insert_tag(&mut conn, "Math").unwrap();
        assert!(tag_name_exists(&conn, "MATH").unwrap());
        let err = insert_tag(&mut conn, "math").unwrap_err();
        assert!(err.is_constraint_violation());
    }

    #[test]
    fn capacity_is_bounded_by_live_tags_only() {
        let mut conn = setup();
        for i in 0..=tag_codec::MAX_TAG_ID {
            assert_eq!(insert_tag(&mut conn, &format!("t{i}")).unwrap().id, i);
        }
        assert!(matches!(insert_tag(&mut conn, "One more"), Err(DbError::TagIdsExhausted)));

        delete_tag_and_clear_bits(&mut conn, 40).unwrap();
        assert_eq!(insert_tag(&mut conn, "One more").unwrap().id, 40);
    }

    #[test]
    fn create_and_delete_cycles_never_run_out() {
        let mut conn = setup();
        for i in 0..200 {
            let tag = insert_tag(&mut conn, &format!("cycle{i}")).unwrap();
            assert_eq!(tag.id, 0);
            assert_eq!(delete_tag_and_clear_bits(&mut conn, tag.id).unwrap(), 1);
        }
        assert!(read_all_tags(&conn).unwrap().is_empty());
    }

    #[test]
    fn reused_id_does_not_inherit_old_posts() {
        let mut conn = setup();
        let user_id = users_db_operations::create_user(&conn, "alice", "password1", false, 4).unwrap();
        let old = insert_tag(&mut conn, "Old").unwrap();
        let post_id = posts_db_operations::create_post(&conn, user_id, "T", "B", None, 0b1).unwrap();

        delete_tag_and_clear_bits(&mut conn, old.id).unwrap();
        let new = insert_tag(&mut conn, "New").unwrap();
        assert_eq!(new.id, old.id);
        let post = posts_db_operations::read_post(&conn, post_id).unwrap().unwrap();
        assert_eq!(post.tags, 0);
    }

    #[test]
    fn deleting_a_tag_clears_its_bit_from_posts() {
        let mut conn = setup();
        let user_id = users_db_operations::create_user(&conn, "alice", "password1", false, 4).unwrap();
        for name in ["Math", "Science", "Art"] {
            insert_tag(&mut conn, name).unwrap();
        }
        let post_id = posts_db_operations::create_post(&conn, user_id, "T", "B", None, 0b111).unwrap();

        delete_tag_and_clear_bits(&mut conn, 1).unwrap();
        let post = posts_db_operations::read_post(&conn, post_id).unwrap().unwrap();
        assert_eq!(post.tags, 0b101);
    }

    #[test]
    fn promoting_a_recommendation_consumes_it() {
        let mut conn = setup();
        let user_id = users_db_operations::create_user(&conn, "alice", "password1", false, 4).unwrap();
        let rec_id = insert_recommendation(&conn, user_id, "Linguistics").unwrap();
        assert_eq!(read_recommendations(&conn).unwrap()[0].suggested_by, "alice");

        let tag = promote_recommendation(&mut conn, rec_id, "Linguistics").unwrap();
        assert_eq!(tag.id, 0);
        assert!(read_recommendation(&conn, rec_id).unwrap().is_none());
        assert_eq!(read_all_tags(&conn).unwrap(), vec![tag]);
    }
}
