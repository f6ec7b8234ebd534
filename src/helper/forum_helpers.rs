use crate::domain::moderation::{self, ContentAction};
use crate::error::AppError;
use crate::helper::sanitization_helpers::{self, MAX_BODY_CHARS, MAX_COMMENT_CHARS, MAX_TITLE_CHARS};
use crate::models::db_operations::forums_db_operations;
use crate::models::{Actor, Comment, Forum};
use crate::DbPool;

pub fn list_forums(pool: &DbPool, limit: u32, offset: u32) -> Result<Vec<Forum>, AppError> {
    let conn = pool.get()?;
    Ok(forums_db_operations::read_forums(&conn, limit, offset)?)
}

pub fn get_forum(pool: &DbPool, forum_id: i64) -> Result<Forum, AppError> {
    let conn = pool.get()?;
    forums_db_operations::read_forum(&conn, forum_id)?.ok_or_else(|| AppError::NotFound("Forum".to_string()))
}

pub fn create_forum(pool: &DbPool, actor: &Actor, title: &str, body: &str) -> Result<Forum, AppError> {
    let title = sanitization_helpers::clean_line(title, "Title", MAX_TITLE_CHARS)?;
    let body = sanitization_helpers::clean_body(body, "Body", MAX_BODY_CHARS)?;
    let conn = pool.get()?;
    let forum_id = forums_db_operations::create_forum(&conn, actor.id, &title, &body)?;
    log::info!("User {} opened forum {}.", actor.id, forum_id);
    forums_db_operations::read_forum(&conn, forum_id)?
        .ok_or_else(|| AppError::Internal(format!("Forum {} vanished after creation", forum_id)))
}

pub fn delete_forum(pool: &DbPool, actor: &Actor, forum_id: i64) -> Result<(), AppError> {
    let mut conn = pool.get()?;
    let forum = forums_db_operations::read_forum(&conn, forum_id)?
        .ok_or_else(|| AppError::NotFound("Forum".to_string()))?;
    if !moderation::may_modify(forum.user_id, actor, ContentAction::Delete) {
        log::warn!("User {} attempted to delete forum {} without permission.", actor.id, forum_id);
        return Err(AppError::Forbidden("You cannot delete this forum.".to_string()));
    }
    forums_db_operations::delete_forum_with_comments(&mut conn, forum_id)?;
    log::info!("Forum {} deleted by user {}.", forum_id, actor.id);
    Ok(())
}

pub fn list_comments(pool: &DbPool, forum_id: i64) -> Result<Vec<Comment>, AppError> {
    let conn = pool.get()?;
    if forums_db_operations::read_forum(&conn, forum_id)?.is_none() {
        return Err(AppError::NotFound("Forum".to_string()));
    }
    Ok(forums_db_operations::read_comments(&conn, forum_id)?)
}

pub fn add_comment(pool: &DbPool, actor: &Actor, forum_id: i64, body: &str) -> Result<Comment, AppError> {
    let body = sanitization_helpers::clean_body(body, "Comment", MAX_COMMENT_CHARS)?;
    let conn = pool.get()?;
    if forums_db_operations::read_forum(&conn, forum_id)?.is_none() {
        return Err(AppError::NotFound("Forum".to_string()));
    }
    let comment_id = forums_db_operations::create_comment(&conn, actor.id, forum_id, &body)?;
    forums_db_operations::read_comment(&conn, comment_id)?
        .ok_or_else(|| AppError::Internal(format!("Comment {} vanished after creation", comment_id)))
}

pub fn delete_comment(pool: &DbPool, actor: &Actor, comment_id: i64) -> Result<(), AppError> {
    let conn = pool.get()?;
    let comment = forums_db_operations::read_comment(&conn, comment_id)?
        .ok_or_else(|| AppError::NotFound("Comment".to_string()))?;
    if !moderation::may_modify(comment.user_id, actor, ContentAction::Delete) {
        log::warn!("User {} attempted to delete comment {} without permission.", actor.id, comment_id);
        return Err(AppError::Forbidden("You cannot delete this comment.".to_string()));
    }
    forums_db_operations::delete_comment(&conn, comment_id)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helper::test_support;

    #[test]
    fn forum_with_comments() {
        let pool = test_support::pool();
        let alice = test_support::user(&pool, "alice", false);
        let bob = test_support::user(&pool, "bob", false);

        let forum = create_forum(&pool, &alice, "Reading group", "Weekly papers").unwrap();
        let first = add_comment(&pool, &bob, forum.id, "Count me in").unwrap();
        add_comment(&pool, &alice, forum.id, "Great").unwrap();

        let comments = list_comments(&pool, forum.id).unwrap();
        assert_eq!(comments.iter().map(|c| c.id).collect::<Vec<_>>()[0], first.id);
        assert_eq!(get_forum(&pool, forum.id).unwrap().comment_count, 2);
        assert!(matches!(add_comment(&pool, &bob, forum.id, &"x".repeat(2001)), Err(AppError::Validation(_))));

        assert!(matches!(delete_comment(&pool, &alice, first.id), Err(AppError::Forbidden(_))));
        delete_comment(&pool, &bob, first.id).unwrap();
        assert_eq!(list_comments(&pool, forum.id).unwrap().len(), 1);
    }

    #[test]
    fn forum_deletion_is_owner_or_admin_and_cascades() {
        let pool = test_support::pool();
        let admin = test_support::user(&pool, "admin", true);
        let alice = test_support::user(&pool, "alice", false);
        let bob = test_support::user(&pool, "bob", false);
        let forum = create_forum(&pool, &alice, "Open problems", "Post yours").unwrap();
        let comment = add_comment(&pool, &bob, forum.id, "P vs NP").unwrap();

        assert!(matches!(delete_forum(&pool, &bob, forum.id), Err(AppError::Forbidden(_))));
        delete_forum(&pool, &admin, forum.id).unwrap();
        assert!(matches!(list_comments(&pool, forum.id), Err(AppError::NotFound(_))));
        assert!(matches!(delete_comment(&pool, &bob, comment.id), Err(AppError::NotFound(_))));
        assert!(list_forums(&pool, 20, 0).unwrap().is_empty());
    }
}
