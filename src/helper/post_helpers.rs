use std::collections::HashSet;

use crate::domain::moderation;
use crate::domain::tag_codec;
use crate::error::AppError;
use crate::helper::sanitization_helpers::{self, MAX_BODY_CHARS, MAX_TITLE_CHARS};
use crate::models::db_operations::{posts_db_operations, tags_db_operations};
use crate::models::{Actor, PostRecord, PostView, Tag};
use crate::DbPool;
use rusqlite::Connection;

/// Cleaned user input for creating or editing a post.
struct PostContent {
    title: String,
    body: String,
    image: Option<String>,
    tags_mask: i64,
}

fn to_view(record: PostRecord, all_tags: &[Tag]) -> PostView {
    let PostRecord { post, author, review_count, average_rating } = record;
    PostView {
        id: post.id,
        user_id: post.user_id,
        author,
        title: post.title,
        body: post.body,
        image: post.image,
        tags: tag_codec::decode_tags(post.tags, all_tags),
        tag_mask: post.tags,
        status: post.state,
        created_at: post.created_at,
        updated_at: post.updated_at,
        review_count,
        average_rating,
    }
}

fn to_views(conn: &Connection, records: Vec<PostRecord>) -> Result<Vec<PostView>, AppError> {
    let all_tags = tags_db_operations::read_all_tags(conn)?;
    Ok(records.into_iter().map(|r| to_view(r, &all_tags)).collect())
}

fn load_view(conn: &Connection, post_id: i64) -> Result<PostView, AppError> {
    let record = posts_db_operations::read_post_record(conn, post_id)?
        .ok_or_else(|| AppError::NotFound("Post".to_string()))?;
    let all_tags = tags_db_operations::read_all_tags(conn)?;
    Ok(to_view(record, &all_tags))
}

fn valid_tag_ids(conn: &Connection) -> Result<HashSet<i64>, AppError> {
    Ok(tags_db_operations::read_all_tags(conn)?.into_iter().map(|t| t.id).collect())
}

fn clean_content(
    conn: &Connection,
    title: &str,
    body: &str,
    image: Option<&str>,
    tag_ids: &[i64],
) -> Result<PostContent, AppError> {
    Ok(PostContent {
        title: sanitization_helpers::clean_line(title, "Title", MAX_TITLE_CHARS)?,
        body: sanitization_helpers::clean_body(body, "Body", MAX_BODY_CHARS)?,
        image: sanitization_helpers::clean_image_path(image)?,
        tags_mask: tag_codec::encode(tag_ids, &valid_tag_ids(conn)?)?,
    })
}

/// Parses the `tags` query parameter, a comma separated list of tag ids.
pub fn parse_tag_filter(raw: Option<&str>) -> Result<Vec<i64>, AppError> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|_| AppError::Validation(format!("'{}' is not a valid tag id.", s)))
        })
        .collect()
}

/// Validated posts carrying every tag in `tag_ids`, newest first.
/// No post can carry a tag that does not exist, so such a filter matches nothing.
pub fn list_public_posts(
    pool: &DbPool,
    tag_ids: &[i64],
    limit: u32,
    offset: u32,
) -> Result<Vec<PostView>, AppError> {
    let conn = pool.get()?;
    let known_ids = valid_tag_ids(&conn)?;
    if tag_ids.iter().any(|id| !known_ids.contains(id)) {
        return Ok(Vec::new());
    }
    let required_mask = tag_codec::encode(tag_ids, &known_ids)?;
    let records = posts_db_operations::read_validated_posts(&conn, required_mask, limit, offset)?;
    to_views(&conn, records)
}

pub fn list_posts_of(pool: &DbPool, actor: &Actor, limit: u32, offset: u32) -> Result<Vec<PostView>, AppError> {
    let conn = pool.get()?;
    let records = posts_db_operations::read_posts_by_user(&conn, actor.id, limit, offset)?;
    to_views(&conn, records)
}

/// Hidden posts answer "not found" so their existence is not disclosed.
pub fn get_visible_post(pool: &DbPool, post_id: i64, actor: Option<&Actor>) -> Result<PostView, AppError> {
    let conn = pool.get()?;
    let record = posts_db_operations::read_post_record(&conn, post_id)?
        .filter(|r| moderation::is_visible(&r.post, actor))
        .ok_or_else(|| AppError::NotFound("Post".to_string()))?;
    let all_tags = tags_db_operations::read_all_tags(&conn)?;
    Ok(to_view(record, &all_tags))
}

pub fn create_post(
    pool: &DbPool,
    actor: &Actor,
    title: &str,
    body: &str,
    image: Option<&str>,
    tag_ids: &[i64],
) -> Result<PostView, AppError> {
    let conn = pool.get()?;
    let content = clean_content(&conn, title, body, image, tag_ids)?;
    let post_id = posts_db_operations::create_post(
        &conn,
        actor.id,
        &content.title,
        &content.body,
        content.image.as_deref(),
        content.tags_mask,
    )?;
    log::info!("User {} submitted post {} for validation.", actor.id, post_id);
    load_view(&conn, post_id)
}

/// Only the owner edits. Any edit puts the post back into the moderation queue.
pub fn update_post(
    pool: &DbPool,
    actor: &Actor,
    post_id: i64,
    title: &str,
    body: &str,
    image: Option<&str>,
    tag_ids: &[i64],
) -> Result<PostView, AppError> {
    let conn = pool.get()?;
    let post = posts_db_operations::read_post(&conn, post_id)?
        .ok_or_else(|| AppError::NotFound("Post".to_string()))?;
    if !moderation::can_edit(&post, actor) {
        log::warn!("User {} attempted to edit post {} they do not own.", actor.id, post_id);
        return Err(AppError::Forbidden("Only the author can edit this post.".to_string()));
    }

    let content = clean_content(&conn, title, body, image, tag_ids)?;
    posts_db_operations::update_post_content(
        &conn,
        post_id,
        &content.title,
        &content.body,
        content.image.as_deref(),
        content.tags_mask,
        post.state.after_edit(),
    )?;
    log::info!("Post {} edited by its author and returned to the queue.", post_id);
    load_view(&conn, post_id)
}

pub fn delete_post(pool: &DbPool, actor: &Actor, post_id: i64) -> Result<(), AppError> {
    let mut conn = pool.get()?;
    let post = posts_db_operations::read_post(&conn, post_id)?
        .ok_or_else(|| AppError::NotFound("Post".to_string()))?;
    if !moderation::can_delete(&post, actor) {
        log::warn!("User {} attempted to delete post {} without permission.", actor.id, post_id);
        return Err(AppError::Forbidden("You cannot delete this post.".to_string()));
    }
    posts_db_operations::delete_post_with_reviews(&mut conn, post_id)?;
    log::info!("Post {} deleted by user {}.", post_id, actor.id);
    Ok(())
}

pub fn list_pending_posts(pool: &DbPool, actor: &Actor, limit: u32, offset: u32) -> Result<Vec<PostView>, AppError> {
    actor.require_admin()?;
    let conn = pool.get()?;
    let records = posts_db_operations::read_pending_posts(&conn, limit, offset)?;
    to_views(&conn, records)
}

pub fn validate_post(pool: &DbPool, actor: &Actor, post_id: i64) -> Result<PostView, AppError> {
    actor.require_admin()?;
    let conn = pool.get()?;
    let post = posts_db_operations::read_post(&conn, post_id)?
        .ok_or_else(|| AppError::NotFound("Post".to_string()))?;
    let next = post.state.validate()?;
    posts_db_operations::set_moderation_state(&conn, post_id, next)?;
    log::info!("Post {} validated by admin {}.", post_id, actor.id);
    load_view(&conn, post_id)
}
