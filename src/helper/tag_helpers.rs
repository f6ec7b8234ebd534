use crate::error::AppError;
use crate::helper::sanitization_helpers::{self, MAX_TAG_NAME_CHARS};
use crate::models::db_operations::{tags_db_operations, DbError};
use crate::models::{Actor, RecommendedTag, Tag};
use crate::DbPool;

fn duplicate_name(name: &str) -> AppError {
    AppError::Validation(format!("A tag named '{}' already exists.", name))
}

/// Maps a UNIQUE violation on `tags.name` to the same message as the explicit check.
fn tag_write_error(e: DbError, name: &str) -> AppError {
    if e.is_constraint_violation() {
        duplicate_name(name)
    } else {
        e.into()
    }
}

pub fn list_tags(pool: &DbPool) -> Result<Vec<Tag>, AppError> {
    let conn = pool.get()?;
    Ok(tags_db_operations::read_all_tags(&conn)?)
}

pub fn create_tag(pool: &DbPool, actor: &Actor, name: &str) -> Result<Tag, AppError> {
    actor.require_admin()?;
    let name = sanitization_helpers::clean_line(name, "Tag name", MAX_TAG_NAME_CHARS)?;
    let mut conn = pool.get()?;
    if tags_db_operations::tag_name_exists(&conn, &name)? {
        return Err(duplicate_name(&name));
    }
    let tag = tags_db_operations::insert_tag(&mut conn, &name).map_err(|e| tag_write_error(e, &name))?;
    log::info!("Admin {} created tag {} '{}'.", actor.id, tag.id, tag.name);
    Ok(tag)
}

/// Posts lose the tag's bit in the same transaction, which frees the id for the next tag.
pub fn delete_tag(pool: &DbPool, actor: &Actor, tag_id: i64) -> Result<(), AppError> {
    actor.require_admin()?;
    let mut conn = pool.get()?;
    let tag = tags_db_operations::read_tag(&conn, tag_id)?
        .ok_or_else(|| AppError::NotFound("Tag".to_string()))?;
    tags_db_operations::delete_tag_and_clear_bits(&mut conn, tag.id)?;
    log::info!("Admin {} deleted tag {} '{}'.", actor.id, tag.id, tag.name);
    Ok(())
}

pub fn recommend_tag(pool: &DbPool, actor: &Actor, name: &str) -> Result<RecommendedTag, AppError> {
    let name = sanitization_helpers::clean_line(name, "Tag name", MAX_TAG_NAME_CHARS)?;
    let conn = pool.get()?;
    if tags_db_operations::tag_name_exists(&conn, &name)? {
        return Err(duplicate_name(&name));
    }
    let recommendation_id = tags_db_operations::insert_recommendation(&conn, actor.id, &name)?;
    log::info!("User {} suggested tag '{}'.", actor.id, name);
    tags_db_operations::read_recommendation(&conn, recommendation_id)?
        .ok_or_else(|| AppError::Internal(format!("Recommendation {} vanished after creation", recommendation_id)))
}

pub fn list_recommendations(pool: &DbPool, actor: &Actor) -> Result<Vec<RecommendedTag>, AppError> {
    actor.require_admin()?;
    let conn = pool.get()?;
    Ok(tags_db_operations::read_recommendations(&conn)?)
}

/// Promotes the suggestion to a tag. A clash with an existing tag keeps the
/// suggestion around so it can still be denied.
pub fn accept_recommendation(pool: &DbPool, actor: &Actor, recommendation_id: i64) -> Result<Tag, AppError> {
    actor.require_admin()?;
    let mut conn = pool.get()?;
    let recommendation = tags_db_operations::read_recommendation(&conn, recommendation_id)?
        .ok_or_else(|| AppError::NotFound("Tag recommendation".to_string()))?;
    if tags_db_operations::tag_name_exists(&conn, &recommendation.name)? {
        return Err(duplicate_name(&recommendation.name));
    }
    let tag = tags_db_operations::promote_recommendation(&mut conn, recommendation.id, &recommendation.name)
        .map_err(|e| tag_write_error(e, &recommendation.name))?;
    log::info!(
        "Admin {} accepted tag '{}' suggested by '{}' as id {}.",
        actor.id, tag.name, recommendation.suggested_by, tag.id
    );
    Ok(tag)
}

pub fn deny_recommendation(pool: &DbPool, actor: &Actor, recommendation_id: i64) -> Result<(), AppError> {
    actor.require_admin()?;
    let conn = pool.get()?;
    if tags_db_operations::delete_recommendation(&conn, recommendation_id)? == 0 {
        return Err(AppError::NotFound("Tag recommendation".to_string()));
    }
    log::info!("Admin {} denied tag recommendation {}.", actor.id, recommendation_id);
    Ok(())
}
