use crate::domain::moderation::{self, ContentAction, ReviewDenial};
use crate::error::AppError;
use crate::helper::sanitization_helpers::{self, MAX_COMMENT_CHARS};
use crate::models::db_operations::{posts_db_operations, reviews_db_operations};
use crate::models::{Actor, PostReviews, Review};
use crate::DbPool;

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;

/// Reviews of a post the caller is allowed to see, newest first.
pub fn list_reviews(pool: &DbPool, post_id: i64, actor: Option<&Actor>) -> Result<PostReviews, AppError> {
    let conn = pool.get()?;
    let record = posts_db_operations::read_post_record(&conn, post_id)?
        .filter(|r| moderation::is_visible(&r.post, actor))
        .ok_or_else(|| AppError::NotFound("Post".to_string()))?;
    let reviews = reviews_db_operations::read_reviews_for_post(&conn, post_id)?;
    Ok(PostReviews { post_id, average_rating: record.average_rating, reviews })
}

pub fn submit_review(
    pool: &DbPool,
    actor: &Actor,
    post_id: i64,
    rating: i64,
    comment: Option<&str>,
) -> Result<Review, AppError> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(AppError::Validation(format!(
            "Rating must be between {} and {}.",
            MIN_RATING, MAX_RATING
        )));
    }
    let comment = sanitization_helpers::clean_optional_body(comment, "Comment", MAX_COMMENT_CHARS)?;

    let conn = pool.get()?;
    let post = posts_db_operations::read_post(&conn, post_id)?
        .ok_or_else(|| AppError::NotFound("Post".to_string()))?;
    let already_reviewed = reviews_db_operations::has_reviewed(&conn, actor.id, post_id)?;
    moderation::review_eligibility(&post, actor, already_reviewed)?;

    let review_id = match reviews_db_operations::create_review(&conn, actor.id, post_id, rating, comment.as_deref()) {
        Ok(id) => id,
        // UNIQUE(user_id, post_id) caught a concurrent duplicate.
        Err(e) if e.is_constraint_violation() => return Err(ReviewDenial::AlreadyReviewed.into()),
        Err(e) => return Err(e.into()),
    };
    log::info!("User {} reviewed post {} with rating {}.", actor.id, post_id, rating);

    reviews_db_operations::read_review(&conn, review_id)?
        .ok_or_else(|| AppError::Internal(format!("Review {} vanished after creation", review_id)))
}

pub fn delete_review(pool: &DbPool, actor: &Actor, review_id: i64) -> Result<(), AppError> {
    let conn = pool.get()?;
    let review = reviews_db_operations::read_review(&conn, review_id)?
        .ok_or_else(|| AppError::NotFound("Review".to_string()))?;
    if !moderation::may_modify(review.user_id, actor, ContentAction::Delete) {
        log::warn!("User {} attempted to delete review {} without permission.", actor.id, review_id);
        return Err(AppError::Forbidden("You cannot delete this review.".to_string()));
    }
    reviews_db_operations::delete_review(&conn, review_id)?;
    Ok(())
}
