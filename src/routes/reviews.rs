use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::error::{ApiResponse, AppError};
use crate::helper::review_helpers;
use crate::models::Actor;
use crate::DbPool;

#[derive(Deserialize)]
struct ReviewRequest {
    rating: i64,
    comment: Option<String>,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/posts/{id}/reviews", web::get().to(list_reviews))
        .route("/posts/{id}/reviews", web::post().to(submit_review))
        .route("/reviews/{id}", web::delete().to(delete_review));
}

async fn list_reviews(
    pool: web::Data<DbPool>,
    actor: Option<Actor>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let reviews = review_helpers::list_reviews(&pool, path.into_inner(), actor.as_ref())?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(reviews)))
}

async fn submit_review(
    pool: web::Data<DbPool>,
    actor: Actor,
    path: web::Path<i64>,
    body: web::Json<ReviewRequest>,
) -> Result<HttpResponse, AppError> {
    let review =
        review_helpers::submit_review(&pool, &actor, path.into_inner(), body.rating, body.comment.as_deref())?;
    Ok(HttpResponse::Created().json(ApiResponse::ok(review)))
}

async fn delete_review(pool: web::Data<DbPool>, actor: Actor, path: web::Path<i64>) -> Result<HttpResponse, AppError> {
    review_helpers::delete_review(&pool, &actor, path.into_inner())?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok("Review deleted.")))
}
