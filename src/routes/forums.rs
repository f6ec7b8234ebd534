use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::error::{ApiResponse, AppError};
use crate::helper::{forum_helpers, page_bounds};
use crate::models::Actor;
use crate::routes::PaginationQuery;
use crate::DbPool;

#[derive(Deserialize)]
struct ForumRequest {
    title: String,
    body: String,
}

#[derive(Deserialize)]
struct CommentRequest {
    body: String,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/forums", web::get().to(list_forums))
        .route("/forums", web::post().to(create_forum))
        .route("/forums/{id}", web::get().to(get_forum))
        .route("/forums/{id}", web::delete().to(delete_forum))
        .route("/forums/{id}/comments", web::get().to(list_comments))
        .route("/forums/{id}/comments", web::post().to(add_comment))
        .route("/comments/{id}", web::delete().to(delete_comment));
}

async fn list_forums(pool: web::Data<DbPool>, query: web::Query<PaginationQuery>) -> Result<HttpResponse, AppError> {
    let (limit, offset) = page_bounds(query.limit, query.offset);
    Ok(HttpResponse::Ok().json(ApiResponse::ok(forum_helpers::list_forums(&pool, limit, offset)?)))
}

async fn get_forum(pool: web::Data<DbPool>, path: web::Path<i64>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(ApiResponse::ok(forum_helpers::get_forum(&pool, path.into_inner())?)))
}

async fn create_forum(
    pool: web::Data<DbPool>,
    actor: Actor,
    body: web::Json<ForumRequest>,
) -> Result<HttpResponse, AppError> {
    let forum = forum_helpers::create_forum(&pool, &actor, &body.title, &body.body)?;
    Ok(HttpResponse::Created().json(ApiResponse::ok(forum)))
}

async fn delete_forum(pool: web::Data<DbPool>, actor: Actor, path: web::Path<i64>) -> Result<HttpResponse, AppError> {
    forum_helpers::delete_forum(&pool, &actor, path.into_inner())?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok("Forum deleted.")))
}

async fn list_comments(pool: web::Data<DbPool>, path: web::Path<i64>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(ApiResponse::ok(forum_helpers::list_comments(&pool, path.into_inner())?)))
}

async fn add_comment(
    pool: web::Data<DbPool>,
    actor: Actor,
    path: web::Path<i64>,
    body: web::Json<CommentRequest>,
) -> Result<HttpResponse, AppError> {
    let comment = forum_helpers::add_comment(&pool, &actor, path.into_inner(), &body.body)?;
    Ok(HttpResponse::Created().json(ApiResponse::ok(comment)))
}

async fn delete_comment(pool: web::Data<DbPool>, actor: Actor, path: web::Path<i64>) -> Result<HttpResponse, AppError> {
    forum_helpers::delete_comment(&pool, &actor, path.into_inner())?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok("Comment deleted.")))
}
