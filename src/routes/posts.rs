use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::error::{ApiResponse, AppError};
use crate::helper::{page_bounds, post_helpers};
use crate::models::Actor;
use crate::routes::PaginationQuery;
use crate::DbPool;

#[derive(Deserialize)]
struct PostRequest {
    title: String,
    body: String,
    image: Option<String>,
    #[serde(default)]
    tags: Vec<i64>,
}

#[derive(Deserialize)]
struct PostListQuery {
    /// Comma separated tag ids, e.g. `tags=0,2`.
    tags: Option<String>,
    limit: Option<u32>,
    offset: Option<u32>,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/posts", web::get().to(list_posts))
        .route("/posts", web::post().to(create_post))
        .route("/posts/{id}", web::get().to(get_post))
        .route("/posts/{id}", web::put().to(update_post))
        .route("/posts/{id}", web::delete().to(delete_post))
        .route("/me/posts", web::get().to(my_posts))
        .service(
            web::scope("/moderation")
                .route("/queue", web::get().to(moderation_queue))
                .route("/posts/{id}/validate", web::post().to(validate_post)),
        );
}

async fn list_posts(pool: web::Data<DbPool>, query: web::Query<PostListQuery>) -> Result<HttpResponse, AppError> {
    let tag_ids = post_helpers::parse_tag_filter(query.tags.as_deref())?;
    let (limit, offset) = page_bounds(query.limit, query.offset);
    let posts = post_helpers::list_public_posts(&pool, &tag_ids, limit, offset)?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(posts)))
}

async fn get_post(
    pool: web::Data<DbPool>,
    actor: Option<Actor>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let post = post_helpers::get_visible_post(&pool, path.into_inner(), actor.as_ref())?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(post)))
}

async fn create_post(
    pool: web::Data<DbPool>,
    actor: Actor,
    body: web::Json<PostRequest>,
) -> Result<HttpResponse, AppError> {
    let post = post_helpers::create_post(&pool, &actor, &body.title, &body.body, body.image.as_deref(), &body.tags)?;
    Ok(HttpResponse::Created().json(ApiResponse::ok(post)))
}

async fn update_post(
    pool: web::Data<DbPool>,
    actor: Actor,
    path: web::Path<i64>,
    body: web::Json<PostRequest>,
) -> Result<HttpResponse, AppError> {
    let post = post_helpers::update_post(
        &pool,
        &actor,
        path.into_inner(),
        &body.title,
        &body.body,
        body.image.as_deref(),
        &body.tags,
    )?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(post)))
}

async fn delete_post(pool: web::Data<DbPool>, actor: Actor, path: web::Path<i64>) -> Result<HttpResponse, AppError> {
    post_helpers::delete_post(&pool, &actor, path.into_inner())?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok("Post deleted.")))
}

async fn my_posts(
    pool: web::Data<DbPool>,
    actor: Actor,
    query: web::Query<PaginationQuery>,
) -> Result<HttpResponse, AppError> {
    let (limit, offset) = page_bounds(query.limit, query.offset);
    let posts = post_helpers::list_posts_of(&pool, &actor, limit, offset)?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(posts)))
}

async fn moderation_queue(
    pool: web::Data<DbPool>,
    actor: Actor,
    query: web::Query<PaginationQuery>,
) -> Result<HttpResponse, AppError> {
    let (limit, offset) = page_bounds(query.limit, query.offset);
    let posts = post_helpers::list_pending_posts(&pool, &actor, limit, offset)?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(posts)))
}

async fn validate_post(pool: web::Data<DbPool>, actor: Actor, path: web::Path<i64>) -> Result<HttpResponse, AppError> {
    let post = post_helpers::validate_post(&pool, &actor, path.into_inner())?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(post)))
}
