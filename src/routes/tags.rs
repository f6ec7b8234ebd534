use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::error::{ApiResponse, AppError};
use crate::helper::tag_helpers;
use crate::models::Actor;
use crate::DbPool;

#[derive(Deserialize)]
struct TagRequest {
    name: String,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/tags")
            .route("", web::get().to(list_tags))
            .route("", web::post().to(create_tag))
            .route("/recommended", web::get().to(list_recommendations))
            .route("/recommended", web::post().to(recommend_tag))
            .route("/recommended/{id}/accept", web::post().to(accept_recommendation))
            .route("/recommended/{id}/deny", web::post().to(deny_recommendation))
            .route("/{id}", web::delete().to(delete_tag)),
    );
}

async fn list_tags(pool: web::Data<DbPool>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(ApiResponse::ok(tag_helpers::list_tags(&pool)?)))
}

async fn create_tag(
    pool: web::Data<DbPool>,
    actor: Actor,
    body: web::Json<TagRequest>,
) -> Result<HttpResponse, AppError> {
    let tag = tag_helpers::create_tag(&pool, &actor, &body.name)?;
    Ok(HttpResponse::Created().json(ApiResponse::ok(tag)))
}

async fn delete_tag(pool: web::Data<DbPool>, actor: Actor, path: web::Path<i64>) -> Result<HttpResponse, AppError> {
    tag_helpers::delete_tag(&pool, &actor, path.into_inner())?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok("Tag deleted.")))
}

async fn list_recommendations(pool: web::Data<DbPool>, actor: Actor) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(ApiResponse::ok(tag_helpers::list_recommendations(&pool, &actor)?)))
}

async fn recommend_tag(
    pool: web::Data<DbPool>,
    actor: Actor,
    body: web::Json<TagRequest>,
) -> Result<HttpResponse, AppError> {
    let recommendation = tag_helpers::recommend_tag(&pool, &actor, &body.name)?;
    Ok(HttpResponse::Created().json(ApiResponse::ok(recommendation)))
}

async fn accept_recommendation(
    pool: web::Data<DbPool>,
    actor: Actor,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let tag = tag_helpers::accept_recommendation(&pool, &actor, path.into_inner())?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(tag)))
}

async fn deny_recommendation(
    pool: web::Data<DbPool>,
    actor: Actor,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    tag_helpers::deny_recommendation(&pool, &actor, path.into_inner())?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok("Recommendation denied.")))
}
