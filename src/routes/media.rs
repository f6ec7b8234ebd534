use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::config::Config;
use crate::error::{ApiResponse, AppError};
use crate::helper::media_helpers;
use crate::models::Actor;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/uploads", web::post().to(upload_image));
}

async fn upload_image(config: web::Data<Config>, actor: Actor, payload: Multipart) -> Result<HttpResponse, AppError> {
    let path = media_helpers::save_post_image(&config.media_path, config.max_upload_bytes(), payload).await?;
    log::info!("User {} uploaded {}.", actor.id, path);
    Ok(HttpResponse::Created().json(ApiResponse::ok(json!({ "path": path }))))
}
