use actix_files::NamedFile;
use actix_web::{web, HttpRequest, HttpResponse, Responder, ResponseError};
use serde::Deserialize;
use std::path::Path;

use crate::config::Config;
use crate::error::AppError;

pub mod auth;
pub mod chat;
pub mod forums;
pub mod media;
pub mod posts;
pub mod reviews;
pub mod tags;

#[derive(Deserialize)]
pub struct PaginationQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Mounts the whole JSON API under `/api`.
pub fn config_api(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .app_data(web::JsonConfig::default().error_handler(|err, _| {
                AppError::Validation(format!("Invalid JSON body: {}", err)).into()
            }))
            .app_data(web::QueryConfig::default().error_handler(|err, _| {
                AppError::Validation(format!("Invalid query string: {}", err)).into()
            }))
            .app_data(web::PathConfig::default().error_handler(|err, _| {
                AppError::Validation(format!("Invalid path parameter: {}", err)).into()
            }))
            .route("/is_server_active", web::get().to(is_server_active))
            .configure(auth::config)
            .configure(tags::config)
            .configure(posts::config)
            .configure(reviews::config)
            .configure(forums::config)
            .configure(media::config)
            .configure(chat::config)
            .default_service(web::to(api_not_found)),
    );
}

async fn is_server_active() -> impl Responder {
    HttpResponse::Ok().body("active")
}

async fn api_not_found() -> Result<HttpResponse, AppError> {
    Err(AppError::NotFound("Endpoint".to_string()))
}

/// Serves the single-page app's `index.html` for client-side routes.
pub async fn spa_fallback(req: &HttpRequest) -> HttpResponse {
    let Some(config) = req.app_data::<web::Data<Config>>() else {
        return AppError::Internal("Config missing from app data".to_string()).error_response();
    };
    match NamedFile::open_async(Path::new(&config.static_dir).join("index.html")).await {
        Ok(index) => index.into_response(req),
        Err(_) => AppError::NotFound("Page".to_string()).error_response(),
    }
}
