use actix_session::Session;
use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::config::Config;
use crate::error::{ApiResponse, AppError};
use crate::helper::auth_helpers;
use crate::middleware::{end_session, start_session};
use crate::models::Actor;
use crate::DbPool;

#[derive(Deserialize)]
struct Credentials {
    username: String,
    password: String,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/register", web::post().to(register))
            .route("/login", web::post().to(login))
            .route("/logout", web::post().to(logout))
            .route("/me", web::get().to(me)),
    );
}

// bcrypt is CPU bound, so hashing runs on the blocking pool.
async fn register(
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    session: Session,
    body: web::Json<Credentials>,
) -> Result<HttpResponse, AppError> {
    let Credentials { username, password } = body.into_inner();
    let cost = config.bcrypt_cost;
    let user = web::block(move || auth_helpers::register_user(&pool, &username, &password, cost)).await??;
    start_session(&session, &user)?;
    Ok(HttpResponse::Created().json(ApiResponse::ok(user)))
}

async fn login(
    pool: web::Data<DbPool>,
    session: Session,
    body: web::Json<Credentials>,
) -> Result<HttpResponse, AppError> {
    let Credentials { username, password } = body.into_inner();
    let user = web::block(move || auth_helpers::login_user(&pool, &username, &password)).await??;
    start_session(&session, &user)?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(user)))
}

async fn logout(session: Session) -> HttpResponse {
    end_session(&session);
    HttpResponse::Ok().json(ApiResponse::ok("Logged out."))
}

async fn me(pool: web::Data<DbPool>, actor: Actor) -> Result<HttpResponse, AppError> {
    let user = auth_helpers::current_user(&pool, &actor)?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(user)))
}
