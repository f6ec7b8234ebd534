use actix_session::{storage::CookieSessionStore, Session, SessionExt, SessionMiddleware};
use actix_web::{cookie::Key, dev, FromRequest, HttpRequest};
use std::future::{ready, Ready};

use crate::error::AppError;
use crate::models::{Actor, User};

const SESSION_USER_ID: &str = "user_id";
const SESSION_USERNAME: &str = "username";
const SESSION_IS_ADMIN: &str = "is_admin";

pub fn session_middleware(key: Key, secure: bool) -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_secure(secure)
        .cookie_http_only(true)
        .cookie_same_site(actix_web::cookie::SameSite::Lax)
        .build()
}

/// Binds the session to `user`. The cookie is renewed to prevent fixation.
pub fn start_session(session: &Session, user: &User) -> Result<(), AppError> {
    session.renew();
    session
        .insert(SESSION_USER_ID, user.id)
        .and_then(|_| session.insert(SESSION_USERNAME, &user.username))
        .and_then(|_| session.insert(SESSION_IS_ADMIN, user.is_admin))
        .map_err(|e| AppError::Internal(format!("Failed to write session: {}", e)))
}

pub fn end_session(session: &Session) {
    session.purge();
}

fn actor_from_session(session: &Session) -> Option<Actor> {
    let id = session.get::<i64>(SESSION_USER_ID).ok().flatten()?;
    let is_admin = session.get::<bool>(SESSION_IS_ADMIN).ok().flatten().unwrap_or(false);
    Some(Actor { id, is_admin })
}

/// Extracting `Actor` fails with 401 when nobody is logged in;
/// extract `Option<Actor>` for endpoints that also serve anonymous callers.
impl FromRequest for Actor {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        ready(actor_from_session(&req.get_session()).ok_or(AppError::Unauthenticated))
    }
}

impl Actor {
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin {
            Ok(())
        } else {
            log::warn!("User {} attempted an admin-only action.", self.id);
            Err(AppError::Forbidden("Administrator rights are required.".to_string()))
        }
    }
}
