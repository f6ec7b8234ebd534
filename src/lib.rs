use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::helper::chat_helpers::ChatClient;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Runtime collaborators shared by every worker.
pub struct AppState {
    pub chat_client: Option<ChatClient>,
}

pub mod config;
pub mod domain;
pub mod error;
pub mod helper;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod setup;
