pub mod auth_helpers;
pub mod chat_helpers;
pub mod forum_helpers;
pub mod media_helpers;
pub mod post_helpers;
pub mod review_helpers;
pub mod sanitization_helpers;
pub mod tag_helpers;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Resolves client pagination into `(limit, offset)`, limit clamped to `1..=MAX_PAGE_SIZE`.
pub fn page_bounds(limit: Option<u32>, offset: Option<u32>) -> (u32, u32) {
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    (limit, offset.unwrap_or(0))
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::models::db_operations::users_db_operations;
    use crate::models::Actor;
    use crate::setup::db_setup;
    use crate::DbPool;
    use r2d2_sqlite::SqliteConnectionManager;

    /// One in-memory database shared through a single-connection pool.
    pub fn pool() -> DbPool {
        let pool = db_setup::build_pool(SqliteConnectionManager::memory(), 1).unwrap();
        db_setup::setup_database(&mut pool.get().unwrap()).unwrap();
        pool
    }

    pub fn user(pool: &DbPool, username: &str, is_admin: bool) -> Actor {
        let conn = pool.get().unwrap();
        let id = users_db_operations::create_user(&conn, username, "password123", is_admin, 4).unwrap();
        Actor { id, is_admin }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_bounds_defaults_and_clamps() {
        assert_eq!(page_bounds(None, None), (20, 0));
        assert_eq!(page_bounds(Some(0), Some(5)), (1, 5));
        assert_eq!(page_bounds(Some(1000), None), (100, 0));
    }
}
