use crate::error::AppError;
use crate::helper::sanitization_helpers;
use crate::models::db_operations::users_db_operations;
use crate::models::{Actor, User};
use crate::DbPool;

/// Creates a regular (non-admin) account.
pub fn register_user(pool: &DbPool, username: &str, password: &str, hash_cost: u32) -> Result<User, AppError> {
    let username = username.trim();
    sanitization_helpers::validate_username(username)?;
    sanitization_helpers::validate_password(password)?;

    let conn = pool.get()?;
    if users_db_operations::read_user_by_username(&conn, username)?.is_some() {
        return Err(AppError::Validation("Username is already taken.".to_string()));
    }

    let user_id = match users_db_operations::create_user(&conn, username, password, false, hash_cost) {
        Ok(id) => id,
        // Lost a race with a concurrent registration of the same name.
        Err(e) if e.is_constraint_violation() => {
            return Err(AppError::Validation("Username is already taken.".to_string()))
        }
        Err(e) => return Err(e.into()),
    };
    log::info!("Registered new user '{}' (id {}).", username, user_id);

    users_db_operations::read_user_by_id(&conn, user_id)?
        .ok_or_else(|| AppError::Internal(format!("User {} vanished after creation", user_id)))
}

pub fn login_user(pool: &DbPool, username: &str, password: &str) -> Result<User, AppError> {
    let conn = pool.get()?;
    match users_db_operations::verify_credentials(&conn, username.trim(), password)? {
        Some(user) => {
            users_db_operations::update_last_login_time(&conn, user.id)?;
            log::info!("User '{}' logged in.", user.username);
            Ok(user)
        }
        None => {
            log::warn!("Failed login attempt for username '{}'.", username.trim());
            Err(AppError::InvalidCredentials)
        }
    }
}

pub fn current_user(pool: &DbPool, actor: &Actor) -> Result<User, AppError> {
    let conn = pool.get()?;
    users_db_operations::read_user_by_id(&conn, actor.id)?.ok_or(AppError::Unauthenticated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helper::test_support;

    #[test]
    fn register_then_login() {
        let pool = test_support::pool();
        let user = register_user(&pool, "grace", "hopper1906", 4).unwrap();
        assert!(!user.is_admin);

        let logged_in = login_user(&pool, "grace", "hopper1906").unwrap();
        assert_eq!(logged_in.id, user.id);
        assert!(current_user(&pool, &logged_in.actor()).unwrap().last_login_time.is_some());
    }

    #[test]
    fn duplicate_names_and_bad_passwords_are_rejected() {
        let pool = test_support::pool();
        register_user(&pool, "grace", "hopper1906", 4).unwrap();
        assert!(matches!(register_user(&pool, "GRACE", "another-pass", 4), Err(AppError::Validation(_))));
        assert!(matches!(login_user(&pool, "grace", "wrong-pass"), Err(AppError::InvalidCredentials)));
        assert!(matches!(login_user(&pool, "nobody", "whatever1"), Err(AppError::InvalidCredentials)));
    }
}
