pub mod jwt;
pub mod limiter;
pub mod middleware;

use crate::models::User;
use axum::http::StatusCode;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use serde::{Deserialize, Serialize};

#[cfg(not(test))]
const HASH_COST: u32 = bcrypt::DEFAULT_COST;
// Minimum bcrypt accepts; keeps seeded logins fast under test.
#[cfg(test)]
const HASH_COST: u32 = 4;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error(transparent)]
    Database(#[from] diesel::result::Error),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::Hash(_) | AuthError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserInfo,
}

/// The part of a user the UI needs to decide what to show.
#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: i32,
    pub username: String,
    pub role: String,
    pub is_admin: bool,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            role: user.role.clone(),
            is_admin: user.is_admin(),
        }
    }
}

/// Rooms, careers, professors, periods and users are managed by admins only.
pub fn require_admin(user: &User) -> Result<(), StatusCode> {
    if user.is_admin() {
        Ok(())
    } else {
        tracing::debug!("User {} denied an admin-only operation", user.username);
        Err(StatusCode::FORBIDDEN)
    }
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    Ok(bcrypt::hash(password, HASH_COST)?)
}

/// Unknown user and wrong password are indistinguishable to the caller.
pub fn authenticate_user(
    conn: &mut SqliteConnection,
    username: &str,
    password: &str,
) -> Result<User, AuthError> {
    use crate::schema::users::dsl;

    let user = dsl::users
        .filter(dsl::username.eq(username))
        .select(User::as_select())
        .first::<User>(conn)
        .optional()?
        .ok_or(AuthError::InvalidCredentials)?;

    if bcrypt::verify(password, &user.password_hash)? {
        Ok(user)
    } else {
        Err(AuthError::InvalidCredentials)
    }
}
