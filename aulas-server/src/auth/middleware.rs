use crate::auth::jwt::verify_token;
use crate::models::User;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use diesel::prelude::*;

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Reloads the account behind a token. A token can outlive its user, and
/// a role change must take effect before the token expires.
fn load_user(state: &AppState, user_id: i32) -> Result<User, StatusCode> {
    use crate::schema::users::dsl::*;

    let mut conn = state.db.get().map_err(|e| {
        tracing::error!("No database connection for auth: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    users
        .filter(id.eq(user_id))
        .select(User::as_select())
        .first::<User>(&mut conn)
        .optional()
        .map_err(|e| {
            tracing::error!("Loading user {} failed: {}", user_id, e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or_else(|| {
            tracing::warn!("Token presented for deleted user {}", user_id);
            StatusCode::UNAUTHORIZED
        })
}

/// Puts the calling `User` into the request extensions. Handlers read it
/// with `Extension<User>` to scope subjects and to guard admin operations.
pub async fn auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = bearer_token(&headers).ok_or(StatusCode::UNAUTHORIZED)?;
    let claims =
        verify_token(token, &state.config.jwt.secret).map_err(|_| StatusCode::UNAUTHORIZED)?;

    // The pooled connection is released inside load_user, before the handler runs.
    let user = load_user(&state, claims.user_id)?;
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}
