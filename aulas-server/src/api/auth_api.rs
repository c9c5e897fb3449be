use crate::auth::{authenticate_user, jwt::create_token, LoginRequest, LoginResponse, UserInfo};
use crate::AppState;
use axum::{extract::State, http::StatusCode, Json};

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, StatusCode> {
    if !state.login_limiter.try_acquire(&payload.username).await {
        tracing::warn!("Too many login attempts for {}", payload.username);
        return Err(StatusCode::TOO_MANY_REQUESTS);
    }

    let user = {
        let mut conn = state
            .db
            .get()
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        authenticate_user(&mut conn, &payload.username, &payload.password).map_err(|e| {
            let status = e.status_code();
            if status == StatusCode::UNAUTHORIZED {
                tracing::info!("Rejected login for {}", payload.username);
            } else {
                tracing::error!("Login for {} failed: {}", payload.username, e);
            }
            status
        })?
    };

    state.login_limiter.reset(&payload.username).await;

    let token = create_token(
        user.id,
        &user.username,
        &user.role,
        &state.config.jwt.secret,
        state.config.jwt.expiration_hours,
    )
    .map_err(|e| {
        tracing::error!("Token creation failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    tracing::info!("{} signed in ({})", user.username, user.role);

    Ok(Json(LoginResponse {
        token,
        user: UserInfo::from(&user),
    }))
}

/// Tokens are stateless; the client drops its copy.
pub async fn logout() -> StatusCode {
    StatusCode::OK
}
