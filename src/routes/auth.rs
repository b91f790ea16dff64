use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use mongodb::bson::doc;
use mongodb::error::{ErrorKind, WriteFailure};
use serde::Serialize;

use crate::auth::{
    hash_password, issue_token, require_auth, verify_password, CurrentUser,
};
use crate::error::{ApiError, ApiJson};
use crate::model::user::{LoginInput, RegisterInput, Role, User, UserResponse};
use crate::state::AppState;

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserResponse,
}

pub fn auth_router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login));
    let protected = Router::new()
        .route("/api/auth/me", get(me))
        .route_layer(middleware::from_fn_with_state(state, require_auth));
    public.merge(protected)
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_err)) if write_err.code == 11000
    )
}

async fn register(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<RegisterInput>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let (name, email, password) = input.validate().map_err(ApiError::Validation)?;

    if state
        .users()
        .find_one(doc! { "email": &email }, None)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict("User"));
    }

    let mut user = User {
        id: None,
        name,
        email,
        password_hash: hash_password(&password)?,
        role: Role::User,
        created_at: Utc::now(),
    };
    let inserted = state.users().insert_one(&user, None).await.map_err(|err| {
        // The unique index can still race the existence check above.
        if is_duplicate_key(&err) {
            ApiError::Conflict("User")
        } else {
            ApiError::Database(err)
        }
    })?;
    user.id = inserted.inserted_id.as_object_id();

    tracing::info!("registered user {}", user.email);
    Ok((StatusCode::CREATED, Json(user.into())))
}

async fn login(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<LoginInput>,
) -> Result<Json<LoginResponse>, ApiError> {
    let (email, password) = input.validate().map_err(ApiError::Validation)?;

    let user = state
        .users()
        .find_one(doc! { "email": &email }, None)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    if !verify_password(&password, &user.password_hash) {
        return Err(ApiError::InvalidCredentials);
    }

    let token = issue_token(&user, &state.config.jwt_secret, state.config.jwt_expiry_hours)?;
    tracing::info!("login for {}", user.email);
    Ok(Json(LoginResponse {
        token,
        user: user.into(),
    }))
}

async fn me(Extension(user): Extension<CurrentUser>) -> Json<UserResponse> {
    Json(UserResponse {
        id: user.id.to_hex(),
        name: user.name,
        email: user.email,
        role: user.role,
    })
}
