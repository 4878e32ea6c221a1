//! Registration and the JWT token pair endpoints.

use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::extract::State;
use axum::http::StatusCode;
use axum::{Json, Router, routing::post};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, SqlErr};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::bad_request;
use crate::entity::user;
use crate::error::ApiError;
use crate::jwt::TokenType;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/token", post(token))
        .route("/token/refresh", post(refresh))
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    #[serde(default)]
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: i32,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TokenRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TokenPairResponse {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AccessTokenResponse {
    pub access: String,
}

#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Malformed input or username taken")
    )
)]
#[tracing::instrument(name = "POST /auth/register", skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let req: RegisterRequest = serde_json::from_value(payload)?;

    let username = req.username.trim().to_string();
    if username.is_empty() {
        return Err(bad_request!("\"username\" must not be empty"));
    }
    if req.password.len() < 8 {
        return Err(bad_request!("password must be at least 8 characters"));
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| ApiError::internal(format!("password hashing failed: {}", e)))?
        .to_string();

    let created = user::ActiveModel {
        username: Set(username),
        email: Set(req.email),
        password_hash: Set(password_hash),
        is_active: Set(true),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(&state.db)
    .await;

    let created = match created {
        Ok(created) => created,
        Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            return Err(bad_request!("username already taken"));
        }
        Err(err) => return Err(err.into()),
    };

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            id: created.id,
            username: created.username,
            email: created.email,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/auth/token",
    tag = "auth",
    request_body = TokenRequest,
    responses(
        (status = 200, description = "Access and refresh token pair", body = TokenPairResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
#[tracing::instrument(name = "POST /auth/token", skip(state, payload))]
pub async fn token(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<Json<TokenPairResponse>, ApiError> {
    let req: TokenRequest = serde_json::from_value(payload)?;

    // one failure message for unknown user and wrong password alike
    let stored = user::Entity::find()
        .filter(user::Column::Username.eq(req.username))
        .filter(user::Column::IsActive.eq(true))
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::unauthorized("invalid username or password"))?;

    let parsed = PasswordHash::new(&stored.password_hash)
        .map_err(|_| ApiError::internal("stored password hash is malformed"))?;
    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed)
        .map_err(|_| ApiError::unauthorized("invalid username or password"))?;

    Ok(Json(TokenPairResponse {
        access: state.sign_token(stored.id, TokenType::Access)?,
        refresh: state.sign_token(stored.id, TokenType::Refresh)?,
    }))
}

#[utoipa::path(
    post,
    path = "/auth/token/refresh",
    tag = "auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Fresh access token", body = AccessTokenResponse),
        (status = 401, description = "Invalid or expired refresh token")
    )
)]
#[tracing::instrument(name = "POST /auth/token/refresh", skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<Json<AccessTokenResponse>, ApiError> {
    let req: RefreshRequest = serde_json::from_value(payload)?;
    let claims = state.validate_token(&req.refresh, TokenType::Refresh)?;
    Ok(Json(AccessTokenResponse {
        access: state.sign_token(claims.user_id()?, TokenType::Access)?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Notifier;
    use crate::state::State;
    use retail_hub_migration::{Migrator, MigratorTrait};
    use sea_orm::Database;
    use serde_json::json;
    use std::sync::Arc;

    async fn test_state() -> AppState {
        // one pooled connection so every query sees the same :memory: db
        let mut opt = sea_orm::ConnectOptions::new("sqlite::memory:");
        opt.max_connections(1).sqlx_logging(false);
        let db = Database::connect(opt).await.expect("sqlite");
        Migrator::up(&db, None).await.expect("migrations");
        let (notifier, _rx) = Notifier::sink();
        Arc::new(State::from_parts(db, "test-secret", notifier))
    }

    #[tokio::test]
    async fn register_then_login_then_refresh() {
        let state = test_state().await;

        let (status, Json(created)) = register(
            State(state.clone()),
            Json(json!({
                "username": "alice",
                "email": "alice@example.com",
                "password": "correct horse battery"
            })),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created.username, "alice");

        let Json(pair) = token(
            State(state.clone()),
            Json(json!({"username": "alice", "password": "correct horse battery"})),
        )
        .await
        .unwrap();

        let claims = state.validate_token(&pair.access, TokenType::Access).unwrap();
        assert_eq!(claims.user_id().unwrap(), created.id);

        let Json(fresh) = refresh(
            State(state.clone()),
            Json(json!({"refresh": pair.refresh})),
        )
        .await
        .unwrap();
        let claims = state.validate_token(&fresh.access, TokenType::Access).unwrap();
        assert_eq!(claims.user_id().unwrap(), created.id);
    }

    #[tokio::test]
    async fn register_rejects_duplicates_and_weak_passwords() {
        let state = test_state().await;

        let err = register(
            State(state.clone()),
            Json(json!({"username": "alice", "password": "short"})),
        )
        .await
        .unwrap_err();
        assert!(err.public_message().unwrap_or_default().contains("8 characters"));

        register(
            State(state.clone()),
            Json(json!({"username": "alice", "password": "long enough password"})),
        )
        .await
        .unwrap();

        let err = register(
            State(state.clone()),
            Json(json!({"username": "alice", "password": "long enough password"})),
        )
        .await
        .unwrap_err();
        assert_eq!(err.public_message(), Some("username already taken"));
    }

    #[tokio::test]
    async fn login_rejects_bad_credentials() {
        let state = test_state().await;
        register(
            State(state.clone()),
            Json(json!({"username": "alice", "password": "long enough password"})),
        )
        .await
        .unwrap();

        let err = token(
            State(state.clone()),
            Json(json!({"username": "alice", "password": "wrong password"})),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);

        let err = token(
            State(state.clone()),
            Json(json!({"username": "nobody", "password": "wrong password"})),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn refresh_rejects_an_access_token() {
        let state = test_state().await;
        register(
            State(state.clone()),
            Json(json!({"username": "alice", "password": "long enough password"})),
        )
        .await
        .unwrap();
        let Json(pair) = token(
            State(state.clone()),
            Json(json!({"username": "alice", "password": "long enough password"})),
        )
        .await
        .unwrap();

        let err = refresh(State(state.clone()), Json(json!({"refresh": pair.access})))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }
}
