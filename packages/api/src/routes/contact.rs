//! CRUD for the caller's shipping contacts.

use axum::extract::{Path, State};
use axum::{
    Extension, Json, Router,
    routing::{get, put},
};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, QueryOrder};
use serde::Deserialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::entity::contact;
use crate::error::ApiError;
use crate::middleware::jwt::AppUser;
use crate::not_found;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_contacts).post(create_contact))
        .route("/{contact_id}", put(update_contact).delete(delete_contact))
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ContactInput {
    pub city: String,
    pub address: String,
    pub phone: String,
}

#[tracing::instrument(name = "GET /contacts", skip(state, user))]
pub async fn list_contacts(
    State(state): State<AppState>,
    Extension(user): Extension<AppUser>,
) -> Result<Json<Vec<contact::Model>>, ApiError> {
    let user_id = user.id()?;
    let contacts = contact::Entity::find()
        .filter(contact::Column::UserId.eq(user_id))
        .order_by_asc(contact::Column::Id)
        .all(&state.db)
        .await?;
    Ok(Json(contacts))
}

#[tracing::instrument(name = "POST /contacts", skip(state, user, payload))]
pub async fn create_contact(
    State(state): State<AppState>,
    Extension(user): Extension<AppUser>,
    Json(payload): Json<Value>,
) -> Result<Json<contact::Model>, ApiError> {
    let user_id = user.id()?;
    let req: ContactInput = serde_json::from_value(payload)?;

    let created = contact::ActiveModel {
        user_id: Set(user_id),
        city: Set(req.city),
        address: Set(req.address),
        phone: Set(req.phone),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;
    Ok(Json(created))
}

#[tracing::instrument(name = "PUT /contacts/{id}", skip(state, user, payload))]
pub async fn update_contact(
    State(state): State<AppState>,
    Extension(user): Extension<AppUser>,
    Path(contact_id): Path<i32>,
    Json(payload): Json<Value>,
) -> Result<Json<contact::Model>, ApiError> {
    let user_id = user.id()?;
    let req: ContactInput = serde_json::from_value(payload)?;

    let existing = contact::Entity::find_by_id(contact_id)
        .filter(contact::Column::UserId.eq(user_id))
        .one(&state.db)
        .await?
        .ok_or_else(|| not_found!("contact with id={} not found", contact_id))?;

    let mut active: contact::ActiveModel = existing.into();
    active.city = Set(req.city);
    active.address = Set(req.address);
    active.phone = Set(req.phone);
    Ok(Json(active.update(&state.db).await?))
}

#[tracing::instrument(name = "DELETE /contacts/{id}", skip(state, user))]
pub async fn delete_contact(
    State(state): State<AppState>,
    Extension(user): Extension<AppUser>,
    Path(contact_id): Path<i32>,
) -> Result<Json<()>, ApiError> {
    let user_id = user.id()?;
    let existing = contact::Entity::find_by_id(contact_id)
        .filter(contact::Column::UserId.eq(user_id))
        .one(&state.db)
        .await?
        .ok_or_else(|| not_found!("contact with id={} not found", contact_id))?;

    existing.delete(&state.db).await?;
    Ok(Json(()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Notifier;
    use crate::state::State;
    use chrono::Utc;
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

    async fn seed_user(state: &AppState, username: &str) -> i32 {
        crate::entity::user::ActiveModel {
            username: Set(username.to_string()),
            email: Set(String::new()),
            password_hash: Set("irrelevant".to_string()),
            is_active: Set(true),
            created_at: Set(Utc::now().naive_utc()),
            ..Default::default()
        }
        .insert(&state.db)
        .await
        .expect("user")
        .id
    }

    fn as_user(id: i32) -> Extension<AppUser> {
        Extension(AppUser::Registered { id })
    }

    #[tokio::test]
    async fn contacts_are_scoped_to_their_owner() {
        let state = test_state().await;
        let alice = seed_user(&state, "alice").await;
        let bob = seed_user(&state, "bob").await;

        let Json(created) = create_contact(
            State(state.clone()),
            as_user(alice),
            Json(json!({"city": "Springfield", "address": "742 Evergreen Terrace", "phone": "+1-555-0100"})),
        )
        .await
        .unwrap();

        let Json(listed) = list_contacts(State(state.clone()), as_user(alice)).await.unwrap();
        assert_eq!(listed.len(), 1);

        let Json(listed) = list_contacts(State(state.clone()), as_user(bob)).await.unwrap();
        assert!(listed.is_empty());

        let err = update_contact(
            State(state.clone()),
            as_user(bob),
            Path(created.id),
            Json(json!({"city": "x", "address": "y", "phone": "z"})),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::NOT_FOUND);

        let Json(updated) = update_contact(
            State(state.clone()),
            as_user(alice),
            Path(created.id),
            Json(json!({"city": "Shelbyville", "address": "1 Main St", "phone": "+1-555-0101"})),
        )
        .await
        .unwrap();
        assert_eq!(updated.city, "Shelbyville");

        delete_contact(State(state.clone()), as_user(alice), Path(created.id))
            .await
            .unwrap();
        let Json(listed) = list_contacts(State(state.clone()), as_user(alice)).await.unwrap();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn anonymous_requests_are_rejected() {
        let state = test_state().await;
        let err = list_contacts(State(state.clone()), Extension(AppUser::Anonymous))
            .await
            .unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::UNAUTHORIZED);
    }
}
