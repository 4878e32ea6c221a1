//! Order endpoints: the basket, confirmation and order history.
//! All of them require an authenticated user; the heavy lifting lives
//! in [`crate::orders`].

use axum::extract::{Path, State};
use axum::{
    Extension, Json, Router,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::middleware::jwt::AppUser;
use crate::orders::{self, BasketItemInput, OrderView};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders))
        .route(
            "/basket",
            get(get_basket).post(update_basket).delete(remove_basket_items),
        )
        .route("/confirm", post(confirm_order))
        .route("/{order_id}", get(get_order))
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SetBasketRequest {
    #[serde(default)]
    pub items: Vec<BasketItemInput>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RemoveBasketRequest {
    #[serde(default)]
    pub items: Vec<i32>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ConfirmRequest {
    pub contact_id: Option<i32>,
}

#[utoipa::path(
    get,
    path = "/orders/basket",
    tag = "orders",
    responses(
        (status = 200, description = "The user's basket, created on first access", body = OrderView),
        (status = 401, description = "Not authenticated")
    )
)]
#[tracing::instrument(name = "GET /orders/basket", skip(state, user))]
pub async fn get_basket(
    State(state): State<AppState>,
    Extension(user): Extension<AppUser>,
) -> Result<Json<OrderView>, ApiError> {
    let user_id = user.id()?;
    let basket = orders::get_or_create_basket(&state.db, user_id).await?;
    Ok(Json(orders::order_view(&state.db, basket).await?))
}

#[utoipa::path(
    post,
    path = "/orders/basket",
    tag = "orders",
    request_body = SetBasketRequest,
    responses(
        (status = 200, description = "Updated basket", body = OrderView),
        (status = 400, description = "Malformed items or unknown product offer"),
        (status = 401, description = "Not authenticated")
    )
)]
#[tracing::instrument(name = "POST /orders/basket", skip(state, user, payload))]
pub async fn update_basket(
    State(state): State<AppState>,
    Extension(user): Extension<AppUser>,
    Json(payload): Json<Value>,
) -> Result<Json<OrderView>, ApiError> {
    let user_id = user.id()?;
    let req: SetBasketRequest = serde_json::from_value(payload)?;
    Ok(Json(orders::set_items(&state.db, user_id, req.items).await?))
}

#[utoipa::path(
    delete,
    path = "/orders/basket",
    tag = "orders",
    request_body = RemoveBasketRequest,
    responses(
        (status = 200, description = "Updated basket", body = OrderView),
        (status = 400, description = "Malformed id list"),
        (status = 401, description = "Not authenticated")
    )
)]
#[tracing::instrument(name = "DELETE /orders/basket", skip(state, user, payload))]
pub async fn remove_basket_items(
    State(state): State<AppState>,
    Extension(user): Extension<AppUser>,
    Json(payload): Json<Value>,
) -> Result<Json<OrderView>, ApiError> {
    let user_id = user.id()?;
    let req: RemoveBasketRequest = serde_json::from_value(payload)?;
    Ok(Json(orders::remove_items(&state.db, user_id, req.items).await?))
}

#[utoipa::path(
    post,
    path = "/orders/confirm",
    tag = "orders",
    request_body = ConfirmRequest,
    responses(
        (status = 200, description = "The placed order", body = OrderView),
        (status = 400, description = "Empty basket, missing contact_id or foreign contact"),
        (status = 401, description = "Not authenticated")
    )
)]
#[tracing::instrument(name = "POST /orders/confirm", skip(state, user, payload))]
pub async fn confirm_order(
    State(state): State<AppState>,
    Extension(user): Extension<AppUser>,
    Json(payload): Json<Value>,
) -> Result<Json<OrderView>, ApiError> {
    let user_id = user.id()?;
    let req: ConfirmRequest = serde_json::from_value(payload)?;
    Ok(Json(
        orders::confirm(&state.db, &state.notifier, user_id, req.contact_id).await?,
    ))
}

#[tracing::instrument(name = "GET /orders", skip(state, user))]
pub async fn list_orders(
    State(state): State<AppState>,
    Extension(user): Extension<AppUser>,
) -> Result<Json<Vec<OrderView>>, ApiError> {
    let user_id = user.id()?;
    Ok(Json(orders::list_orders(&state.db, user_id).await?))
}

#[tracing::instrument(name = "GET /orders/{id}", skip(state, user))]
pub async fn get_order(
    State(state): State<AppState>,
    Extension(user): Extension<AppUser>,
    Path(order_id): Path<i32>,
) -> Result<Json<OrderView>, ApiError> {
    let user_id = user.id()?;
    Ok(Json(orders::get_order(&state.db, user_id, order_id).await?))
}
