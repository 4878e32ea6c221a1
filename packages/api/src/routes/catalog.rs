//! Read-only catalog endpoints: shops, categories and products.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::{Json, Router, routing::get};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entity::{category, product, product_info, shop};
use crate::error::ApiError;
use crate::not_found;
use crate::state::AppState;

pub fn shop_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_shops))
        .route("/{shop_id}", get(get_shop))
}

pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories))
        .route("/{category_id}", get(get_category))
}

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products))
        .route("/{product_id}", get(get_product))
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Page {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductResponse {
    pub id: i32,
    pub name: String,
    pub category: i32,
    /// Offers of this product across shops
    #[schema(value_type = Vec<Object>)]
    pub product_infos: Vec<product_info::Model>,
}

#[tracing::instrument(name = "GET /shops", skip(state))]
pub async fn list_shops(State(state): State<AppState>) -> Result<Json<Vec<shop::Model>>, ApiError> {
    let shops = shop::Entity::find()
        .order_by_asc(shop::Column::Id)
        .all(&state.db)
        .await?;
    Ok(Json(shops))
}

#[tracing::instrument(name = "GET /shops/{id}", skip(state))]
pub async fn get_shop(
    State(state): State<AppState>,
    Path(shop_id): Path<i32>,
) -> Result<Json<shop::Model>, ApiError> {
    let found = shop::Entity::find_by_id(shop_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| not_found!("shop with id={} not found", shop_id))?;
    Ok(Json(found))
}

#[tracing::instrument(name = "GET /categories", skip(state))]
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<category::Model>>, ApiError> {
    let categories = category::Entity::find()
        .order_by_asc(category::Column::Id)
        .all(&state.db)
        .await?;
    Ok(Json(categories))
}

#[tracing::instrument(name = "GET /categories/{id}", skip(state))]
pub async fn get_category(
    State(state): State<AppState>,
    Path(category_id): Path<i32>,
) -> Result<Json<category::Model>, ApiError> {
    let found = category::Entity::find_by_id(category_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| not_found!("category with id={} not found", category_id))?;
    Ok(Json(found))
}

#[tracing::instrument(name = "GET /products", skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
    Query(page): Query<Page>,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let limit = page.limit.unwrap_or(20).min(100);
    let offset = page.offset.unwrap_or(0);

    let products = product::Entity::find()
        .order_by_asc(product::Column::Id)
        .limit(limit)
        .offset(offset)
        .all(&state.db)
        .await?;

    let ids: Vec<i32> = products.iter().map(|p| p.id).collect();
    let mut offers_by_product: HashMap<i32, Vec<product_info::Model>> = HashMap::new();
    for offer in product_info::Entity::find()
        .filter(product_info::Column::ProductId.is_in(ids))
        .all(&state.db)
        .await?
    {
        offers_by_product.entry(offer.product_id).or_default().push(offer);
    }

    Ok(Json(
        products
            .into_iter()
            .map(|p| ProductResponse {
                id: p.id,
                name: p.name,
                category: p.category_id,
                product_infos: offers_by_product.remove(&p.id).unwrap_or_default(),
            })
            .collect(),
    ))
}

#[tracing::instrument(name = "GET /products/{id}", skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<i32>,
) -> Result<Json<ProductResponse>, ApiError> {
    let found = product::Entity::find_by_id(product_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| not_found!("product with id={} not found", product_id))?;

    let offers = product_info::Entity::find()
        .filter(product_info::Column::ProductId.eq(found.id))
        .all(&state.db)
        .await?;

    Ok(Json(ProductResponse {
        id: found.id,
        name: found.name,
        category: found.category_id,
        product_infos: offers,
    }))
}
