//! The product-offer listing with its combinable query filters.
//!
//! Results are cached briefly per canonical filter string; the importer
//! is the only writer of catalog data and runs out of process, so a
//! short TTL is the consistency story here.

use std::collections::HashMap;

use axum::extract::{Query, State};
use axum::{Json, Router, routing::get};
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ColumnTrait, EntityTrait, JoinType, QueryFilter, QueryOrder, QuerySelect, RelationTrait,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::entity::{category, parameter, product, product_info, product_parameter, shop};
use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(list_offers))
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, IntoParams)]
pub struct OfferFilter {
    /// Only offers from this shop
    pub shop_id: Option<i32>,
    /// Only offers whose product is in this category
    pub category_id: Option<i32>,
    /// Case-insensitive product-name substring
    pub search: Option<String>,
    pub price_min: Option<i64>,
    pub price_max: Option<i64>,
    /// Truthy values ("1", "true", "yes", "on") keep only offers in stock
    pub in_stock: Option<String>,
    /// Combined with `value`: filter by a product parameter
    pub parameter: Option<String>,
    pub value: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OfferParameter {
    pub id: i32,
    pub parameter: i32,
    pub parameter_name: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OfferResponse {
    pub id: i32,
    pub model: String,
    pub price: i64,
    pub price_rrc: Option<i64>,
    pub quantity: i32,
    pub product: String,
    pub shop: String,
    pub category: String,
    pub parameters: Vec<OfferParameter>,
}

fn is_truthy(value: Option<&str>) -> bool {
    matches!(value, Some("1" | "true" | "True" | "yes" | "on"))
}

#[utoipa::path(
    get,
    path = "/products-info",
    tag = "catalog",
    params(OfferFilter),
    responses(
        (status = 200, description = "Product offers matching the filters", body = [OfferResponse])
    )
)]
#[tracing::instrument(name = "GET /products-info", skip(state))]
pub async fn list_offers(
    State(state): State<AppState>,
    Query(filter): Query<OfferFilter>,
) -> Result<Json<Vec<OfferResponse>>, ApiError> {
    let cache_key = serde_json::to_string(&filter)?;
    if let Some(cached) = state.get_cache::<Vec<OfferResponse>>(&cache_key) {
        return Ok(Json(cached));
    }

    let mut query = product_info::Entity::find()
        .join(JoinType::InnerJoin, product_info::Relation::Product.def());

    if let Some(shop_id) = filter.shop_id {
        query = query.filter(product_info::Column::ShopId.eq(shop_id));
    }
    if let Some(category_id) = filter.category_id {
        query = query.filter(product::Column::CategoryId.eq(category_id));
    }
    if let Some(search) = &filter.search {
        // lower() on both sides keeps the match case-insensitive on
        // every backend, not only the ones with ILIKE
        let needle = format!("%{}%", search.to_lowercase());
        query = query.filter(
            Expr::expr(Func::lower(Expr::col((
                product::Entity,
                product::Column::Name,
            ))))
            .like(needle),
        );
    }
    if let Some(price_min) = filter.price_min {
        query = query.filter(product_info::Column::Price.gte(price_min));
    }
    if let Some(price_max) = filter.price_max {
        query = query.filter(product_info::Column::Price.lte(price_max));
    }
    if is_truthy(filter.in_stock.as_deref()) {
        query = query.filter(product_info::Column::Quantity.gt(0));
    }
    if let (Some(name), Some(value)) = (&filter.parameter, &filter.value) {
        query = query
            .join(
                JoinType::InnerJoin,
                product_info::Relation::ProductParameter.def(),
            )
            .join(JoinType::InnerJoin, product_parameter::Relation::Parameter.def())
            .filter(parameter::Column::Name.eq(name.clone()))
            .filter(product_parameter::Column::Value.eq(value.clone()))
            .distinct();
    }

    let limit = filter.limit.unwrap_or(50).min(200);
    let offset = filter.offset.unwrap_or(0);
    let offers = query
        .order_by_asc(product_info::Column::Id)
        .limit(limit)
        .offset(offset)
        .all(&state.db)
        .await?;

    let response = assemble(&state, offers).await?;
    state.set_cache(cache_key, &response);
    Ok(Json(response))
}

/// Join the page of offers with their product, category, shop and
/// parameter names in a fixed number of batched queries.
async fn assemble(
    state: &AppState,
    offers: Vec<product_info::Model>,
) -> Result<Vec<OfferResponse>, ApiError> {
    let offer_ids: Vec<i32> = offers.iter().map(|o| o.id).collect();
    let product_ids: Vec<i32> = offers.iter().map(|o| o.product_id).collect();
    let shop_ids: Vec<i32> = offers.iter().map(|o| o.shop_id).collect();

    let products: HashMap<i32, product::Model> = product::Entity::find()
        .filter(product::Column::Id.is_in(product_ids))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let category_ids: Vec<i32> = products.values().map(|p| p.category_id).collect();
    let categories: HashMap<i32, String> = category::Entity::find()
        .filter(category::Column::Id.is_in(category_ids))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();

    let shops: HashMap<i32, String> = shop::Entity::find()
        .filter(shop::Column::Id.is_in(shop_ids))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|s| (s.id, s.name))
        .collect();

    let mut parameters_by_offer: HashMap<i32, Vec<OfferParameter>> = HashMap::new();
    for (link, name) in product_parameter::Entity::find()
        .filter(product_parameter::Column::ProductInfoId.is_in(offer_ids))
        .find_also_related(parameter::Entity)
        .all(&state.db)
        .await?
    {
        parameters_by_offer
            .entry(link.product_info_id)
            .or_default()
            .push(OfferParameter {
                id: link.id,
                parameter: link.parameter_id,
                parameter_name: name.map(|n| n.name).unwrap_or_default(),
                value: link.value,
            });
    }

    Ok(offers
        .into_iter()
        .map(|offer| {
            let product = products.get(&offer.product_id);
            OfferResponse {
                id: offer.id,
                model: offer.model,
                price: offer.price,
                price_rrc: offer.price_rrc,
                quantity: offer.quantity,
                product: product.map(|p| p.name.clone()).unwrap_or_default(),
                shop: shops.get(&offer.shop_id).cloned().unwrap_or_default(),
                category: product
                    .and_then(|p| categories.get(&p.category_id).cloned())
                    .unwrap_or_default(),
                parameters: parameters_by_offer.remove(&offer.id).unwrap_or_default(),
            }
        })
        .collect())
}
