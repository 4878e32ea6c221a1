//! OpenAPI document, served as JSON at `/api/v1/schema`.

use utoipa::OpenApi;

use crate::orders;
use crate::routes::{auth, health, order, products_info};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "retail-hub API",
        description = "Product catalog, basket and order confirmation endpoints"
    ),
    paths(
        health::health_db,
        auth::register,
        auth::token,
        auth::refresh,
        order::get_basket,
        order::update_basket,
        order::remove_basket_items,
        order::confirm_order,
        products_info::list_offers,
    ),
    components(schemas(
        health::DbStateResponse,
        auth::RegisterRequest,
        auth::UserResponse,
        auth::TokenRequest,
        auth::TokenPairResponse,
        auth::RefreshRequest,
        auth::AccessTokenResponse,
        order::SetBasketRequest,
        order::RemoveBasketRequest,
        order::ConfirmRequest,
        orders::BasketItemInput,
        orders::OrderItemView,
        orders::OrderView,
        products_info::OfferParameter,
        products_info::OfferResponse,
    )),
    tags(
        (name = "health"),
        (name = "auth"),
        (name = "catalog"),
        (name = "orders"),
    )
)]
pub struct ApiDoc;

pub fn document() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
