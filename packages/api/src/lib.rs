use axum::{Json, Router, middleware::from_fn_with_state, routing::get};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, decompression::RequestDecompressionLayer,
};

pub mod entity;
pub mod error;
pub mod jwt;
pub mod mail;
mod middleware;
pub mod notify;
pub mod openapi;
pub mod orders;
pub mod pricelist;
mod routes;
pub mod state;

pub use axum;
pub use sea_orm;

pub mod auth {
    pub use crate::middleware::jwt::AppUser;
}

use middleware::jwt::jwt_middleware;
use state::AppState;

pub fn construct_router(state: AppState) -> Router {
    let router = Router::new()
        .nest("/health", routes::health::routes())
        .nest("/auth", routes::auth::routes())
        .nest("/shops", routes::catalog::shop_routes())
        .nest("/categories", routes::catalog::category_routes())
        .nest("/products", routes::catalog::product_routes())
        .nest("/products-info", routes::products_info::routes())
        .nest("/orders", routes::order::routes())
        .nest("/contacts", routes::contact::routes())
        .route("/schema", get(openapi_schema))
        .with_state(state.clone())
        .layer(from_fn_with_state(state, jwt_middleware))
        .layer(CorsLayer::permissive())
        .layer(
            ServiceBuilder::new()
                .layer(RequestDecompressionLayer::new())
                .layer(CompressionLayer::new()),
        );

    Router::new().nest("/api/v1", router)
}

async fn openapi_schema() -> Json<utoipa::openapi::OpenApi> {
    Json(openapi::document())
}
