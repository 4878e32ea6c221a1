//! The basket/order engine.
//!
//! An order with status `basket` is the user's mutable cart. It is
//! created lazily on first access, mutated through [`set_items`] /
//! [`remove_items`], and turned into a placed order by [`confirm`],
//! which is the only status transition this module performs.
//!
//! Every mutating operation runs in a single transaction, and basket
//! uniqueness is backed by a partial unique index on
//! `orders (user_id) WHERE status = 'basket'`. A concurrent duplicate
//! insert surfaces as a unique violation and is resolved by re-reading.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, SqlErr, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::bad_request;
use crate::entity::sea_orm_active_enums::OrderStatus;
use crate::entity::{contact, order, order_item, product, product_info, shop};
use crate::error::ApiError;
use crate::notify::{Notifier, OrderPlaced};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct BasketItemInput {
    /// Product-offer id; required on every entry
    pub product_info: Option<i32>,
    /// Defaults to 1; zero or negative deletes the line
    pub quantity: Option<i32>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderItemView {
    pub id: i32,
    pub product_info: i32,
    pub product: String,
    pub shop: String,
    /// Unit price in minor currency units
    pub price: i64,
    pub quantity: i32,
    pub total_price: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderView {
    pub id: i32,
    pub user: i32,
    #[schema(value_type = String, example = "basket")]
    pub status: OrderStatus,
    pub contact: Option<i32>,
    pub ordered_items: Vec<OrderItemView>,
    pub total_sum: i64,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}

async fn find_basket<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
) -> Result<Option<order::Model>, DbErr> {
    order::Entity::find()
        .filter(order::Column::UserId.eq(user_id))
        .filter(order::Column::Status.eq(OrderStatus::Basket))
        .one(db)
        .await
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Look up the user's basket, creating an empty one when absent.
/// A concurrent first access loses the insert race against the partial
/// unique index and falls back to reading the winner's row.
pub async fn get_or_create_basket(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<order::Model, ApiError> {
    if let Some(basket) = find_basket(db, user_id).await? {
        return Ok(basket);
    }

    let now = Utc::now().naive_utc();
    let fresh = order::ActiveModel {
        user_id: Set(user_id),
        status: Set(OrderStatus::Basket),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    match fresh.insert(db).await {
        Ok(created) => Ok(created),
        Err(err) if is_unique_violation(&err) => find_basket(db, user_id)
            .await?
            .ok_or_else(|| ApiError::internal("basket vanished after unique violation")),
        Err(err) => Err(err.into()),
    }
}

/// Apply a batch of `{product_info, quantity}` entries to the basket.
///
/// Per entry: quantity <= 0 deletes the line when present, otherwise the
/// line is inserted or its stored quantity updated when it differs. The
/// whole batch commits atomically; a bad entry rolls back all of it.
/// Requested quantities are not checked against stock.
pub async fn set_items(
    db: &DatabaseConnection,
    user_id: i32,
    items: Vec<BasketItemInput>,
) -> Result<OrderView, ApiError> {
    if items.is_empty() {
        return Err(bad_request!("\"items\" must be a non-empty list"));
    }

    let basket = get_or_create_basket(db, user_id).await?;
    let basket_id = basket.id;

    db.transaction::<_, (), ApiError>(|txn| {
        Box::pin(async move {
            for entry in items {
                let Some(offer_id) = entry.product_info else {
                    return Err(bad_request!(
                        "every item needs a \"product_info\" reference"
                    ));
                };
                let quantity = entry.quantity.unwrap_or(1);

                let offer = product_info::Entity::find_by_id(offer_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| bad_request!("product info with id={} not found", offer_id))?;

                let existing = order_item::Entity::find()
                    .filter(order_item::Column::OrderId.eq(basket_id))
                    .filter(order_item::Column::ProductInfoId.eq(offer.id))
                    .one(txn)
                    .await?;

                if quantity <= 0 {
                    // zero or less removes the line, never stores a zero
                    if let Some(line) = existing {
                        line.delete(txn).await?;
                    }
                    continue;
                }

                match existing {
                    Some(line) if line.quantity == quantity => {}
                    Some(line) => {
                        let mut active: order_item::ActiveModel = line.into();
                        active.quantity = Set(quantity);
                        active.update(txn).await?;
                    }
                    None => {
                        order_item::ActiveModel {
                            order_id: Set(basket_id),
                            product_info_id: Set(offer.id),
                            quantity: Set(quantity),
                            ..Default::default()
                        }
                        .insert(txn)
                        .await?;
                    }
                }
            }
            Ok(())
        })
    })
    .await?;

    order_view_by_id(db, basket_id).await
}

/// Drop all basket lines whose product-offer id is in `ids`.
/// Ids without a matching line are silently ignored.
pub async fn remove_items(
    db: &DatabaseConnection,
    user_id: i32,
    ids: Vec<i32>,
) -> Result<OrderView, ApiError> {
    if ids.is_empty() {
        return Err(bad_request!(
            "\"items\" must be a non-empty list of product info ids"
        ));
    }

    let basket = get_or_create_basket(db, user_id).await?;

    order_item::Entity::delete_many()
        .filter(order_item::Column::OrderId.eq(basket.id))
        .filter(order_item::Column::ProductInfoId.is_in(ids))
        .exec(db)
        .await?;

    order_view_by_id(db, basket.id).await
}

/// Turn the basket into a placed order.
///
/// Preconditions, each a distinct failure: a basket row exists, it has
/// at least one line, a contact id was supplied, and the contact belongs
/// to the requesting user. On success the basket gets the contact, moves
/// to status `new` and the notifier is handed an [`OrderPlaced`] event,
/// fire-and-forget, after the transaction has committed.
pub async fn confirm(
    db: &DatabaseConnection,
    notifier: &Notifier,
    user_id: i32,
    contact_id: Option<i32>,
) -> Result<OrderView, ApiError> {
    let confirmed = db
        .transaction::<_, order::Model, ApiError>(|txn| {
            Box::pin(async move {
                let basket = find_basket(txn, user_id)
                    .await?
                    .ok_or_else(|| bad_request!("basket is empty"))?;

                let line_count = order_item::Entity::find()
                    .filter(order_item::Column::OrderId.eq(basket.id))
                    .count(txn)
                    .await?;
                if line_count == 0 {
                    return Err(bad_request!("cannot confirm an empty basket"));
                }

                let contact_id =
                    contact_id.ok_or_else(|| bad_request!("\"contact_id\" is required"))?;

                let contact = contact::Entity::find_by_id(contact_id)
                    .filter(contact::Column::UserId.eq(user_id))
                    .one(txn)
                    .await?
                    .ok_or_else(|| bad_request!("contact not found or not owned by you"))?;

                let mut active: order::ActiveModel = basket.into();
                active.contact_id = Set(Some(contact.id));
                active.status = Set(OrderStatus::New);
                active.updated_at = Set(Utc::now().naive_utc());
                Ok(active.update(txn).await?)
            })
        })
        .await?;

    notifier.order_placed(OrderPlaced {
        order_id: confirmed.id,
        user_id,
    });

    order_view(db, confirmed).await
}

/// All orders of the user, newest first (the basket included).
pub async fn list_orders(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<Vec<OrderView>, ApiError> {
    let rows = order::Entity::find()
        .filter(order::Column::UserId.eq(user_id))
        .order_by_desc(order::Column::CreatedAt)
        .all(db)
        .await?;

    let mut views = Vec::with_capacity(rows.len());
    for row in rows {
        views.push(order_view(db, row).await?);
    }
    Ok(views)
}

pub async fn get_order(
    db: &DatabaseConnection,
    user_id: i32,
    order_id: i32,
) -> Result<OrderView, ApiError> {
    let row = order::Entity::find_by_id(order_id)
        .filter(order::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| crate::not_found!("order with id={} not found", order_id))?;
    order_view(db, row).await
}

pub async fn order_view_by_id(db: &DatabaseConnection, order_id: i32) -> Result<OrderView, ApiError> {
    let row = order::Entity::find_by_id(order_id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::internal(format!("order {} disappeared", order_id)))?;
    order_view(db, row).await
}

/// Build the wire representation: lines joined with their offers,
/// denormalized product/shop names and the computed total.
pub async fn order_view(db: &DatabaseConnection, order: order::Model) -> Result<OrderView, ApiError> {
    let lines = order_item::Entity::find()
        .filter(order_item::Column::OrderId.eq(order.id))
        .find_also_related(product_info::Entity)
        .all(db)
        .await?;

    let product_ids: Vec<i32> = lines
        .iter()
        .filter_map(|(_, offer)| offer.as_ref().map(|o| o.product_id))
        .collect();
    let shop_ids: Vec<i32> = lines
        .iter()
        .filter_map(|(_, offer)| offer.as_ref().map(|o| o.shop_id))
        .collect();

    let product_names: HashMap<i32, String> = product::Entity::find()
        .filter(product::Column::Id.is_in(product_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|p| (p.id, p.name))
        .collect();
    let shop_names: HashMap<i32, String> = shop::Entity::find()
        .filter(shop::Column::Id.is_in(shop_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|s| (s.id, s.name))
        .collect();

    let mut items = Vec::with_capacity(lines.len());
    let mut total_sum = 0i64;
    for (line, offer) in lines {
        let Some(offer) = offer else { continue };
        let total_price = offer.price * i64::from(line.quantity);
        total_sum += total_price;
        items.push(OrderItemView {
            id: line.id,
            product_info: offer.id,
            product: product_names
                .get(&offer.product_id)
                .cloned()
                .unwrap_or_default(),
            shop: shop_names.get(&offer.shop_id).cloned().unwrap_or_default(),
            price: offer.price,
            quantity: line.quantity,
            total_price,
        });
    }

    Ok(OrderView {
        id: order.id,
        user: order.user_id,
        status: order.status,
        contact: order.contact_id,
        ordered_items: items,
        total_sum,
        created_at: order.created_at,
        updated_at: order.updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{category, user};
    use retail_hub_migration::{Migrator, MigratorTrait};
    use sea_orm::Database;

    async fn test_db() -> DatabaseConnection {
        // one pooled connection so every query sees the same :memory: db
        let mut opt = sea_orm::ConnectOptions::new("sqlite::memory:");
        opt.max_connections(1).sqlx_logging(false);
        let db = Database::connect(opt).await.expect("sqlite");
        Migrator::up(&db, None).await.expect("migrations");
        db
    }

    async fn seed_user(db: &DatabaseConnection, username: &str) -> user::Model {
        user::ActiveModel {
            username: Set(username.to_string()),
            email: Set(format!("{}@example.com", username)),
            password_hash: Set("irrelevant".to_string()),
            is_active: Set(true),
            created_at: Set(Utc::now().naive_utc()),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("user")
    }

    async fn seed_offer(db: &DatabaseConnection, external_id: i32, price: i64, stock: i32) -> product_info::Model {
        let shop = shop::ActiveModel {
            name: Set("Test shop".to_string()),
            url: Set(None),
            is_active: Set(true),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("shop");
        let category = category::ActiveModel {
            name: Set("Test category".to_string()),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("category");
        let product = product::ActiveModel {
            name: Set("Test product".to_string()),
            category_id: Set(category.id),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("product");
        product_info::ActiveModel {
            product_id: Set(product.id),
            shop_id: Set(shop.id),
            external_id: Set(external_id),
            model: Set("Model X".to_string()),
            quantity: Set(stock),
            price: Set(price),
            price_rrc: Set(Some(price + 200)),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("offer")
    }

    async fn seed_contact(db: &DatabaseConnection, user_id: i32) -> contact::Model {
        contact::ActiveModel {
            user_id: Set(user_id),
            city: Set("Springfield".to_string()),
            address: Set("742 Evergreen Terrace".to_string()),
            phone: Set("+1-555-0100".to_string()),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("contact")
    }

    fn entry(product_info: i32, quantity: i32) -> BasketItemInput {
        BasketItemInput {
            product_info: Some(product_info),
            quantity: Some(quantity),
        }
    }

    #[tokio::test]
    async fn basket_get_or_create_is_idempotent() {
        let db = test_db().await;
        let user = seed_user(&db, "alice").await;

        let first = get_or_create_basket(&db, user.id).await.unwrap();
        assert_eq!(first.status, OrderStatus::Basket);
        assert_eq!(first.contact_id, None);

        let second = get_or_create_basket(&db, user.id).await.unwrap();
        assert_eq!(first.id, second.id);

        let count = order::Entity::find()
            .filter(order::Column::UserId.eq(user.id))
            .count(&db)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn storage_rejects_a_second_basket_row() {
        let db = test_db().await;
        let user = seed_user(&db, "alice").await;
        get_or_create_basket(&db, user.id).await.unwrap();

        let now = Utc::now().naive_utc();
        let duplicate = order::ActiveModel {
            user_id: Set(user.id),
            status: Set(OrderStatus::Basket),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&db)
        .await;
        assert!(is_unique_violation(&duplicate.unwrap_err()));

        // the index is partial: any number of non-basket orders is fine
        order::ActiveModel {
            user_id: Set(user.id),
            status: Set(OrderStatus::New),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn set_items_upserts_without_duplicating_lines() {
        let db = test_db().await;
        let user = seed_user(&db, "alice").await;
        let offer = seed_offer(&db, 1, 1000, 10).await;

        let view = set_items(&db, user.id, vec![entry(offer.id, 2)]).await.unwrap();
        assert_eq!(view.ordered_items.len(), 1);
        assert_eq!(view.ordered_items[0].quantity, 2);
        assert_eq!(view.ordered_items[0].price, 1000);
        assert_eq!(view.ordered_items[0].product, "Test product");
        assert_eq!(view.ordered_items[0].shop, "Test shop");
        assert_eq!(view.total_sum, 2000);

        // same offer again updates in place instead of adding a row
        let view = set_items(&db, user.id, vec![entry(offer.id, 5)]).await.unwrap();
        assert_eq!(view.ordered_items.len(), 1);
        assert_eq!(view.ordered_items[0].quantity, 5);

        let line_count = order_item::Entity::find()
            .filter(order_item::Column::ProductInfoId.eq(offer.id))
            .count(&db)
            .await
            .unwrap();
        assert_eq!(line_count, 1);
    }

    #[tokio::test]
    async fn zero_quantity_for_an_absent_line_is_a_noop() {
        let db = test_db().await;
        let user = seed_user(&db, "alice").await;
        let offer = seed_offer(&db, 1, 1000, 10).await;

        let view = set_items(&db, user.id, vec![entry(offer.id, 0)]).await.unwrap();
        assert!(view.ordered_items.is_empty());
        assert_eq!(view.total_sum, 0);
    }

    #[tokio::test]
    async fn zero_quantity_removes_an_existing_line() {
        let db = test_db().await;
        let user = seed_user(&db, "alice").await;
        let offer = seed_offer(&db, 1, 1000, 10).await;

        set_items(&db, user.id, vec![entry(offer.id, 3)]).await.unwrap();
        let view = set_items(&db, user.id, vec![entry(offer.id, 0)]).await.unwrap();
        assert!(view.ordered_items.is_empty());

        let line_count = order_item::Entity::find().count(&db).await.unwrap();
        assert_eq!(line_count, 0);
    }

    #[tokio::test]
    async fn set_items_validates_its_input() {
        let db = test_db().await;
        let user = seed_user(&db, "alice").await;

        let err = set_items(&db, user.id, vec![]).await.unwrap_err();
        assert!(err.public_message().unwrap_or_default().contains("non-empty"));

        let err = set_items(
            &db,
            user.id,
            vec![BasketItemInput {
                product_info: None,
                quantity: Some(2),
            }],
        )
        .await
        .unwrap_err();
        assert!(err.public_message().unwrap_or_default().contains("product_info"));

        let err = set_items(&db, user.id, vec![entry(9999, 1)]).await.unwrap_err();
        assert!(err.public_message().unwrap_or_default().contains("not found"));
    }

    #[tokio::test]
    async fn a_bad_entry_rolls_back_the_whole_batch() {
        let db = test_db().await;
        let user = seed_user(&db, "alice").await;
        let offer = seed_offer(&db, 1, 1000, 10).await;

        let err = set_items(&db, user.id, vec![entry(offer.id, 2), entry(9999, 1)])
            .await
            .unwrap_err();
        assert!(err.public_message().unwrap_or_default().contains("not found"));

        // the valid first entry must not have been applied
        let line_count = order_item::Entity::find().count(&db).await.unwrap();
        assert_eq!(line_count, 0);
    }

    #[tokio::test]
    async fn stock_is_not_enforced() {
        let db = test_db().await;
        let user = seed_user(&db, "alice").await;
        let offer = seed_offer(&db, 1, 1000, 10).await;

        // requesting far more than the stock of 10 goes through untouched
        let view = set_items(&db, user.id, vec![entry(offer.id, 100)]).await.unwrap();
        assert_eq!(view.ordered_items[0].quantity, 100);
    }

    #[tokio::test]
    async fn remove_items_ignores_unknown_ids() {
        let db = test_db().await;
        let user = seed_user(&db, "alice").await;
        let first = seed_offer(&db, 1, 1000, 10).await;
        let second = seed_offer(&db, 2, 500, 10).await;

        set_items(&db, user.id, vec![entry(first.id, 1), entry(second.id, 2)])
            .await
            .unwrap();

        let view = remove_items(&db, user.id, vec![first.id, 424242]).await.unwrap();
        assert_eq!(view.ordered_items.len(), 1);
        assert_eq!(view.ordered_items[0].product_info, second.id);

        let err = remove_items(&db, user.id, vec![]).await.unwrap_err();
        assert!(err.public_message().unwrap_or_default().contains("non-empty"));
    }

    #[tokio::test]
    async fn confirm_requires_a_basket_with_items() {
        let db = test_db().await;
        let (notifier, mut rx) = Notifier::sink();
        let user = seed_user(&db, "alice").await;
        let contact = seed_contact(&db, user.id).await;

        // no basket row at all
        let err = confirm(&db, &notifier, user.id, Some(contact.id)).await.unwrap_err();
        assert_eq!(err.public_message(), Some("basket is empty"));

        // basket row exists but holds nothing
        get_or_create_basket(&db, user.id).await.unwrap();
        let err = confirm(&db, &notifier, user.id, Some(contact.id)).await.unwrap_err();
        assert_eq!(err.public_message(), Some("cannot confirm an empty basket"));

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn confirm_requires_an_owned_contact() {
        let db = test_db().await;
        let (notifier, mut rx) = Notifier::sink();
        let user = seed_user(&db, "alice").await;
        let other = seed_user(&db, "bob").await;
        let offer = seed_offer(&db, 1, 1000, 10).await;
        let foreign_contact = seed_contact(&db, other.id).await;

        set_items(&db, user.id, vec![entry(offer.id, 1)]).await.unwrap();

        let err = confirm(&db, &notifier, user.id, None).await.unwrap_err();
        assert!(err.public_message().unwrap_or_default().contains("contact_id"));

        let err = confirm(&db, &notifier, user.id, Some(foreign_contact.id))
            .await
            .unwrap_err();
        assert_eq!(err.public_message(), Some("contact not found or not owned by you"));

        // nothing changed and nothing was dispatched
        let basket = find_basket(&db, user.id).await.unwrap().unwrap();
        assert_eq!(basket.status, OrderStatus::Basket);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn confirm_places_the_order_and_dispatches_a_notification() {
        let db = test_db().await;
        let (notifier, mut rx) = Notifier::sink();
        let user = seed_user(&db, "alice").await;
        let offer = seed_offer(&db, 1, 1000, 10).await;
        let contact = seed_contact(&db, user.id).await;

        let basket = get_or_create_basket(&db, user.id).await.unwrap();
        assert_eq!(basket.status, OrderStatus::Basket);
        assert_eq!(basket.contact_id, None);

        let view = set_items(&db, user.id, vec![entry(offer.id, 2)]).await.unwrap();
        assert_eq!(view.ordered_items.len(), 1);
        assert_eq!(view.total_sum, 2 * 1000);

        let confirmed = confirm(&db, &notifier, user.id, Some(contact.id)).await.unwrap();
        assert_eq!(confirmed.id, basket.id);
        assert_eq!(confirmed.status, OrderStatus::New);
        assert_eq!(confirmed.contact, Some(contact.id));
        assert_eq!(confirmed.total_sum, 2000);

        let event = rx.try_recv().expect("a dispatched notification");
        assert_eq!(
            event,
            OrderPlaced {
                order_id: basket.id,
                user_id: user.id
            }
        );

        // the next basket access starts a fresh cart
        let next = get_or_create_basket(&db, user.id).await.unwrap();
        assert_ne!(next.id, basket.id);

        let orders = list_orders(&db, user.id).await.unwrap();
        assert_eq!(orders.len(), 2);
        assert!(orders.iter().any(|o| o.status == OrderStatus::New));
    }

    #[tokio::test]
    async fn orders_are_scoped_to_their_owner() {
        let db = test_db().await;
        let (notifier, _rx) = Notifier::sink();
        let user = seed_user(&db, "alice").await;
        let other = seed_user(&db, "bob").await;
        let offer = seed_offer(&db, 1, 1000, 10).await;
        let contact = seed_contact(&db, user.id).await;

        set_items(&db, user.id, vec![entry(offer.id, 1)]).await.unwrap();
        let confirmed = confirm(&db, &notifier, user.id, Some(contact.id)).await.unwrap();

        let err = get_order(&db, other.id, confirmed.id).await.unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::NOT_FOUND);

        assert!(list_orders(&db, other.id).await.unwrap().is_empty());
    }
}
