//! Partner price-list import.
//!
//! Parses the YAML feed a shop supplies (`shop`, `categories`, `goods`)
//! and upserts it into the catalog inside one transaction: offers are
//! matched by (shop, external id), parameters by name. Goods pointing
//! at a category the feed does not declare are skipped with a warning.

use std::collections::{BTreeMap, HashMap};

use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, TransactionTrait,
};
use serde::Deserialize;

use crate::entity::{
    category, parameter, product, product_info, product_parameter, shop, shop_category,
};

#[derive(Debug, Clone, Deserialize)]
pub struct PriceList {
    pub shop: String,
    #[serde(default)]
    pub categories: Vec<PriceListCategory>,
    #[serde(default)]
    pub goods: Vec<PriceListGood>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceListCategory {
    /// Category id within the feed, referenced by `goods[].category`
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceListGood {
    /// The shop's own id for this offer
    pub id: i32,
    pub category: i32,
    #[serde(default)]
    pub model: String,
    pub name: String,
    /// Minor currency units
    pub price: i64,
    pub price_rrc: Option<i64>,
    #[serde(default)]
    pub quantity: i32,
    #[serde(default)]
    pub parameters: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub categories: u32,
    pub products: u32,
    pub offers: u32,
    pub parameters: u32,
}

pub fn parse(yaml: &str) -> Result<PriceList, serde_yaml::Error> {
    serde_yaml::from_str(yaml)
}

fn scalar_to_string(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        other => serde_yaml::to_string(other)
            .unwrap_or_default()
            .trim()
            .to_string(),
    }
}

pub async fn import(db: &DatabaseConnection, list: PriceList) -> Result<ImportStats, DbErr> {
    let result = db
        .transaction::<_, ImportStats, DbErr>(|txn| {
            Box::pin(async move {
                let mut stats = ImportStats::default();

                let shop_row = match shop::Entity::find()
                    .filter(shop::Column::Name.eq(list.shop.clone()))
                    .one(txn)
                    .await?
                {
                    Some(row) => row,
                    None => {
                        shop::ActiveModel {
                            name: Set(list.shop.clone()),
                            url: Set(None),
                            is_active: Set(true),
                            ..Default::default()
                        }
                        .insert(txn)
                        .await?
                    }
                };

                let mut categories_by_feed_id: HashMap<i32, category::Model> = HashMap::new();
                for entry in &list.categories {
                    let row = match category::Entity::find()
                        .filter(category::Column::Name.eq(entry.name.clone()))
                        .one(txn)
                        .await?
                    {
                        Some(row) => row,
                        None => {
                            stats.categories += 1;
                            category::ActiveModel {
                                name: Set(entry.name.clone()),
                                ..Default::default()
                            }
                            .insert(txn)
                            .await?
                        }
                    };

                    let linked = shop_category::Entity::find_by_id((shop_row.id, row.id))
                        .one(txn)
                        .await?;
                    if linked.is_none() {
                        shop_category::ActiveModel {
                            shop_id: Set(shop_row.id),
                            category_id: Set(row.id),
                        }
                        .insert(txn)
                        .await?;
                    }

                    categories_by_feed_id.insert(entry.id, row);
                }

                for good in &list.goods {
                    let Some(category_row) = categories_by_feed_id.get(&good.category) else {
                        tracing::warn!(
                            external_id = good.id,
                            category = good.category,
                            "good references an undeclared category, skipping"
                        );
                        continue;
                    };

                    let product_row = match product::Entity::find()
                        .filter(product::Column::Name.eq(good.name.clone()))
                        .filter(product::Column::CategoryId.eq(category_row.id))
                        .one(txn)
                        .await?
                    {
                        Some(row) => row,
                        None => {
                            stats.products += 1;
                            product::ActiveModel {
                                name: Set(good.name.clone()),
                                category_id: Set(category_row.id),
                                ..Default::default()
                            }
                            .insert(txn)
                            .await?
                        }
                    };

                    let existing_offer = product_info::Entity::find()
                        .filter(product_info::Column::ShopId.eq(shop_row.id))
                        .filter(product_info::Column::ExternalId.eq(good.id))
                        .one(txn)
                        .await?;

                    let offer = match existing_offer {
                        Some(row) => {
                            let mut active: product_info::ActiveModel = row.into();
                            active.product_id = Set(product_row.id);
                            active.model = Set(good.model.clone());
                            active.quantity = Set(good.quantity);
                            active.price = Set(good.price);
                            active.price_rrc = Set(good.price_rrc.or(Some(good.price)));
                            active.update(txn).await?
                        }
                        None => {
                            stats.offers += 1;
                            product_info::ActiveModel {
                                product_id: Set(product_row.id),
                                shop_id: Set(shop_row.id),
                                external_id: Set(good.id),
                                model: Set(good.model.clone()),
                                quantity: Set(good.quantity),
                                price: Set(good.price),
                                price_rrc: Set(good.price_rrc.or(Some(good.price))),
                                ..Default::default()
                            }
                            .insert(txn)
                            .await?
                        }
                    };

                    for (name, raw_value) in &good.parameters {
                        let parameter_row = match parameter::Entity::find()
                            .filter(parameter::Column::Name.eq(name.clone()))
                            .one(txn)
                            .await?
                        {
                            Some(row) => row,
                            None => {
                                stats.parameters += 1;
                                parameter::ActiveModel {
                                    name: Set(name.clone()),
                                    ..Default::default()
                                }
                                .insert(txn)
                                .await?
                            }
                        };

                        let value = scalar_to_string(raw_value);
                        let existing_link = product_parameter::Entity::find()
                            .filter(product_parameter::Column::ProductInfoId.eq(offer.id))
                            .filter(product_parameter::Column::ParameterId.eq(parameter_row.id))
                            .one(txn)
                            .await?;

                        match existing_link {
                            Some(link) if link.value == value => {}
                            Some(link) => {
                                let mut active: product_parameter::ActiveModel = link.into();
                                active.value = Set(value);
                                active.update(txn).await?;
                            }
                            None => {
                                product_parameter::ActiveModel {
                                    product_info_id: Set(offer.id),
                                    parameter_id: Set(parameter_row.id),
                                    value: Set(value),
                                    ..Default::default()
                                }
                                .insert(txn)
                                .await?;
                            }
                        }
                    }
                }

                Ok(stats)
            })
        })
        .await;

    result.map_err(|err| match err {
        sea_orm::TransactionError::Connection(e) => e,
        sea_orm::TransactionError::Transaction(e) => e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use retail_hub_migration::{Migrator, MigratorTrait};
    use sea_orm::{Database, PaginatorTrait};

    const FEED: &str = r#"
shop: Svyaznoy
categories:
  - id: 224
    name: Phones
  - id: 15
    name: Accessories
goods:
  - id: 4216292
    category: 224
    model: apple/iphone/xs-max
    name: iPhone XS Max 512GB (gold)
    price: 11000000
    price_rrc: 11699000
    quantity: 14
    parameters:
      "Screen size (inch)": 6.5
      "Color": gold
  - id: 4672670
    category: 15
    model: a-case
    name: Silicone case
    price: 150000
    quantity: 80
    parameters:
      "Color": black
"#;

    async fn test_db() -> DatabaseConnection {
        // one pooled connection so every query sees the same :memory: db
        let mut opt = sea_orm::ConnectOptions::new("sqlite::memory:");
        opt.max_connections(1).sqlx_logging(false);
        let db = Database::connect(opt).await.expect("sqlite");
        Migrator::up(&db, None).await.expect("migrations");
        db
    }

    #[test]
    fn feed_parses() {
        let list = parse(FEED).expect("parse");
        assert_eq!(list.shop, "Svyaznoy");
        assert_eq!(list.categories.len(), 2);
        assert_eq!(list.goods.len(), 2);
        // price_rrc falls back to price at import time, not parse time
        assert_eq!(list.goods[1].price_rrc, None);
        assert_eq!(
            scalar_to_string(&list.goods[0].parameters["Screen size (inch)"]),
            "6.5"
        );
    }

    #[tokio::test]
    async fn import_creates_and_reimport_updates() {
        let db = test_db().await;

        let stats = import(&db, parse(FEED).unwrap()).await.unwrap();
        assert_eq!(
            stats,
            ImportStats {
                categories: 2,
                products: 2,
                offers: 2,
                parameters: 2,
            }
        );

        // importing the same feed again creates nothing new
        let stats = import(&db, parse(FEED).unwrap()).await.unwrap();
        assert_eq!(stats, ImportStats::default());
        assert_eq!(product_info::Entity::find().count(&db).await.unwrap(), 2);
        assert_eq!(product::Entity::find().count(&db).await.unwrap(), 2);

        // a changed price lands on the existing offer
        let mut updated = parse(FEED).unwrap();
        updated.goods[0].price = 9000000;
        updated.goods[0].quantity = 3;
        import(&db, updated).await.unwrap();

        let offer = product_info::Entity::find()
            .filter(product_info::Column::ExternalId.eq(4216292))
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(offer.price, 9000000);
        assert_eq!(offer.quantity, 3);

        // the missing price_rrc defaulted to the price
        let case = product_info::Entity::find()
            .filter(product_info::Column::ExternalId.eq(4672670))
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(case.price_rrc, Some(150000));
    }
}
