use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A named characteristic of one product offer,
/// unique per (`product_info_id`, `parameter_id`)
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product_parameters")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub product_info_id: i32,
    pub parameter_id: i32,
    #[sea_orm(column_type = "Text")]
    pub value: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product_info::Entity",
        from = "Column::ProductInfoId",
        to = "super::product_info::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    ProductInfo,
    #[sea_orm(
        belongs_to = "super::parameter::Entity",
        from = "Column::ParameterId",
        to = "super::parameter::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Parameter,
}

impl Related<super::product_info::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductInfo.def()
    }
}

impl Related<super::parameter::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Parameter.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
