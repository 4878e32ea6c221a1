use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Shops::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Shops::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Shops::Name).text().not_null())
                    .col(ColumnDef::new(Shops::Url).text().null())
                    .col(
                        ColumnDef::new(Shops::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Categories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Categories::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Categories::Name).text().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ShopCategories::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ShopCategories::ShopId).integer().not_null())
                    .col(
                        ColumnDef::new(ShopCategories::CategoryId)
                            .integer()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(ShopCategories::ShopId)
                            .col(ShopCategories::CategoryId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_shop_categories_shop")
                            .from(ShopCategories::Table, ShopCategories::ShopId)
                            .to(Shops::Table, Shops::Id)
                            .on_update(ForeignKeyAction::Cascade)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_shop_categories_category")
                            .from(ShopCategories::Table, ShopCategories::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_update(ForeignKeyAction::Cascade)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Products::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Products::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Products::Name).text().not_null())
                    .col(ColumnDef::new(Products::CategoryId).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_products_category")
                            .from(Products::Table, Products::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_update(ForeignKeyAction::Cascade)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ProductInfos::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProductInfos::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ProductInfos::ProductId).integer().not_null())
                    .col(ColumnDef::new(ProductInfos::ShopId).integer().not_null())
                    .col(
                        ColumnDef::new(ProductInfos::ExternalId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProductInfos::Model)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(ProductInfos::Quantity)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(ProductInfos::Price).big_integer().not_null())
                    .col(ColumnDef::new(ProductInfos::PriceRrc).big_integer().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_product_infos_product")
                            .from(ProductInfos::Table, ProductInfos::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_update(ForeignKeyAction::Cascade)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_product_infos_shop")
                            .from(ProductInfos::Table, ProductInfos::ShopId)
                            .to(Shops::Table, Shops::Id)
                            .on_update(ForeignKeyAction::Cascade)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ux_product_infos_shop_external")
                    .table(ProductInfos::Table)
                    .col(ProductInfos::ShopId)
                    .col(ProductInfos::ExternalId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Parameters::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Parameters::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Parameters::Name)
                            .text()
                            .not_null()
                            .unique_key(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ProductParameters::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProductParameters::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ProductParameters::ProductInfoId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProductParameters::ParameterId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ProductParameters::Value).text().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_product_parameters_product_info")
                            .from(ProductParameters::Table, ProductParameters::ProductInfoId)
                            .to(ProductInfos::Table, ProductInfos::Id)
                            .on_update(ForeignKeyAction::Cascade)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_product_parameters_parameter")
                            .from(ProductParameters::Table, ProductParameters::ParameterId)
                            .to(Parameters::Table, Parameters::Id)
                            .on_update(ForeignKeyAction::Cascade)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ux_product_parameters_pair")
                    .table(ProductParameters::Table)
                    .col(ProductParameters::ProductInfoId)
                    .col(ProductParameters::ParameterId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ProductParameters::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Parameters::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProductInfos::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Products::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ShopCategories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Categories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Shops::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Shops {
    Table,
    Id,
    Name,
    Url,
    IsActive,
}

#[derive(DeriveIden)]
enum Categories {
    Table,
    Id,
    Name,
}

#[derive(DeriveIden)]
enum ShopCategories {
    Table,
    ShopId,
    CategoryId,
}

#[derive(DeriveIden)]
enum Products {
    Table,
    Id,
    Name,
    CategoryId,
}

#[derive(DeriveIden)]
enum ProductInfos {
    Table,
    Id,
    ProductId,
    ShopId,
    ExternalId,
    Model,
    Quantity,
    Price,
    PriceRrc,
}

#[derive(DeriveIden)]
enum Parameters {
    Table,
    Id,
    Name,
}

#[derive(DeriveIden)]
enum ProductParameters {
    Table,
    Id,
    ProductInfoId,
    ParameterId,
    Value,
}
