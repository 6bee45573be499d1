use sea_orm_migration::prelude::*;

use crate::m20240301_000001_create_users_table::Users;
use crate::m20240301_000002_create_customers_table::Customers;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20240301_000003_create_cars_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Cars::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Cars::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Cars::Brand).string_len(25).not_null())
                    .col(ColumnDef::new(Cars::Model).string_len(25).not_null())
                    .col(ColumnDef::new(Cars::Color).string_len(20).not_null())
                    .col(ColumnDef::new(Cars::YearManufacture).integer().not_null())
                    .col(ColumnDef::new(Cars::Imported).boolean().not_null())
                    .col(ColumnDef::new(Cars::Plates).string_len(8).not_null())
                    .col(
                        ColumnDef::new(Cars::SellingDate)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Cars::SellingPrice).decimal_len(12, 2).null())
                    .col(ColumnDef::new(Cars::CustomerId).integer().null())
                    .col(ColumnDef::new(Cars::CreatedUserId).integer().null())
                    .col(ColumnDef::new(Cars::UpdatedUserId).integer().null())
                    .col(
                        ColumnDef::new(Cars::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Cars::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_cars_customer_id")
                            .from(Cars::Table, Cars::CustomerId)
                            .to(Customers::Table, Customers::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_cars_created_user_id")
                            .from(Cars::Table, Cars::CreatedUserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_cars_updated_user_id")
                            .from(Cars::Table, Cars::UpdatedUserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Listing sorts on these columns
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_cars_brand_model")
                    .table(Cars::Table)
                    .col(Cars::Brand)
                    .col(Cars::Model)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Cars::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Cars {
    Table,
    Id,
    Brand,
    Model,
    Color,
    YearManufacture,
    Imported,
    Plates,
    SellingDate,
    SellingPrice,
    CustomerId,
    CreatedUserId,
    UpdatedUserId,
    CreatedAt,
    UpdatedAt,
}
