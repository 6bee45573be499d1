use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20240301_000002_create_customers_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Customers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Customers::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Customers::Name).string_len(100).not_null())
                    .col(
                        ColumnDef::new(Customers::IdentDocument)
                            .string_len(14)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Customers::BirthDate).date().null())
                    .col(ColumnDef::new(Customers::StreetName).string_len(40).not_null())
                    .col(ColumnDef::new(Customers::HouseNumber).string_len(10).not_null())
                    .col(ColumnDef::new(Customers::Complements).string_len(20).null())
                    .col(ColumnDef::new(Customers::District).string_len(25).not_null())
                    .col(ColumnDef::new(Customers::Municipality).string_len(40).not_null())
                    .col(ColumnDef::new(Customers::State).string_len(2).not_null())
                    .col(ColumnDef::new(Customers::Phone).string_len(20).not_null())
                    .col(ColumnDef::new(Customers::Email).string_len(100).not_null())
                    .col(
                        ColumnDef::new(Customers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Customers::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Customers::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub(crate) enum Customers {
    Table,
    Id,
    Name,
    IdentDocument,
    BirthDate,
    StreetName,
    HouseNumber,
    Complements,
    District,
    Municipality,
    State,
    Phone,
    Email,
    CreatedAt,
    UpdatedAt,
}
