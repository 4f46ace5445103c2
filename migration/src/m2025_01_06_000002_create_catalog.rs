//! Creates the property type and characteristic catalogs.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PropertyTypes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PropertyTypes::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PropertyTypes::Label)
                            .text()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(PropertyTypes::Description).text().null())
                    .col(
                        ColumnDef::new(PropertyTypes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(PropertyTypes::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Characteristics::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Characteristics::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Characteristics::Label).text().not_null())
                    .col(ColumnDef::new(Characteristics::Category).text().not_null())
                    .col(ColumnDef::new(Characteristics::Description).text().null())
                    .col(ColumnDef::new(Characteristics::Unit).text().null())
                    .col(
                        ColumnDef::new(Characteristics::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Characteristics::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_characteristics_label_category")
                    .table(Characteristics::Table)
                    .col(Characteristics::Label)
                    .col(Characteristics::Category)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_characteristics_label_category")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Characteristics::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(PropertyTypes::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum PropertyTypes {
    Table,
    Id,
    Label,
    Description,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Characteristics {
    Table,
    Id,
    Label,
    Category,
    Description,
    Unit,
    CreatedAt,
    UpdatedAt,
}
