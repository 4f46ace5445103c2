//! Creates the properties table and the property/characteristic association.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Properties::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Properties::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Properties::Reference)
                            .text()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Properties::OwnerId).uuid().not_null())
                    .col(ColumnDef::new(Properties::AgentId).uuid().null())
                    .col(ColumnDef::new(Properties::PropertyTypeId).uuid().not_null())
                    .col(ColumnDef::new(Properties::Title).text().not_null())
                    .col(ColumnDef::new(Properties::Description).text().null())
                    .col(ColumnDef::new(Properties::Address).text().not_null())
                    .col(ColumnDef::new(Properties::PostalCode).text().not_null())
                    .col(ColumnDef::new(Properties::City).text().not_null())
                    .col(
                        ColumnDef::new(Properties::Country)
                            .text()
                            .not_null()
                            .default("France"),
                    )
                    .col(ColumnDef::new(Properties::LivingArea).double().not_null())
                    .col(ColumnDef::new(Properties::LandArea).double().null())
                    .col(ColumnDef::new(Properties::Rooms).integer().null())
                    .col(ColumnDef::new(Properties::Bedrooms).integer().null())
                    .col(ColumnDef::new(Properties::Bathrooms).integer().null())
                    .col(ColumnDef::new(Properties::YearBuilt).integer().null())
                    .col(
                        ColumnDef::new(Properties::Condition)
                            .text()
                            .not_null()
                            .default("good"),
                    )
                    .col(
                        ColumnDef::new(Properties::Status)
                            .text()
                            .not_null()
                            .default("available"),
                    )
                    .col(ColumnDef::new(Properties::SalePrice).double().null())
                    .col(ColumnDef::new(Properties::RentPrice).double().null())
                    .col(
                        ColumnDef::new(Properties::MonthlyCharges)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(ColumnDef::new(Properties::Deposit).double().null())
                    .col(
                        ColumnDef::new(Properties::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Properties::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_properties_owner_id")
                            .from(Properties::Table, Properties::OwnerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_properties_agent_id")
                            .from(Properties::Table, Properties::AgentId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_properties_property_type_id")
                            .from(Properties::Table, Properties::PropertyTypeId)
                            .to(PropertyTypes::Table, PropertyTypes::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        for (name, column) in [
            ("idx_properties_owner_id", Properties::OwnerId),
            ("idx_properties_status", Properties::Status),
            ("idx_properties_city", Properties::City),
        ] {
            manager
                .create_index(
                    Index::create()
                        .name(name)
                        .table(Properties::Table)
                        .col(column)
                        .to_owned(),
                )
                .await?;
        }

        manager
            .create_table(
                Table::create()
                    .table(PropertyCharacteristics::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PropertyCharacteristics::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PropertyCharacteristics::PropertyId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PropertyCharacteristics::CharacteristicId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PropertyCharacteristics::Value).text().null())
                    .col(
                        ColumnDef::new(PropertyCharacteristics::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(PropertyCharacteristics::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_property_characteristics_property_id")
                            .from(
                                PropertyCharacteristics::Table,
                                PropertyCharacteristics::PropertyId,
                            )
                            .to(Properties::Table, Properties::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_property_characteristics_characteristic_id")
                            .from(
                                PropertyCharacteristics::Table,
                                PropertyCharacteristics::CharacteristicId,
                            )
                            .to(Characteristics::Table, Characteristics::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_property_characteristics_pair")
                    .table(PropertyCharacteristics::Table)
                    .col(PropertyCharacteristics::PropertyId)
                    .col(PropertyCharacteristics::CharacteristicId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(PropertyCharacteristics::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Properties::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Properties {
    Table,
    Id,
    Reference,
    OwnerId,
    AgentId,
    PropertyTypeId,
    Title,
    Description,
    Address,
    PostalCode,
    City,
    Country,
    LivingArea,
    LandArea,
    Rooms,
    Bedrooms,
    Bathrooms,
    YearBuilt,
    Condition,
    Status,
    SalePrice,
    RentPrice,
    MonthlyCharges,
    Deposit,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PropertyCharacteristics {
    Table,
    Id,
    PropertyId,
    CharacteristicId,
    Value,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum PropertyTypes {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Characteristics {
    Table,
    Id,
}
