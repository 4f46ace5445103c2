//! Creates the contracts and visits tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Contracts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Contracts::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Contracts::ContractNumber)
                            .text()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Contracts::PropertyId).uuid().not_null())
                    .col(ColumnDef::new(Contracts::TenantId).uuid().not_null())
                    .col(ColumnDef::new(Contracts::AgentId).uuid().null())
                    .col(ColumnDef::new(Contracts::StartDate).date().not_null())
                    .col(ColumnDef::new(Contracts::EndDate).date().null())
                    .col(
                        ColumnDef::new(Contracts::DurationMonths)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Contracts::MonthlyRent).double().not_null())
                    .col(
                        ColumnDef::new(Contracts::MonthlyCharges)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(ColumnDef::new(Contracts::Deposit).double().not_null())
                    .col(ColumnDef::new(Contracts::SpecialConditions).text().null())
                    .col(
                        ColumnDef::new(Contracts::Status)
                            .text()
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(Contracts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Contracts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_contracts_property_id")
                            .from(Contracts::Table, Contracts::PropertyId)
                            .to(Properties::Table, Properties::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_contracts_tenant_id")
                            .from(Contracts::Table, Contracts::TenantId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // Partial "one active contract per property" cannot be expressed
        // portably; the lifecycle rules enforce it with a conditional update.
        manager
            .create_index(
                Index::create()
                    .name("idx_contracts_property_status")
                    .table(Contracts::Table)
                    .col(Contracts::PropertyId)
                    .col(Contracts::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_contracts_tenant_id")
                    .table(Contracts::Table)
                    .col(Contracts::TenantId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Visits::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Visits::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Visits::PropertyId).uuid().not_null())
                    .col(ColumnDef::new(Visits::AgentId).uuid().not_null())
                    .col(ColumnDef::new(Visits::ClientId).uuid().null())
                    .col(
                        ColumnDef::new(Visits::ScheduledAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Visits::DurationMinutes)
                            .integer()
                            .not_null()
                            .default(60),
                    )
                    .col(
                        ColumnDef::new(Visits::Status)
                            .text()
                            .not_null()
                            .default("planned"),
                    )
                    .col(ColumnDef::new(Visits::Notes).text().null())
                    .col(ColumnDef::new(Visits::Outcome).text().null())
                    .col(
                        ColumnDef::new(Visits::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Visits::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_visits_property_id")
                            .from(Visits::Table, Visits::PropertyId)
                            .to(Properties::Table, Properties::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_visits_agent_id")
                            .from(Visits::Table, Visits::AgentId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_visits_scheduled_at")
                    .table(Visits::Table)
                    .col(Visits::ScheduledAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Visits::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Contracts::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Contracts {
    Table,
    Id,
    ContractNumber,
    PropertyId,
    TenantId,
    AgentId,
    StartDate,
    EndDate,
    DurationMonths,
    MonthlyRent,
    MonthlyCharges,
    Deposit,
    SpecialConditions,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Visits {
    Table,
    Id,
    PropertyId,
    AgentId,
    ClientId,
    ScheduledAt,
    DurationMinutes,
    Status,
    Notes,
    Outcome,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Properties {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}
