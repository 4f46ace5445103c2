//! # Contract Repository
//!
//! Read-side queries over rental contracts. Creation and status changes
//! live in the lifecycle module because they also move property status.

use chrono::{Duration, NaiveDate};
use sea_orm::sea_query::Query as SeaQuery;
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::contract::{self, Model as ContractModel};
use crate::models::{Contract, ContractStatus, property};

#[derive(Debug, Clone, Default)]
pub struct ContractFilter {
    pub status: Option<ContractStatus>,
    pub property_id: Option<Uuid>,
    pub tenant_id: Option<Uuid>,
    pub agent_id: Option<Uuid>,
    /// Only contracts on properties owned by this account.
    pub owner_id: Option<Uuid>,
}

pub struct ContractRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> ContractRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<ContractModel>, RepositoryError> {
        Contract::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Contracts matching `filter`, most recent start date first.
    pub async fn list(&self, filter: &ContractFilter) -> Result<Vec<ContractModel>, RepositoryError> {
        let mut query = Contract::find();
        if let Some(status) = filter.status {
            query = query.filter(contract::Column::Status.eq(status));
        }
        if let Some(property_id) = filter.property_id {
            query = query.filter(contract::Column::PropertyId.eq(property_id));
        }
        if let Some(tenant_id) = filter.tenant_id {
            query = query.filter(contract::Column::TenantId.eq(tenant_id));
        }
        if let Some(agent_id) = filter.agent_id {
            query = query.filter(contract::Column::AgentId.eq(agent_id));
        }
        if let Some(owner_id) = filter.owner_id {
            query = query.filter(
                contract::Column::PropertyId.in_subquery(
                    SeaQuery::select()
                        .column(property::Column::Id)
                        .from(property::Entity)
                        .and_where(property::Column::OwnerId.eq(owner_id))
                        .to_owned(),
                ),
            );
        }

        query
            .order_by_desc(contract::Column::StartDate)
            .order_by_desc(contract::Column::CreatedAt)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Active contracts whose end date falls within `days` of `today`, soonest first.
    pub async fn expiring(
        &self,
        today: NaiveDate,
        days: u32,
    ) -> Result<Vec<ContractModel>, RepositoryError> {
        let horizon = today + Duration::days(i64::from(days));
        Contract::find()
            .filter(contract::Column::Status.eq(ContractStatus::Active))
            .filter(contract::Column::EndDate.is_not_null())
            .filter(contract::Column::EndDate.gte(today))
            .filter(contract::Column::EndDate.lte(horizon))
            .order_by_asc(contract::Column::EndDate)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Active contracts on `property_id`, optionally ignoring one contract.
    pub async fn count_active_for_property(
        &self,
        property_id: Uuid,
        excluding: Option<Uuid>,
    ) -> Result<u64, RepositoryError> {
        let mut query = Contract::find()
            .filter(contract::Column::PropertyId.eq(property_id))
            .filter(contract::Column::Status.eq(ContractStatus::Active));
        if let Some(excluded) = excluding {
            query = query.filter(contract::Column::Id.ne(excluded));
        }
        query
            .count(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn count_for_property(&self, property_id: Uuid) -> Result<u64, RepositoryError> {
        Contract::find()
            .filter(contract::Column::PropertyId.eq(property_id))
            .count(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }
}
