//! # Visit Repository

use chrono::{DateTime, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::visit::{self, ActiveModel as VisitActiveModel, Model as VisitModel};
use crate::models::{Visit, VisitStatus};

#[derive(Debug, Clone, Default)]
pub struct VisitFilter {
    pub status: Option<VisitStatus>,
    pub property_id: Option<Uuid>,
    pub agent_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

pub struct VisitRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> VisitRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<VisitModel>, RepositoryError> {
        Visit::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Visits matching `filter` in schedule order.
    pub async fn list(&self, filter: &VisitFilter) -> Result<Vec<VisitModel>, RepositoryError> {
        let mut query = Visit::find();
        if let Some(status) = filter.status {
            query = query.filter(visit::Column::Status.eq(status));
        }
        if let Some(property_id) = filter.property_id {
            query = query.filter(visit::Column::PropertyId.eq(property_id));
        }
        if let Some(agent_id) = filter.agent_id {
            query = query.filter(visit::Column::AgentId.eq(agent_id));
        }
        if let Some(client_id) = filter.client_id {
            query = query.filter(visit::Column::ClientId.eq(client_id));
        }
        if let Some(from) = filter.from {
            query = query.filter(visit::Column::ScheduledAt.gte(DateTimeWithTimeZone::from(from)));
        }
        if let Some(to) = filter.to {
            query = query.filter(visit::Column::ScheduledAt.lte(DateTimeWithTimeZone::from(to)));
        }

        query
            .order_by_asc(visit::Column::ScheduledAt)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn insert(&self, model: VisitActiveModel) -> Result<VisitModel, RepositoryError> {
        model
            .insert(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn save(&self, model: VisitActiveModel) -> Result<VisitModel, RepositoryError> {
        model
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let result = Visit::delete_by_id(id)
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(result.rows_affected > 0)
    }
}
