//! # Property Repository
//!
//! Listing, searching, and aggregate queries over properties. Writes that
//! touch `status` go through the lifecycle rules instead of this module.

use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select,
};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::property::{self, ActiveModel as PropertyActiveModel, Model as PropertyModel};
use crate::models::{Property, PropertyStatus};

/// Filters shared by the listing and advanced search endpoints. Unset fields match anything.
#[derive(Debug, Clone, Default)]
pub struct PropertyFilter {
    pub property_type_id: Option<Uuid>,
    /// Case-insensitive substring of the city.
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub status: Option<PropertyStatus>,
    pub owner_id: Option<Uuid>,
    pub agent_id: Option<Uuid>,
    /// Matches when either the rent or the sale price falls within the bounds.
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub rent_min: Option<f64>,
    pub rent_max: Option<f64>,
    pub sale_min: Option<f64>,
    pub sale_max: Option<f64>,
    pub area_min: Option<f64>,
    pub area_max: Option<f64>,
    pub rooms_min: Option<i32>,
    pub bedrooms_min: Option<i32>,
}

impl PropertyFilter {
    fn apply(&self, mut query: Select<Property>) -> Select<Property> {
        if let Some(type_id) = self.property_type_id {
            query = query.filter(property::Column::PropertyTypeId.eq(type_id));
        }
        if let Some(city) = self.city.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            query = query.filter(
                Expr::expr(Func::lower(Expr::col(property::Column::City)))
                    .like(format!("%{}%", escape_like(&city.to_lowercase()))),
            );
        }
        if let Some(postal_code) = self.postal_code.as_deref() {
            query = query.filter(property::Column::PostalCode.eq(postal_code.trim()));
        }
        if let Some(status) = self.status {
            query = query.filter(property::Column::Status.eq(status));
        }
        if let Some(owner_id) = self.owner_id {
            query = query.filter(property::Column::OwnerId.eq(owner_id));
        }
        if let Some(agent_id) = self.agent_id {
            query = query.filter(property::Column::AgentId.eq(agent_id));
        }

        if self.price_min.is_some() || self.price_max.is_some() {
            query = query.filter(
                Condition::any()
                    .add(range(property::Column::RentPrice, self.price_min, self.price_max))
                    .add(range(property::Column::SalePrice, self.price_min, self.price_max)),
            );
        }
        if self.rent_min.is_some() || self.rent_max.is_some() {
            query = query.filter(range(property::Column::RentPrice, self.rent_min, self.rent_max));
        }
        if self.sale_min.is_some() || self.sale_max.is_some() {
            query = query.filter(range(property::Column::SalePrice, self.sale_min, self.sale_max));
        }
        if self.area_min.is_some() || self.area_max.is_some() {
            query = query.filter(range(property::Column::LivingArea, self.area_min, self.area_max));
        }
        if let Some(rooms) = self.rooms_min {
            query = query.filter(property::Column::Rooms.gte(rooms));
        }
        if let Some(bedrooms) = self.bedrooms_min {
            query = query.filter(property::Column::Bedrooms.gte(bedrooms));
        }
        query
    }
}

fn range(column: property::Column, min: Option<f64>, max: Option<f64>) -> Condition {
    let mut condition = Condition::all().add(column.is_not_null());
    if let Some(min) = min {
        condition = condition.add(column.gte(min));
    }
    if let Some(max) = max {
        condition = condition.add(column.lte(max));
    }
    condition
}

fn escape_like(value: &str) -> String {
    value.replace('%', "").replace('_', "")
}

/// One page of a listing plus the total match count.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u64 {
        if self.per_page == 0 {
            0
        } else {
            self.total.div_ceil(self.per_page)
        }
    }
}

/// Portfolio counters returned by the statistics endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyStats {
    pub total: u64,
    pub available: u64,
    pub rented: u64,
    pub sold: u64,
    pub by_type: Vec<(Uuid, u64)>,
    pub total_monthly_rent: f64,
    pub total_sale_value: f64,
}

pub struct PropertyRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> PropertyRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<PropertyModel>, RepositoryError> {
        Property::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn insert(&self, model: PropertyActiveModel) -> Result<PropertyModel, RepositoryError> {
        model
            .insert(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn save(&self, model: PropertyActiveModel) -> Result<PropertyModel, RepositoryError> {
        model
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Pages through matches, newest first. `page` is 1-based.
    pub async fn list(
        &self,
        filter: &PropertyFilter,
        page: u64,
        per_page: u64,
    ) -> Result<Page<PropertyModel>, RepositoryError> {
        let page = page.max(1);
        let per_page = per_page.max(1);
        let paginator = filter
            .apply(Property::find())
            .order_by_desc(property::Column::CreatedAt)
            .order_by_asc(property::Column::Id)
            .paginate(self.db, per_page);

        let total = paginator
            .num_items()
            .await
            .map_err(RepositoryError::database_error)?;
        let items = paginator
            .fetch_page(page - 1)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(Page {
            items,
            total,
            page,
            per_page,
        })
    }

    /// Every match, unpaged, newest first.
    pub async fn search(&self, filter: &PropertyFilter) -> Result<Vec<PropertyModel>, RepositoryError> {
        filter
            .apply(Property::find())
            .order_by_desc(property::Column::CreatedAt)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn by_owner(&self, owner_id: Uuid) -> Result<Vec<PropertyModel>, RepositoryError> {
        self.search(&PropertyFilter {
            owner_id: Some(owner_id),
            ..Default::default()
        })
        .await
    }

    pub async fn count_by_type(&self, property_type_id: Uuid) -> Result<u64, RepositoryError> {
        Property::find()
            .filter(property::Column::PropertyTypeId.eq(property_type_id))
            .count(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Sets `status` unconditionally. Callers own the lifecycle checks.
    pub async fn set_status(&self, id: Uuid, status: PropertyStatus) -> Result<u64, RepositoryError> {
        let result = Property::update_many()
            .col_expr(property::Column::Status, Expr::value(status))
            .col_expr(
                property::Column::UpdatedAt,
                Expr::value(DateTimeWithTimeZone::from(Utc::now())),
            )
            .filter(property::Column::Id.eq(id))
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(result.rows_affected)
    }

    /// Moves an available property to `rented`. Returns `false` when it was
    /// not available at the time of the write.
    pub async fn claim_for_rent(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let result = Property::update_many()
            .col_expr(property::Column::Status, Expr::value(PropertyStatus::Rented))
            .col_expr(
                property::Column::UpdatedAt,
                Expr::value(DateTimeWithTimeZone::from(Utc::now())),
            )
            .filter(property::Column::Id.eq(id))
            .filter(property::Column::Status.eq(PropertyStatus::Available))
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(result.rows_affected == 1)
    }

    /// Moves a rented property back to `available`. Properties in any other
    /// state are left alone. Returns whether a row changed.
    pub async fn release(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let result = Property::update_many()
            .col_expr(property::Column::Status, Expr::value(PropertyStatus::Available))
            .col_expr(
                property::Column::UpdatedAt,
                Expr::value(DateTimeWithTimeZone::from(Utc::now())),
            )
            .filter(property::Column::Id.eq(id))
            .filter(property::Column::Status.eq(PropertyStatus::Rented))
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(result.rows_affected == 1)
    }

    /// Aggregates over the whole portfolio, or one owner's when `owner_id` is set.
    pub async fn stats(&self, owner_id: Option<Uuid>) -> Result<PropertyStats, RepositoryError> {
        let scoped = || {
            let query = Property::find();
            match owner_id {
                Some(owner_id) => query.filter(property::Column::OwnerId.eq(owner_id)),
                None => query,
            }
        };

        let by_status: Vec<(PropertyStatus, i64)> = scoped()
            .select_only()
            .column(property::Column::Status)
            .column_as(property::Column::Id.count(), "count")
            .group_by(property::Column::Status)
            .into_tuple()
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        let by_type: Vec<(Uuid, i64)> = scoped()
            .select_only()
            .column(property::Column::PropertyTypeId)
            .column_as(property::Column::Id.count(), "count")
            .group_by(property::Column::PropertyTypeId)
            .into_tuple()
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        let rented_rent: Option<Option<f64>> = scoped()
            .select_only()
            .column_as(property::Column::RentPrice.sum(), "total")
            .filter(property::Column::Status.eq(PropertyStatus::Rented))
            .into_tuple()
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        let sale_value: Option<Option<f64>> = scoped()
            .select_only()
            .column_as(property::Column::SalePrice.sum(), "total")
            .into_tuple()
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        let mut stats = PropertyStats {
            total_monthly_rent: rented_rent.flatten().unwrap_or(0.0),
            total_sale_value: sale_value.flatten().unwrap_or(0.0),
            ..Default::default()
        };
        for (status, count) in by_status {
            let count = u64::try_from(count).unwrap_or(0);
            stats.total += count;
            match status {
                PropertyStatus::Available => stats.available = count,
                PropertyStatus::Rented => stats.rented = count,
                PropertyStatus::Sold => stats.sold = count,
                PropertyStatus::Reserved | PropertyStatus::Unavailable => {}
            }
        }
        stats.by_type = by_type
            .into_iter()
            .map(|(type_id, count)| (type_id, u64::try_from(count).unwrap_or(0)))
            .collect();
        stats.by_type.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_rounds_up() {
        let page = Page::<()> {
            items: vec![],
            total: 21,
            page: 1,
            per_page: 10,
        };
        assert_eq!(page.total_pages(), 3);
    }

    #[test]
    fn empty_listing_has_no_pages() {
        let page = Page::<()> {
            items: vec![],
            total: 0,
            page: 1,
            per_page: 10,
        };
        assert_eq!(page.total_pages(), 0);
    }

    #[test]
    fn like_wildcards_are_stripped() {
        assert_eq!(escape_like("pa%ri_s"), "paris");
    }
}
