//! Property entity and its status/condition enums.
//!
//! `status` is `rented` exactly when an active contract references the
//! property; only the lifecycle rules move a property into or out of that
//! state.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "properties")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub reference: String,
    pub owner_id: Uuid,
    pub agent_id: Option<Uuid>,
    pub property_type_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub address: String,
    pub postal_code: String,
    pub city: String,
    pub country: String,
    /// Living area in m².
    pub living_area: f64,
    pub land_area: Option<f64>,
    pub rooms: Option<i32>,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub year_built: Option<i32>,
    pub condition: PropertyCondition,
    pub status: PropertyStatus,
    pub sale_price: Option<f64>,
    pub rent_price: Option<f64>,
    pub monthly_charges: f64,
    pub deposit: Option<f64>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum PropertyStatus {
    #[default]
    #[sea_orm(string_value = "available")]
    Available,
    #[sea_orm(string_value = "rented")]
    Rented,
    #[sea_orm(string_value = "sold")]
    Sold,
    #[sea_orm(string_value = "reserved")]
    Reserved,
    #[sea_orm(string_value = "unavailable")]
    Unavailable,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum PropertyCondition {
    #[sea_orm(string_value = "new")]
    New,
    #[sea_orm(string_value = "excellent")]
    Excellent,
    #[default]
    #[sea_orm(string_value = "good")]
    Good,
    #[sea_orm(string_value = "renovation")]
    Renovation,
    #[sea_orm(string_value = "works")]
    Works,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::OwnerId",
        to = "super::user::Column::Id"
    )]
    Owner,
    #[sea_orm(
        belongs_to = "super::property_type::Entity",
        from = "Column::PropertyTypeId",
        to = "super::property_type::Column::Id"
    )]
    PropertyType,
    #[sea_orm(has_many = "super::contract::Entity")]
    Contract,
    #[sea_orm(has_many = "super::visit::Entity")]
    Visit,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::property_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PropertyType.def()
    }
}

impl Related<super::contract::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contract.def()
    }
}

impl Related<super::visit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Visit.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
