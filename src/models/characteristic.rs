//! Catalog of property features, grouped by category.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "characteristics")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub label: String,
    pub category: CharacteristicCategory,
    pub description: Option<String>,
    /// Unit for valued characteristics (e.g. "m²", "kWh/m²/an").
    pub unit: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum CharacteristicCategory {
    #[sea_orm(string_value = "interior")]
    Interior,
    #[sea_orm(string_value = "exterior")]
    Exterior,
    #[sea_orm(string_value = "security")]
    Security,
    #[sea_orm(string_value = "energy")]
    Energy,
    #[sea_orm(string_value = "comfort")]
    Comfort,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::property_characteristic::Entity")]
    PropertyCharacteristic,
}

impl Related<super::property_characteristic::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PropertyCharacteristic.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
