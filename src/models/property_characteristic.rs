//! Association between a property and a catalog characteristic, with an
//! optional free-form value (e.g. "120" for a surface, "A" for an energy class).

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "property_characteristics")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub property_id: Uuid,
    pub characteristic_id: Uuid,
    pub value: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::property::Entity",
        from = "Column::PropertyId",
        to = "super::property::Column::Id"
    )]
    Property,
    #[sea_orm(
        belongs_to = "super::characteristic::Entity",
        from = "Column::CharacteristicId",
        to = "super::characteristic::Column::Id"
    )]
    Characteristic,
}

impl Related<super::property::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Property.def()
    }
}

impl Related<super::characteristic::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Characteristic.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
