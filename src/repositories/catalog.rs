//! # Catalog Repositories
//!
//! Property types, characteristics, and the characteristic values attached
//! to individual properties.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::{
    Characteristic, CharacteristicCategory, PropertyCharacteristic, PropertyType, characteristic,
    property_characteristic, property_type,
};

#[derive(Debug, Clone)]
pub struct PropertyTypeInput {
    pub label: String,
    pub description: Option<String>,
}

pub struct PropertyTypeRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> PropertyTypeRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> Result<Vec<property_type::Model>, RepositoryError> {
        PropertyType::find()
            .order_by_asc(property_type::Column::Label)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn find_by_id(
        &self,
        id: Uuid,
    ) -> Result<Option<property_type::Model>, RepositoryError> {
        PropertyType::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn find_by_label(
        &self,
        label: &str,
    ) -> Result<Option<property_type::Model>, RepositoryError> {
        PropertyType::find()
            .filter(property_type::Column::Label.eq(label.trim()))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn create(
        &self,
        input: PropertyTypeInput,
    ) -> Result<property_type::Model, RepositoryError> {
        let label = required_label(&input.label)?;
        if self.find_by_label(&label).await?.is_some() {
            return Err(RepositoryError::conflict("property type label already exists"));
        }

        let now = Utc::now();
        property_type::ActiveModel {
            id: Set(Uuid::new_v4()),
            label: Set(label),
            description: Set(input.description),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(self.db)
        .await
        .map_err(RepositoryError::database_error)
    }

    pub async fn update(
        &self,
        id: Uuid,
        input: PropertyTypeInput,
    ) -> Result<property_type::Model, RepositoryError> {
        let existing = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Property type"))?;
        let label = required_label(&input.label)?;
        if label != existing.label
            && self
                .find_by_label(&label)
                .await?
                .is_some_and(|other| other.id != id)
        {
            return Err(RepositoryError::conflict("property type label already exists"));
        }

        let mut active = existing.into_active_model();
        active.label = Set(label);
        active.description = Set(input.description);
        active.updated_at = Set(Utc::now().into());
        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }
}

#[derive(Debug, Clone)]
pub struct CharacteristicInput {
    pub label: String,
    pub category: CharacteristicCategory,
    pub description: Option<String>,
    pub unit: Option<String>,
}

pub struct CharacteristicRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> CharacteristicRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// Lists characteristics ordered by category then label.
    pub async fn list(
        &self,
        category: Option<CharacteristicCategory>,
    ) -> Result<Vec<characteristic::Model>, RepositoryError> {
        let mut query = Characteristic::find();
        if let Some(category) = category {
            query = query.filter(characteristic::Column::Category.eq(category));
        }
        query
            .order_by_asc(characteristic::Column::Category)
            .order_by_asc(characteristic::Column::Label)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Categories that currently have at least one characteristic.
    pub async fn categories(&self) -> Result<Vec<CharacteristicCategory>, RepositoryError> {
        let mut categories = Characteristic::find()
            .select_only()
            .column(characteristic::Column::Category)
            .distinct()
            .into_tuple::<CharacteristicCategory>()
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        categories.sort();
        Ok(categories)
    }

    pub async fn find_by_id(
        &self,
        id: Uuid,
    ) -> Result<Option<characteristic::Model>, RepositoryError> {
        Characteristic::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    async fn find_by_label(
        &self,
        label: &str,
        category: CharacteristicCategory,
    ) -> Result<Option<characteristic::Model>, RepositoryError> {
        Characteristic::find()
            .filter(characteristic::Column::Label.eq(label))
            .filter(characteristic::Column::Category.eq(category))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn create(
        &self,
        input: CharacteristicInput,
    ) -> Result<characteristic::Model, RepositoryError> {
        let label = required_label(&input.label)?;
        if self.find_by_label(&label, input.category).await?.is_some() {
            return Err(RepositoryError::conflict(
                "characteristic already exists in this category",
            ));
        }

        let now = Utc::now();
        characteristic::ActiveModel {
            id: Set(Uuid::new_v4()),
            label: Set(label),
            category: Set(input.category),
            description: Set(input.description),
            unit: Set(input.unit),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(self.db)
        .await
        .map_err(RepositoryError::database_error)
    }

    pub async fn update(
        &self,
        id: Uuid,
        input: CharacteristicInput,
    ) -> Result<characteristic::Model, RepositoryError> {
        let existing = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Characteristic"))?;
        let label = required_label(&input.label)?;
        if self
            .find_by_label(&label, input.category)
            .await?
            .is_some_and(|other| other.id != id)
        {
            return Err(RepositoryError::conflict(
                "characteristic already exists in this category",
            ));
        }

        let mut active = existing.into_active_model();
        active.label = Set(label);
        active.category = Set(input.category);
        active.description = Set(input.description);
        active.unit = Set(input.unit);
        active.updated_at = Set(Utc::now().into());
        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Characteristics attached to a property, with their values.
    pub async fn for_property(
        &self,
        property_id: Uuid,
    ) -> Result<Vec<(property_characteristic::Model, characteristic::Model)>, RepositoryError>
    {
        let rows = PropertyCharacteristic::find()
            .filter(property_characteristic::Column::PropertyId.eq(property_id))
            .find_also_related(Characteristic)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        let mut attached: Vec<_> = rows
            .into_iter()
            .filter_map(|(link, characteristic)| characteristic.map(|c| (link, c)))
            .collect();
        attached.sort_by(|(_, a), (_, b)| {
            a.category.cmp(&b.category).then_with(|| a.label.cmp(&b.label))
        });
        Ok(attached)
    }

    pub async fn find_link(
        &self,
        property_id: Uuid,
        characteristic_id: Uuid,
    ) -> Result<Option<property_characteristic::Model>, RepositoryError> {
        PropertyCharacteristic::find()
            .filter(property_characteristic::Column::PropertyId.eq(property_id))
            .filter(property_characteristic::Column::CharacteristicId.eq(characteristic_id))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Attaches a characteristic, or replaces the value when already attached.
    pub async fn upsert_link(
        &self,
        property_id: Uuid,
        characteristic_id: Uuid,
        value: Option<String>,
    ) -> Result<property_characteristic::Model, RepositoryError> {
        let now = Utc::now();
        match self.find_link(property_id, characteristic_id).await? {
            Some(existing) => {
                let mut active = existing.into_active_model();
                active.value = Set(value);
                active.updated_at = Set(now.into());
                active.update(self.db).await
            }
            None => {
                property_characteristic::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    property_id: Set(property_id),
                    characteristic_id: Set(characteristic_id),
                    value: Set(value),
                    created_at: Set(now.into()),
                    updated_at: Set(now.into()),
                }
                .insert(self.db)
                .await
            }
        }
        .map_err(RepositoryError::database_error)
    }

    pub async fn remove_link(
        &self,
        property_id: Uuid,
        characteristic_id: Uuid,
    ) -> Result<bool, RepositoryError> {
        let result = PropertyCharacteristic::delete_many()
            .filter(property_characteristic::Column::PropertyId.eq(property_id))
            .filter(property_characteristic::Column::CharacteristicId.eq(characteristic_id))
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(result.rows_affected > 0)
    }
}

fn required_label(label: &str) -> Result<String, RepositoryError> {
    let label = label.trim();
    if label.is_empty() {
        return Err(RepositoryError::validation_error("label is required"));
    }
    Ok(label.to_string())
}
