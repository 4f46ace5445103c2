//! Catalog removals and property characteristic associations.

use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, TransactionTrait,
};
use tracing::info;
use uuid::Uuid;

use super::LifecycleError;
use super::properties::ensure_owner_or_admin;
use crate::models::property_characteristic::{self, Model as PropertyCharacteristicModel};
use crate::models::user::Model as UserModel;
use crate::models::{Characteristic, PropertyCharacteristic, PropertyType};
use crate::repositories::{CharacteristicRepository, PropertyRepository};

/// Refused while any property still uses the type.
pub async fn delete_property_type(db: &DatabaseConnection, id: Uuid) -> Result<(), LifecycleError> {
    let txn = db.begin().await?;

    PropertyType::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or(LifecycleError::PropertyTypeNotFound(id))?;

    if PropertyRepository::new(&txn).count_by_type(id).await? > 0 {
        return Err(LifecycleError::InUse("property type".into()));
    }

    PropertyType::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    info!(property_type_id = %id, "Property type deleted");
    Ok(())
}

/// Refused while any property carries the characteristic.
pub async fn delete_characteristic(
    db: &DatabaseConnection,
    id: Uuid,
) -> Result<(), LifecycleError> {
    let txn = db.begin().await?;

    Characteristic::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or(LifecycleError::CharacteristicNotFound(id))?;

    let links = PropertyCharacteristic::find()
        .filter(property_characteristic::Column::CharacteristicId.eq(id))
        .count(&txn)
        .await?;
    if links > 0 {
        return Err(LifecycleError::InUse("characteristic".into()));
    }

    Characteristic::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    info!(characteristic_id = %id, "Characteristic deleted");
    Ok(())
}

/// Attaches `characteristic_id` to a property, replacing the value if it is already attached.
pub async fn set_property_characteristic(
    db: &DatabaseConnection,
    actor: &UserModel,
    property_id: Uuid,
    characteristic_id: Uuid,
    value: Option<String>,
) -> Result<PropertyCharacteristicModel, LifecycleError> {
    let txn = db.begin().await?;

    let property = PropertyRepository::new(&txn)
        .find_by_id(property_id)
        .await?
        .ok_or(LifecycleError::PropertyNotFound(property_id))?;
    ensure_owner_or_admin(actor, &property)?;

    let characteristics = CharacteristicRepository::new(&txn);
    characteristics
        .find_by_id(characteristic_id)
        .await?
        .ok_or(LifecycleError::CharacteristicNotFound(characteristic_id))?;

    let link = characteristics
        .upsert_link(property_id, characteristic_id, value)
        .await?;
    txn.commit().await?;
    Ok(link)
}

pub async fn remove_property_characteristic(
    db: &DatabaseConnection,
    actor: &UserModel,
    property_id: Uuid,
    characteristic_id: Uuid,
) -> Result<(), LifecycleError> {
    let txn = db.begin().await?;

    let property = PropertyRepository::new(&txn)
        .find_by_id(property_id)
        .await?
        .ok_or(LifecycleError::PropertyNotFound(property_id))?;
    ensure_owner_or_admin(actor, &property)?;

    if !CharacteristicRepository::new(&txn)
        .remove_link(property_id, characteristic_id)
        .await?
    {
        return Err(LifecycleError::CharacteristicNotFound(characteristic_id));
    }
    txn.commit().await?;
    Ok(())
}
