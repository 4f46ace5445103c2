//! Property creation, edits and removal.

use chrono::Utc;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter, Set,
    TransactionTrait,
};
use tracing::info;
use uuid::Uuid;

use super::LifecycleError;
use crate::models::property::{self, Model as PropertyModel};
use crate::models::user::Model as UserModel;
use crate::models::{
    Property, PropertyCharacteristic, PropertyCondition, PropertyStatus, PropertyType, Role,
    Visit, property_characteristic, visit,
};
use crate::repositories::{ContractRepository, PropertyRepository, UserRepository, sequence};

const DEFAULT_COUNTRY: &str = "France";

#[derive(Debug, Clone, Default)]
pub struct NewProperty {
    /// Required when an agent or admin creates the listing; owners always own what they create.
    pub owner_id: Option<Uuid>,
    pub agent_id: Option<Uuid>,
    pub property_type_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub address: String,
    pub postal_code: String,
    pub city: String,
    pub country: Option<String>,
    pub living_area: f64,
    pub land_area: Option<f64>,
    pub rooms: Option<i32>,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub year_built: Option<i32>,
    pub condition: Option<PropertyCondition>,
    pub status: Option<PropertyStatus>,
    pub sale_price: Option<f64>,
    pub rent_price: Option<f64>,
    pub monthly_charges: Option<f64>,
    pub deposit: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct PropertyPatch {
    pub agent_id: Option<Uuid>,
    pub property_type_id: Option<Uuid>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub living_area: Option<f64>,
    pub land_area: Option<f64>,
    pub rooms: Option<i32>,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub year_built: Option<i32>,
    pub condition: Option<PropertyCondition>,
    pub status: Option<PropertyStatus>,
    pub sale_price: Option<f64>,
    pub rent_price: Option<f64>,
    pub monthly_charges: Option<f64>,
    pub deposit: Option<f64>,
}

/// `BIEN-<unix-millis>-<seq>`.
pub fn format_reference(unix_millis: i64, seq: i64) -> String {
    format!("BIEN-{unix_millis}-{seq}")
}

pub async fn create_property(
    db: &DatabaseConnection,
    actor: &UserModel,
    input: NewProperty,
) -> Result<PropertyModel, LifecycleError> {
    if input.status == Some(PropertyStatus::Rented) {
        return Err(LifecycleError::InvalidTransition(
            "a property becomes rented only through a contract".into(),
        ));
    }
    for (field, value) in [
        ("title", &input.title),
        ("address", &input.address),
        ("postal_code", &input.postal_code),
        ("city", &input.city),
    ] {
        require_text(field, value)?;
    }
    if input.living_area <= 0.0 {
        return Err(LifecycleError::Validation(
            "living_area must be positive".into(),
        ));
    }
    check_amounts(&[
        input.sale_price,
        input.rent_price,
        input.monthly_charges,
        input.deposit,
        input.land_area,
    ])?;

    let txn = db.begin().await?;
    let users = UserRepository::new(&txn);

    let owner_id = match actor.role {
        Role::Owner => actor.id,
        Role::Agent | Role::Admin => {
            let owner_id = input.owner_id.ok_or_else(|| {
                LifecycleError::Validation("owner_id is required".into())
            })?;
            users
                .find_by_id(owner_id)
                .await?
                .filter(|user| user.role == Role::Owner)
                .ok_or(LifecycleError::OwnerNotFound(owner_id))?
                .id
        }
        Role::Tenant => {
            return Err(LifecycleError::Forbidden(
                "tenants cannot list properties".into(),
            ));
        }
    };

    let agent_id = match (actor.role, input.agent_id) {
        (Role::Agent, _) => Some(actor.id),
        (_, Some(agent_id)) => Some(require_agent(&users, agent_id).await?),
        (_, None) => None,
    };

    PropertyType::find_by_id(input.property_type_id)
        .one(&txn)
        .await?
        .ok_or(LifecycleError::PropertyTypeNotFound(input.property_type_id))?;

    let now = Utc::now();
    let seq = sequence::next_value(&txn, "property").await?;

    let created = PropertyRepository::new(&txn)
        .insert(property::ActiveModel {
            id: Set(Uuid::new_v4()),
            reference: Set(format_reference(now.timestamp_millis(), seq)),
            owner_id: Set(owner_id),
            agent_id: Set(agent_id),
            property_type_id: Set(input.property_type_id),
            title: Set(input.title.trim().to_string()),
            description: Set(input.description),
            address: Set(input.address.trim().to_string()),
            postal_code: Set(input.postal_code.trim().to_string()),
            city: Set(input.city.trim().to_string()),
            country: Set(input
                .country
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_COUNTRY.to_string())),
            living_area: Set(input.living_area),
            land_area: Set(input.land_area),
            rooms: Set(input.rooms),
            bedrooms: Set(input.bedrooms),
            bathrooms: Set(input.bathrooms),
            year_built: Set(input.year_built),
            condition: Set(input.condition.unwrap_or_default()),
            status: Set(input.status.unwrap_or_default()),
            sale_price: Set(input.sale_price),
            rent_price: Set(input.rent_price),
            monthly_charges: Set(input.monthly_charges.unwrap_or(0.0)),
            deposit: Set(input.deposit),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        })
        .await?;

    txn.commit().await?;

    info!(
        property_id = %created.id,
        reference = %created.reference,
        owner_id = %created.owner_id,
        created_by = %actor.id,
        "Property created"
    );
    Ok(created)
}

/// Owner or admin only. `rented` can be neither set nor left by hand.
pub async fn update_property(
    db: &DatabaseConnection,
    actor: &UserModel,
    id: Uuid,
    patch: PropertyPatch,
) -> Result<PropertyModel, LifecycleError> {
    let txn = db.begin().await?;
    let properties = PropertyRepository::new(&txn);

    let existing = properties
        .find_by_id(id)
        .await?
        .ok_or(LifecycleError::PropertyNotFound(id))?;
    ensure_owner_or_admin(actor, &existing)?;

    if let Some(status) = patch.status
        && status != existing.status
    {
        if status == PropertyStatus::Rented {
            return Err(LifecycleError::InvalidTransition(
                "a property becomes rented only through a contract".into(),
            ));
        }
        let active = ContractRepository::new(&txn)
            .count_active_for_property(id, None)
            .await?;
        if active > 0 || existing.status == PropertyStatus::Rented {
            return Err(LifecycleError::InvalidTransition(
                "property has an active contract".into(),
            ));
        }
    }

    for (field, value) in [
        ("title", &patch.title),
        ("address", &patch.address),
        ("postal_code", &patch.postal_code),
        ("city", &patch.city),
    ] {
        if let Some(value) = value {
            require_text(field, value)?;
        }
    }
    if patch.living_area.is_some_and(|area| area <= 0.0) {
        return Err(LifecycleError::Validation(
            "living_area must be positive".into(),
        ));
    }
    check_amounts(&[
        patch.sale_price,
        patch.rent_price,
        patch.monthly_charges,
        patch.deposit,
        patch.land_area,
    ])?;

    if let Some(type_id) = patch.property_type_id {
        PropertyType::find_by_id(type_id)
            .one(&txn)
            .await?
            .ok_or(LifecycleError::PropertyTypeNotFound(type_id))?;
    }
    let agent_id = match patch.agent_id {
        Some(agent_id) => Some(require_agent(&UserRepository::new(&txn), agent_id).await?),
        None => None,
    };

    let previous_status = existing.status;
    let mut active = existing.into_active_model();
    if let Some(agent_id) = agent_id {
        active.agent_id = Set(Some(agent_id));
    }
    if let Some(type_id) = patch.property_type_id {
        active.property_type_id = Set(type_id);
    }
    if let Some(title) = patch.title {
        active.title = Set(title.trim().to_string());
    }
    if let Some(description) = patch.description {
        active.description = Set(Some(description));
    }
    if let Some(address) = patch.address {
        active.address = Set(address.trim().to_string());
    }
    if let Some(postal_code) = patch.postal_code {
        active.postal_code = Set(postal_code.trim().to_string());
    }
    if let Some(city) = patch.city {
        active.city = Set(city.trim().to_string());
    }
    if let Some(country) = patch.country {
        active.country = Set(country);
    }
    if let Some(living_area) = patch.living_area {
        active.living_area = Set(living_area);
    }
    if let Some(land_area) = patch.land_area {
        active.land_area = Set(Some(land_area));
    }
    if let Some(rooms) = patch.rooms {
        active.rooms = Set(Some(rooms));
    }
    if let Some(bedrooms) = patch.bedrooms {
        active.bedrooms = Set(Some(bedrooms));
    }
    if let Some(bathrooms) = patch.bathrooms {
        active.bathrooms = Set(Some(bathrooms));
    }
    if let Some(year_built) = patch.year_built {
        active.year_built = Set(Some(year_built));
    }
    if let Some(condition) = patch.condition {
        active.condition = Set(condition);
    }
    if let Some(status) = patch.status {
        active.status = Set(status);
    }
    if let Some(sale_price) = patch.sale_price {
        active.sale_price = Set(Some(sale_price));
    }
    if let Some(rent_price) = patch.rent_price {
        active.rent_price = Set(Some(rent_price));
    }
    if let Some(monthly_charges) = patch.monthly_charges {
        active.monthly_charges = Set(monthly_charges);
    }
    if let Some(deposit) = patch.deposit {
        active.deposit = Set(Some(deposit));
    }
    active.updated_at = Set(Utc::now().into());

    let updated = properties.save(active).await?;
    txn.commit().await?;

    if updated.status != previous_status {
        info!(
            property_id = %updated.id,
            from = ?previous_status,
            to = ?updated.status,
            actor_id = %actor.id,
            "Property status changed"
        );
    }
    Ok(updated)
}

/// Owner or admin only. Refused while any contract, past or present, references the property.
pub async fn delete_property(
    db: &DatabaseConnection,
    actor: &UserModel,
    id: Uuid,
) -> Result<(), LifecycleError> {
    let txn = db.begin().await?;

    let existing = PropertyRepository::new(&txn)
        .find_by_id(id)
        .await?
        .ok_or(LifecycleError::PropertyNotFound(id))?;
    ensure_owner_or_admin(actor, &existing)?;

    if ContractRepository::new(&txn).count_for_property(id).await? > 0 {
        return Err(LifecycleError::InUse("property".into()));
    }

    PropertyCharacteristic::delete_many()
        .filter(property_characteristic::Column::PropertyId.eq(id))
        .exec(&txn)
        .await?;
    Visit::delete_many()
        .filter(visit::Column::PropertyId.eq(id))
        .exec(&txn)
        .await?;
    Property::delete_by_id(id).exec(&txn).await?;

    txn.commit().await?;

    info!(property_id = %id, actor_id = %actor.id, "Property deleted");
    Ok(())
}

pub(crate) fn ensure_owner_or_admin(
    actor: &UserModel,
    property: &PropertyModel,
) -> Result<(), LifecycleError> {
    if actor.role == Role::Admin || property.owner_id == actor.id {
        Ok(())
    } else {
        Err(LifecycleError::Forbidden(
            "only the owner or an admin may change this property".into(),
        ))
    }
}

async fn require_agent<C: sea_orm::ConnectionTrait>(
    users: &UserRepository<'_, C>,
    agent_id: Uuid,
) -> Result<Uuid, LifecycleError> {
    users
        .find_by_id(agent_id)
        .await?
        .filter(|user| user.role == Role::Agent)
        .map(|user| user.id)
        .ok_or_else(|| LifecycleError::Validation("agent_id must reference an agent".into()))
}

fn require_text(field: &str, value: &str) -> Result<(), LifecycleError> {
    if value.trim().is_empty() {
        return Err(LifecycleError::Validation(format!("{field} is required")));
    }
    Ok(())
}

fn check_amounts(amounts: &[Option<f64>]) -> Result<(), LifecycleError> {
    if amounts
        .iter()
        .flatten()
        .any(|amount| !amount.is_finite() || *amount < 0.0)
    {
        return Err(LifecycleError::Validation(
            "amounts must be non-negative numbers".into(),
        ));
    }
    Ok(())
}
