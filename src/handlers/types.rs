//! # Common API Types
//!
//! Response bodies shared across handlers, and the conversions from
//! database models into them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{
    CharacteristicCategory, ContractStatus, PropertyCondition, PropertyStatus, Role, UserStatus,
    VisitOutcome, VisitStatus, characteristic, contract, property, property_characteristic,
    property_type, user, visit,
};
use crate::repositories::Page;

/// Page-numbered list response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    /// Number of matches across all pages
    pub total: u64,
    /// 1-based page number
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

impl<T> PaginatedResponse<T> {
    pub fn from_page<M>(page: Page<M>) -> Self
    where
        T: From<M>,
    {
        let total_pages = page.total_pages();
        Self {
            data: page.items.into_iter().map(T::from).collect(),
            total: page.total,
            page: page.page,
            per_page: page.per_page,
            total_pages,
        }
    }
}

/// Plain list response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListResponse<T> {
    pub data: Vec<T>,
    pub count: usize,
}

impl<T> ListResponse<T> {
    pub fn new<M>(items: Vec<M>) -> Self
    where
        T: From<M>,
    {
        let data: Vec<T> = items.into_iter().map(T::from).collect();
        Self {
            count: data.len(),
            data,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Public view of an account. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserDto {
    pub id: Uuid,
    #[schema(example = "Claire")]
    pub first_name: String,
    #[schema(example = "Martin")]
    pub last_name: String,
    #[schema(example = "claire.martin@example.fr")]
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<user::Model> for UserDto {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            first_name: model.first_name,
            last_name: model.last_name,
            email: model.email,
            phone: model.phone,
            role: model.role,
            status: model.status,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PropertyDto {
    pub id: Uuid,
    #[schema(example = "BIEN-1736000000000-1")]
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
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<property::Model> for PropertyDto {
    fn from(model: property::Model) -> Self {
        Self {
            id: model.id,
            reference: model.reference,
            owner_id: model.owner_id,
            agent_id: model.agent_id,
            property_type_id: model.property_type_id,
            title: model.title,
            description: model.description,
            address: model.address,
            postal_code: model.postal_code,
            city: model.city,
            country: model.country,
            living_area: model.living_area,
            land_area: model.land_area,
            rooms: model.rooms,
            bedrooms: model.bedrooms,
            bathrooms: model.bathrooms,
            year_built: model.year_built,
            condition: model.condition,
            status: model.status,
            sale_price: model.sale_price,
            rent_price: model.rent_price,
            monthly_charges: model.monthly_charges,
            deposit: model.deposit,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PropertyTypeDto {
    pub id: Uuid,
    #[schema(example = "Appartement")]
    pub label: String,
    pub description: Option<String>,
}

impl From<property_type::Model> for PropertyTypeDto {
    fn from(model: property_type::Model) -> Self {
        Self {
            id: model.id,
            label: model.label,
            description: model.description,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CharacteristicDto {
    pub id: Uuid,
    #[schema(example = "Balcon")]
    pub label: String,
    pub category: CharacteristicCategory,
    pub description: Option<String>,
    pub unit: Option<String>,
}

impl From<characteristic::Model> for CharacteristicDto {
    fn from(model: characteristic::Model) -> Self {
        Self {
            id: model.id,
            label: model.label,
            category: model.category,
            description: model.description,
            unit: model.unit,
        }
    }
}

/// A characteristic attached to a property, with the property-specific value
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PropertyCharacteristicDto {
    pub characteristic: CharacteristicDto,
    #[schema(example = "12")]
    pub value: Option<String>,
}

impl From<(property_characteristic::Model, characteristic::Model)> for PropertyCharacteristicDto {
    fn from((link, characteristic): (property_characteristic::Model, characteristic::Model)) -> Self {
        Self {
            characteristic: characteristic.into(),
            value: link.value,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ContractDto {
    pub id: Uuid,
    #[schema(example = "CONTRAT-2025-0001")]
    pub contract_number: String,
    pub property_id: Uuid,
    pub tenant_id: Uuid,
    pub agent_id: Option<Uuid>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub duration_months: i32,
    pub monthly_rent: f64,
    pub monthly_charges: f64,
    pub deposit: f64,
    pub special_conditions: Option<String>,
    pub status: ContractStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<contract::Model> for ContractDto {
    fn from(model: contract::Model) -> Self {
        Self {
            id: model.id,
            contract_number: model.contract_number,
            property_id: model.property_id,
            tenant_id: model.tenant_id,
            agent_id: model.agent_id,
            start_date: model.start_date,
            end_date: model.end_date,
            duration_months: model.duration_months,
            monthly_rent: model.monthly_rent,
            monthly_charges: model.monthly_charges,
            deposit: model.deposit,
            special_conditions: model.special_conditions,
            status: model.status,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VisitDto {
    pub id: Uuid,
    pub property_id: Uuid,
    pub agent_id: Uuid,
    pub client_id: Option<Uuid>,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub status: VisitStatus,
    pub notes: Option<String>,
    pub outcome: Option<VisitOutcome>,
    pub created_at: DateTime<Utc>,
}

impl From<visit::Model> for VisitDto {
    fn from(model: visit::Model) -> Self {
        Self {
            id: model.id,
            property_id: model.property_id,
            agent_id: model.agent_id,
            client_id: model.client_id,
            scheduled_at: model.scheduled_at.with_timezone(&Utc),
            duration_minutes: model.duration_minutes,
            status: model.status,
            notes: model.notes,
            outcome: model.outcome,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}
