//! # Property API Handlers
//!
//! Public browsing and search, owner/admin edits, and the characteristic
//! values attached to each property.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::{CurrentUser, require_any_role};
use crate::error::{ApiError, not_found, validation_error};
use crate::handlers::types::{
    ListResponse, MessageResponse, PaginatedResponse, PropertyCharacteristicDto, PropertyDto,
    PropertyTypeDto,
};
use crate::lifecycle::{self, NewProperty, PropertyPatch};
use crate::models::{PropertyCondition, PropertyStatus, Role};
use crate::repositories::{
    CharacteristicRepository, PropertyFilter, PropertyRepository, PropertyStats,
    PropertyTypeRepository,
};
use crate::server::AppState;

pub const DEFAULT_PER_PAGE: u64 = 10;
pub const MAX_PER_PAGE: u64 = 100;

#[derive(Debug, Default, Deserialize, Serialize, IntoParams, ToSchema)]
pub struct ListPropertiesQuery {
    pub property_type_id: Option<Uuid>,
    /// Case-insensitive substring match
    pub city: Option<String>,
    pub status: Option<PropertyStatus>,
    /// Matches when either the rent or the sale price is at least this amount
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub area_min: Option<f64>,
    pub area_max: Option<f64>,
    /// 1-based page number (default 1)
    pub page: Option<u64>,
    /// Page size (default 10, max 100)
    pub per_page: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Serialize, IntoParams, ToSchema)]
pub struct PageQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

/// Advanced search criteria; every field is optional
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct SearchPropertiesRequest {
    pub property_type_id: Option<Uuid>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub status: Option<PropertyStatus>,
    pub rent_min: Option<f64>,
    pub rent_max: Option<f64>,
    pub sale_min: Option<f64>,
    pub sale_max: Option<f64>,
    pub area_min: Option<f64>,
    pub area_max: Option<f64>,
    pub rooms_min: Option<i32>,
    pub bedrooms_min: Option<i32>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreatePropertyRequest {
    /// Required for agents and admins; ignored for owners
    pub owner_id: Option<Uuid>,
    pub agent_id: Option<Uuid>,
    pub property_type_id: Uuid,
    #[schema(example = "T3 lumineux proche gare")]
    pub title: String,
    pub description: Option<String>,
    pub address: String,
    #[schema(example = "69003")]
    pub postal_code: String,
    #[schema(example = "Lyon")]
    pub city: String,
    pub country: Option<String>,
    pub living_area: f64,
    pub land_area: Option<f64>,
    pub rooms: Option<i32>,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub year_built: Option<i32>,
    pub condition: Option<PropertyCondition>,
    /// Any status except `rented`, which only contracts set
    pub status: Option<PropertyStatus>,
    pub sale_price: Option<f64>,
    pub rent_price: Option<f64>,
    pub monthly_charges: Option<f64>,
    pub deposit: Option<f64>,
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct UpdatePropertyRequest {
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

/// Property with its type and characteristics
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PropertyDetailResponse {
    #[serde(flatten)]
    pub property: PropertyDto,
    pub property_type: Option<PropertyTypeDto>,
    pub characteristics: Vec<PropertyCharacteristicDto>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TypeCount {
    pub property_type_id: Uuid,
    pub label: Option<String>,
    pub count: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PropertyStatsResponse {
    pub total: u64,
    pub available: u64,
    pub rented: u64,
    pub sold: u64,
    pub by_type: Vec<TypeCount>,
    /// Sum of asking rents over rented properties
    pub total_monthly_rent: f64,
    /// Sum of sale prices over all listed properties
    pub total_sale_value: f64,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct AttachCharacteristicRequest {
    pub characteristic_id: Uuid,
    pub value: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CharacteristicValueRequest {
    pub value: Option<String>,
}

pub(crate) fn page_params(page: Option<u64>, per_page: Option<u64>) -> Result<(u64, u64), ApiError> {
    let page = page.unwrap_or(1);
    let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE);
    if page == 0 {
        return Err(validation_error(
            "page must be at least 1",
            serde_json::json!({ "fields": { "page": "must be at least 1" } }),
        ));
    }
    if !(1..=MAX_PER_PAGE).contains(&per_page) {
        return Err(validation_error(
            "per_page out of range",
            serde_json::json!({ "fields": { "per_page": format!("must be between 1 and {MAX_PER_PAGE}") } }),
        ));
    }
    Ok((page, per_page))
}

pub(crate) async fn stats_response(
    state: &AppState,
    stats: PropertyStats,
) -> Result<PropertyStatsResponse, ApiError> {
    let types = PropertyTypeRepository::new(&state.db).list().await?;
    let by_type = stats
        .by_type
        .into_iter()
        .map(|(property_type_id, count)| TypeCount {
            property_type_id,
            label: types
                .iter()
                .find(|t| t.id == property_type_id)
                .map(|t| t.label.clone()),
            count,
        })
        .collect();

    Ok(PropertyStatsResponse {
        total: stats.total,
        available: stats.available,
        rented: stats.rented,
        sold: stats.sold,
        by_type,
        total_monthly_rent: stats.total_monthly_rent,
        total_sale_value: stats.total_sale_value,
    })
}

/// List properties
#[utoipa::path(
    get,
    path = "/api/v1/properties",
    params(ListPropertiesQuery),
    responses(
        (status = 200, description = "One page of properties, newest first", body = PaginatedResponse<PropertyDto>),
        (status = 400, description = "Invalid query parameters", body = ApiError)
    ),
    tag = "properties"
)]
pub async fn list_properties(
    State(state): State<AppState>,
    Query(query): Query<ListPropertiesQuery>,
) -> Result<Json<PaginatedResponse<PropertyDto>>, ApiError> {
    let (page, per_page) = page_params(query.page, query.per_page)?;
    let filter = PropertyFilter {
        property_type_id: query.property_type_id,
        city: query.city,
        status: query.status,
        price_min: query.price_min,
        price_max: query.price_max,
        area_min: query.area_min,
        area_max: query.area_max,
        ..Default::default()
    };

    let page = PropertyRepository::new(&state.db)
        .list(&filter, page, per_page)
        .await?;
    Ok(Json(PaginatedResponse::from_page(page)))
}

/// List available properties
#[utoipa::path(
    get,
    path = "/api/v1/properties/available",
    params(PageQuery),
    responses(
        (status = 200, description = "Available properties", body = PaginatedResponse<PropertyDto>)
    ),
    tag = "properties"
)]
pub async fn list_available_properties(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PaginatedResponse<PropertyDto>>, ApiError> {
    let (page, per_page) = page_params(query.page, query.per_page)?;
    let filter = PropertyFilter {
        status: Some(PropertyStatus::Available),
        ..Default::default()
    };
    let page = PropertyRepository::new(&state.db)
        .list(&filter, page, per_page)
        .await?;
    Ok(Json(PaginatedResponse::from_page(page)))
}

/// Advanced property search
#[utoipa::path(
    post,
    path = "/api/v1/properties/search",
    request_body = SearchPropertiesRequest,
    responses(
        (status = 200, description = "Matching properties", body = ListResponse<PropertyDto>),
        (status = 400, description = "Invalid criteria", body = ApiError)
    ),
    tag = "properties"
)]
pub async fn search_properties(
    State(state): State<AppState>,
    Json(request): Json<SearchPropertiesRequest>,
) -> Result<Json<ListResponse<PropertyDto>>, ApiError> {
    let filter = PropertyFilter {
        property_type_id: request.property_type_id,
        city: request.city,
        postal_code: request.postal_code,
        status: request.status,
        rent_min: request.rent_min,
        rent_max: request.rent_max,
        sale_min: request.sale_min,
        sale_max: request.sale_max,
        area_min: request.area_min,
        area_max: request.area_max,
        rooms_min: request.rooms_min,
        bedrooms_min: request.bedrooms_min,
        ..Default::default()
    };
    let properties = PropertyRepository::new(&state.db).search(&filter).await?;
    Ok(Json(ListResponse::new(properties)))
}

/// Portfolio statistics
#[utoipa::path(
    get,
    path = "/api/v1/properties/statistics",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Counts by status and type, value totals", body = PropertyStatsResponse),
        (status = 401, description = "Missing or invalid session token", body = ApiError)
    ),
    tag = "properties"
)]
pub async fn property_statistics(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
) -> Result<Json<PropertyStatsResponse>, ApiError> {
    let stats = PropertyRepository::new(&state.db).stats(None).await?;
    Ok(Json(stats_response(&state, stats).await?))
}

/// Properties of one owner
#[utoipa::path(
    get,
    path = "/api/v1/properties/owner/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Owner id")),
    responses(
        (status = 200, description = "The owner's properties", body = ListResponse<PropertyDto>),
        (status = 403, description = "Not the owner, an agent or an admin", body = ApiError)
    ),
    tag = "properties"
)]
pub async fn properties_by_owner(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(owner_id): Path<Uuid>,
) -> Result<Json<ListResponse<PropertyDto>>, ApiError> {
    if user.id != owner_id {
        require_any_role(&user, &[Role::Agent, Role::Admin])?;
    }
    let properties = PropertyRepository::new(&state.db).by_owner(owner_id).await?;
    Ok(Json(ListResponse::new(properties)))
}

/// Property detail
#[utoipa::path(
    get,
    path = "/api/v1/properties/{id}",
    params(("id" = Uuid, Path, description = "Property id")),
    responses(
        (status = 200, description = "Property", body = PropertyDetailResponse),
        (status = 404, description = "Property not found", body = ApiError)
    ),
    tag = "properties"
)]
pub async fn get_property(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PropertyDetailResponse>, ApiError> {
    let property = PropertyRepository::new(&state.db)
        .find_by_id(id)
        .await?
        .ok_or_else(|| not_found("PROPERTY_NOT_FOUND", "Property not found"))?;
    let property_type = PropertyTypeRepository::new(&state.db)
        .find_by_id(property.property_type_id)
        .await?;
    let characteristics = CharacteristicRepository::new(&state.db)
        .for_property(id)
        .await?;

    Ok(Json(PropertyDetailResponse {
        property: property.into(),
        property_type: property_type.map(Into::into),
        characteristics: characteristics.into_iter().map(Into::into).collect(),
    }))
}

/// Create a property
#[utoipa::path(
    post,
    path = "/api/v1/properties",
    security(("bearer_auth" = [])),
    request_body = CreatePropertyRequest,
    responses(
        (status = 201, description = "Property created", body = PropertyDto),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 403, description = "Tenants cannot list properties", body = ApiError),
        (status = 404, description = "Property type or owner not found", body = ApiError)
    ),
    tag = "properties"
)]
pub async fn create_property(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<CreatePropertyRequest>,
) -> Result<(StatusCode, Json<PropertyDto>), ApiError> {
    require_any_role(&user, &[Role::Owner, Role::Agent, Role::Admin])?;

    let created = lifecycle::create_property(
        &state.db,
        &user,
        NewProperty {
            owner_id: request.owner_id,
            agent_id: request.agent_id,
            property_type_id: request.property_type_id,
            title: request.title,
            description: request.description,
            address: request.address,
            postal_code: request.postal_code,
            city: request.city,
            country: request.country,
            living_area: request.living_area,
            land_area: request.land_area,
            rooms: request.rooms,
            bedrooms: request.bedrooms,
            bathrooms: request.bathrooms,
            year_built: request.year_built,
            condition: request.condition,
            status: request.status,
            sale_price: request.sale_price,
            rent_price: request.rent_price,
            monthly_charges: request.monthly_charges,
            deposit: request.deposit,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Update a property
#[utoipa::path(
    put,
    path = "/api/v1/properties/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Property id")),
    request_body = UpdatePropertyRequest,
    responses(
        (status = 200, description = "Property updated", body = PropertyDto),
        (status = 400, description = "Validation failed or status change not allowed", body = ApiError),
        (status = 403, description = "Not the owner or an admin", body = ApiError),
        (status = 404, description = "Property not found", body = ApiError)
    ),
    tag = "properties"
)]
pub async fn update_property(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdatePropertyRequest>,
) -> Result<Json<PropertyDto>, ApiError> {
    let updated = lifecycle::update_property(
        &state.db,
        &user,
        id,
        PropertyPatch {
            agent_id: request.agent_id,
            property_type_id: request.property_type_id,
            title: request.title,
            description: request.description,
            address: request.address,
            postal_code: request.postal_code,
            city: request.city,
            country: request.country,
            living_area: request.living_area,
            land_area: request.land_area,
            rooms: request.rooms,
            bedrooms: request.bedrooms,
            bathrooms: request.bathrooms,
            year_built: request.year_built,
            condition: request.condition,
            status: request.status,
            sale_price: request.sale_price,
            rent_price: request.rent_price,
            monthly_charges: request.monthly_charges,
            deposit: request.deposit,
        },
    )
    .await?;

    Ok(Json(updated.into()))
}

/// Delete a property
#[utoipa::path(
    delete,
    path = "/api/v1/properties/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Property id")),
    responses(
        (status = 200, description = "Property deleted", body = MessageResponse),
        (status = 400, description = "Property still referenced by a contract", body = ApiError),
        (status = 403, description = "Not the owner or an admin", body = ApiError),
        (status = 404, description = "Property not found", body = ApiError)
    ),
    tag = "properties"
)]
pub async fn delete_property(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    lifecycle::delete_property(&state.db, &user, id).await?;
    Ok(Json(MessageResponse::new("Property deleted")))
}

/// Characteristics attached to a property
#[utoipa::path(
    get,
    path = "/api/v1/properties/{id}/characteristics",
    params(("id" = Uuid, Path, description = "Property id")),
    responses(
        (status = 200, description = "Attached characteristics", body = ListResponse<PropertyCharacteristicDto>),
        (status = 404, description = "Property not found", body = ApiError)
    ),
    tag = "properties"
)]
pub async fn list_property_characteristics(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ListResponse<PropertyCharacteristicDto>>, ApiError> {
    PropertyRepository::new(&state.db)
        .find_by_id(id)
        .await?
        .ok_or_else(|| not_found("PROPERTY_NOT_FOUND", "Property not found"))?;
    let attached = CharacteristicRepository::new(&state.db)
        .for_property(id)
        .await?;
    Ok(Json(ListResponse::new(attached)))
}

/// Attach a characteristic, or replace its value
#[utoipa::path(
    post,
    path = "/api/v1/properties/{id}/characteristics",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Property id")),
    request_body = AttachCharacteristicRequest,
    responses(
        (status = 200, description = "Characteristic attached", body = MessageResponse),
        (status = 403, description = "Not the owner or an admin", body = ApiError),
        (status = 404, description = "Property or characteristic not found", body = ApiError)
    ),
    tag = "properties"
)]
pub async fn attach_characteristic(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(request): Json<AttachCharacteristicRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    lifecycle::set_property_characteristic(
        &state.db,
        &user,
        id,
        request.characteristic_id,
        request.value,
    )
    .await?;
    Ok(Json(MessageResponse::new("Characteristic attached")))
}

/// Change the value of an attached characteristic
#[utoipa::path(
    put,
    path = "/api/v1/properties/{id}/characteristics/{characteristic_id}",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Property id"),
        ("characteristic_id" = Uuid, Path, description = "Characteristic id")
    ),
    request_body = CharacteristicValueRequest,
    responses(
        (status = 200, description = "Value updated", body = MessageResponse),
        (status = 404, description = "Property or characteristic not found", body = ApiError)
    ),
    tag = "properties"
)]
pub async fn update_property_characteristic(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((id, characteristic_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<CharacteristicValueRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    lifecycle::set_property_characteristic(&state.db, &user, id, characteristic_id, request.value)
        .await?;
    Ok(Json(MessageResponse::new("Characteristic updated")))
}

/// Detach a characteristic
#[utoipa::path(
    delete,
    path = "/api/v1/properties/{id}/characteristics/{characteristic_id}",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Property id"),
        ("characteristic_id" = Uuid, Path, description = "Characteristic id")
    ),
    responses(
        (status = 200, description = "Characteristic detached", body = MessageResponse),
        (status = 404, description = "Property or association not found", body = ApiError)
    ),
    tag = "properties"
)]
pub async fn detach_characteristic(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((id, characteristic_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<MessageResponse>, ApiError> {
    lifecycle::remove_property_characteristic(&state.db, &user, id, characteristic_id).await?;
    Ok(Json(MessageResponse::new("Characteristic detached")))
}
