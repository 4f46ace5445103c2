//! # Catalog API Handlers
//!
//! Property types and characteristics. Reads are public; changes are admin only.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::{ApiError, not_found};
use crate::handlers::types::{CharacteristicDto, ListResponse, MessageResponse, PropertyTypeDto};
use crate::lifecycle;
use crate::models::CharacteristicCategory;
use crate::repositories::{
    CharacteristicInput, CharacteristicRepository, PropertyTypeInput, PropertyTypeRepository,
};
use crate::server::AppState;

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct PropertyTypeRequest {
    #[schema(example = "Appartement")]
    pub label: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CharacteristicRequest {
    #[schema(example = "Balcon")]
    pub label: String,
    pub category: CharacteristicCategory,
    pub description: Option<String>,
    /// Unit of the per-property value, e.g. `m²`
    pub unit: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, IntoParams, ToSchema)]
pub struct CharacteristicQuery {
    pub category: Option<CharacteristicCategory>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CategoriesResponse {
    pub categories: Vec<CharacteristicCategory>,
}

/// List property types
#[utoipa::path(
    get,
    path = "/api/v1/property-types",
    responses((status = 200, description = "Property types", body = ListResponse<PropertyTypeDto>)),
    tag = "catalog"
)]
pub async fn list_property_types(
    State(state): State<AppState>,
) -> Result<Json<ListResponse<PropertyTypeDto>>, ApiError> {
    let types = PropertyTypeRepository::new(&state.db).list().await?;
    Ok(Json(ListResponse::new(types)))
}

/// Get a property type
#[utoipa::path(
    get,
    path = "/api/v1/property-types/{id}",
    params(("id" = Uuid, Path, description = "Property type id")),
    responses(
        (status = 200, description = "Property type", body = PropertyTypeDto),
        (status = 404, description = "Property type not found", body = ApiError)
    ),
    tag = "catalog"
)]
pub async fn get_property_type(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PropertyTypeDto>, ApiError> {
    PropertyTypeRepository::new(&state.db)
        .find_by_id(id)
        .await?
        .map(|t| Json(t.into()))
        .ok_or_else(|| not_found("PROPERTY_TYPE_NOT_FOUND", "Property type not found"))
}

/// Create a property type
#[utoipa::path(
    post,
    path = "/api/v1/property-types",
    security(("bearer_auth" = [])),
    request_body = PropertyTypeRequest,
    responses(
        (status = 201, description = "Property type created", body = PropertyTypeDto),
        (status = 400, description = "Validation failed or label taken", body = ApiError),
        (status = 403, description = "Admin only", body = ApiError)
    ),
    tag = "catalog"
)]
pub async fn create_property_type(
    State(state): State<AppState>,
    Json(request): Json<PropertyTypeRequest>,
) -> Result<(StatusCode, Json<PropertyTypeDto>), ApiError> {
    let created = PropertyTypeRepository::new(&state.db)
        .create(PropertyTypeInput {
            label: request.label,
            description: request.description,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Update a property type
#[utoipa::path(
    put,
    path = "/api/v1/property-types/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Property type id")),
    request_body = PropertyTypeRequest,
    responses(
        (status = 200, description = "Property type updated", body = PropertyTypeDto),
        (status = 404, description = "Property type not found", body = ApiError)
    ),
    tag = "catalog"
)]
pub async fn update_property_type(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<PropertyTypeRequest>,
) -> Result<Json<PropertyTypeDto>, ApiError> {
    let updated = PropertyTypeRepository::new(&state.db)
        .update(
            id,
            PropertyTypeInput {
                label: request.label,
                description: request.description,
            },
        )
        .await?;
    Ok(Json(updated.into()))
}

/// Delete a property type
#[utoipa::path(
    delete,
    path = "/api/v1/property-types/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Property type id")),
    responses(
        (status = 200, description = "Property type deleted", body = MessageResponse),
        (status = 400, description = "Still used by a property", body = ApiError),
        (status = 404, description = "Property type not found", body = ApiError)
    ),
    tag = "catalog"
)]
pub async fn delete_property_type(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    lifecycle::delete_property_type(&state.db, id).await?;
    Ok(Json(MessageResponse::new("Property type deleted")))
}

/// List characteristics
#[utoipa::path(
    get,
    path = "/api/v1/characteristics",
    params(CharacteristicQuery),
    responses((status = 200, description = "Characteristics by category then label", body = ListResponse<CharacteristicDto>)),
    tag = "catalog"
)]
pub async fn list_characteristics(
    State(state): State<AppState>,
    Query(query): Query<CharacteristicQuery>,
) -> Result<Json<ListResponse<CharacteristicDto>>, ApiError> {
    let characteristics = CharacteristicRepository::new(&state.db)
        .list(query.category)
        .await?;
    Ok(Json(ListResponse::new(characteristics)))
}

/// Categories in use
#[utoipa::path(
    get,
    path = "/api/v1/characteristics/categories",
    responses((status = 200, description = "Distinct categories", body = CategoriesResponse)),
    tag = "catalog"
)]
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<CategoriesResponse>, ApiError> {
    let categories = CharacteristicRepository::new(&state.db).categories().await?;
    Ok(Json(CategoriesResponse { categories }))
}

/// Characteristics of one category
#[utoipa::path(
    get,
    path = "/api/v1/characteristics/category/{category}",
    params(("category" = CharacteristicCategory, Path, description = "Category")),
    responses(
        (status = 200, description = "Characteristics", body = ListResponse<CharacteristicDto>),
        (status = 400, description = "Unknown category", body = ApiError)
    ),
    tag = "catalog"
)]
pub async fn characteristics_by_category(
    State(state): State<AppState>,
    Path(category): Path<CharacteristicCategory>,
) -> Result<Json<ListResponse<CharacteristicDto>>, ApiError> {
    let characteristics = CharacteristicRepository::new(&state.db)
        .list(Some(category))
        .await?;
    Ok(Json(ListResponse::new(characteristics)))
}

/// Get a characteristic
#[utoipa::path(
    get,
    path = "/api/v1/characteristics/{id}",
    params(("id" = Uuid, Path, description = "Characteristic id")),
    responses(
        (status = 200, description = "Characteristic", body = CharacteristicDto),
        (status = 404, description = "Characteristic not found", body = ApiError)
    ),
    tag = "catalog"
)]
pub async fn get_characteristic(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CharacteristicDto>, ApiError> {
    CharacteristicRepository::new(&state.db)
        .find_by_id(id)
        .await?
        .map(|c| Json(c.into()))
        .ok_or_else(|| not_found("CHARACTERISTIC_NOT_FOUND", "Characteristic not found"))
}

/// Create a characteristic
#[utoipa::path(
    post,
    path = "/api/v1/characteristics",
    security(("bearer_auth" = [])),
    request_body = CharacteristicRequest,
    responses(
        (status = 201, description = "Characteristic created", body = CharacteristicDto),
        (status = 400, description = "Validation failed or duplicate", body = ApiError),
        (status = 403, description = "Admin only", body = ApiError)
    ),
    tag = "catalog"
)]
pub async fn create_characteristic(
    State(state): State<AppState>,
    Json(request): Json<CharacteristicRequest>,
) -> Result<(StatusCode, Json<CharacteristicDto>), ApiError> {
    let created = CharacteristicRepository::new(&state.db)
        .create(CharacteristicInput {
            label: request.label,
            category: request.category,
            description: request.description,
            unit: request.unit,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Update a characteristic
#[utoipa::path(
    put,
    path = "/api/v1/characteristics/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Characteristic id")),
    request_body = CharacteristicRequest,
    responses(
        (status = 200, description = "Characteristic updated", body = CharacteristicDto),
        (status = 404, description = "Characteristic not found", body = ApiError)
    ),
    tag = "catalog"
)]
pub async fn update_characteristic(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<CharacteristicRequest>,
) -> Result<Json<CharacteristicDto>, ApiError> {
    let updated = CharacteristicRepository::new(&state.db)
        .update(
            id,
            CharacteristicInput {
                label: request.label,
                category: request.category,
                description: request.description,
                unit: request.unit,
            },
        )
        .await?;
    Ok(Json(updated.into()))
}

/// Delete a characteristic
#[utoipa::path(
    delete,
    path = "/api/v1/characteristics/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Characteristic id")),
    responses(
        (status = 200, description = "Characteristic deleted", body = MessageResponse),
        (status = 400, description = "Still attached to a property", body = ApiError),
        (status = 404, description = "Characteristic not found", body = ApiError)
    ),
    tag = "catalog"
)]
pub async fn delete_characteristic(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    lifecycle::delete_characteristic(&state.db, id).await?;
    Ok(Json(MessageResponse::new("Characteristic deleted")))
}
