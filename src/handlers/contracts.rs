//! # Contract API Handlers
//!
//! Tenants only ever see their own contracts and owners only those on their
//! properties. Agents and admins see everything and are the only ones who
//! sign or amend contracts.

use std::collections::HashSet;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::{CurrentUser, require_any_role};
use crate::error::{ApiError, forbidden, not_found, validation_error};
use crate::handlers::types::{ContractDto, ListResponse, MessageResponse};
use crate::lifecycle::{self, ContractPatch, NewContract};
use crate::models::contract::Model as ContractModel;
use crate::models::user::Model as UserModel;
use crate::models::{ContractStatus, Role};
use crate::repositories::{ContractFilter, ContractRepository, PropertyRepository};
use crate::server::AppState;

const MAX_EXPIRY_WINDOW_DAYS: u32 = 3650;

#[derive(Debug, Default, Deserialize, Serialize, IntoParams, ToSchema)]
pub struct ListContractsQuery {
    pub status: Option<ContractStatus>,
    pub tenant_id: Option<Uuid>,
    pub property_id: Option<Uuid>,
    pub agent_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Serialize, IntoParams, ToSchema)]
pub struct ExpiringQuery {
    /// Window in days (default 30)
    pub days: Option<u32>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreateContractRequest {
    pub property_id: Uuid,
    pub tenant_id: Uuid,
    pub start_date: NaiveDate,
    /// Defaults to `start_date + duration_months`
    pub end_date: Option<NaiveDate>,
    #[schema(example = 12)]
    pub duration_months: i32,
    /// Defaults to the property's rent
    pub monthly_rent: Option<f64>,
    pub monthly_charges: Option<f64>,
    pub deposit: Option<f64>,
    pub special_conditions: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct UpdateContractRequest {
    pub end_date: Option<NaiveDate>,
    pub monthly_rent: Option<f64>,
    pub monthly_charges: Option<f64>,
    pub special_conditions: Option<String>,
    /// `terminated` or `cancelled` closes the contract and frees the property
    pub status: Option<ContractStatus>,
}

/// Narrows `filter` to what `user` may see.
fn scope_filter(user: &UserModel, mut filter: ContractFilter) -> ContractFilter {
    match user.role {
        Role::Tenant => filter.tenant_id = Some(user.id),
        Role::Owner => filter.owner_id = Some(user.id),
        Role::Agent | Role::Admin => {}
    }
    filter
}

async fn ensure_visible(
    state: &AppState,
    user: &UserModel,
    contract: &ContractModel,
) -> Result<(), ApiError> {
    let visible = match user.role {
        Role::Agent | Role::Admin => true,
        Role::Tenant => contract.tenant_id == user.id,
        Role::Owner => PropertyRepository::new(&state.db)
            .find_by_id(contract.property_id)
            .await?
            .is_some_and(|property| property.owner_id == user.id),
    };
    if visible {
        Ok(())
    } else {
        Err(forbidden(Some("Not your contract")))
    }
}

async fn list_scoped(
    state: &AppState,
    user: &UserModel,
    filter: ContractFilter,
) -> Result<Json<ListResponse<ContractDto>>, ApiError> {
    let contracts = ContractRepository::new(&state.db)
        .list(&scope_filter(user, filter))
        .await?;
    Ok(Json(ListResponse::new(contracts)))
}

/// List contracts
#[utoipa::path(
    get,
    path = "/api/v1/contracts",
    security(("bearer_auth" = [])),
    params(ListContractsQuery),
    responses(
        (status = 200, description = "Contracts, most recent start first", body = ListResponse<ContractDto>),
        (status = 401, description = "Missing or invalid session token", body = ApiError)
    ),
    tag = "contracts"
)]
pub async fn list_contracts(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ListContractsQuery>,
) -> Result<Json<ListResponse<ContractDto>>, ApiError> {
    let filter = ContractFilter {
        status: query.status,
        tenant_id: query.tenant_id,
        property_id: query.property_id,
        agent_id: query.agent_id,
        owner_id: None,
    };
    list_scoped(&state, &user, filter).await
}

/// Sign a contract
#[utoipa::path(
    post,
    path = "/api/v1/contracts",
    security(("bearer_auth" = [])),
    request_body = CreateContractRequest,
    responses(
        (status = 201, description = "Contract created; property now rented", body = ContractDto),
        (status = 400, description = "Validation failed or property not available", body = ApiError),
        (status = 403, description = "Agents and admins only", body = ApiError),
        (status = 404, description = "Property or tenant not found", body = ApiError)
    ),
    tag = "contracts"
)]
pub async fn create_contract(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<CreateContractRequest>,
) -> Result<(StatusCode, Json<ContractDto>), ApiError> {
    require_any_role(&user, &[Role::Agent, Role::Admin])?;

    let contract = lifecycle::create_contract(
        &state.db,
        &user,
        NewContract {
            property_id: request.property_id,
            tenant_id: request.tenant_id,
            start_date: request.start_date,
            end_date: request.end_date,
            duration_months: request.duration_months,
            monthly_rent: request.monthly_rent,
            monthly_charges: request.monthly_charges,
            deposit: request.deposit,
            special_conditions: request.special_conditions,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(contract.into())))
}

/// Active contracts ending soon
#[utoipa::path(
    get,
    path = "/api/v1/contracts/expiring",
    security(("bearer_auth" = [])),
    params(ExpiringQuery),
    responses(
        (status = 200, description = "Active contracts ending within the window", body = ListResponse<ContractDto>),
        (status = 400, description = "Invalid window", body = ApiError)
    ),
    tag = "contracts"
)]
pub async fn expiring_contracts(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ExpiringQuery>,
) -> Result<Json<ListResponse<ContractDto>>, ApiError> {
    let days = query.days.unwrap_or(30);
    if days > MAX_EXPIRY_WINDOW_DAYS {
        return Err(validation_error(
            "days out of range",
            serde_json::json!({ "fields": { "days": format!("must be at most {MAX_EXPIRY_WINDOW_DAYS}") } }),
        ));
    }

    let expiring = ContractRepository::new(&state.db)
        .expiring(Utc::now().date_naive(), days)
        .await?;

    let visible: Vec<ContractModel> = match user.role {
        Role::Agent | Role::Admin => expiring,
        Role::Tenant => expiring
            .into_iter()
            .filter(|contract| contract.tenant_id == user.id)
            .collect(),
        Role::Owner => {
            let owned: HashSet<Uuid> = PropertyRepository::new(&state.db)
                .by_owner(user.id)
                .await?
                .into_iter()
                .map(|property| property.id)
                .collect();
            expiring
                .into_iter()
                .filter(|contract| owned.contains(&contract.property_id))
                .collect()
        }
    };
    Ok(Json(ListResponse::new(visible)))
}

/// Contracts of a tenant
#[utoipa::path(
    get,
    path = "/api/v1/contracts/tenant/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Tenant id")),
    responses(
        (status = 200, description = "The tenant's contracts", body = ListResponse<ContractDto>)
    ),
    tag = "contracts"
)]
pub async fn contracts_by_tenant(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(tenant_id): Path<Uuid>,
) -> Result<Json<ListResponse<ContractDto>>, ApiError> {
    if user.role == Role::Tenant && user.id != tenant_id {
        return Err(forbidden(Some("Not your contracts")));
    }
    let filter = ContractFilter {
        tenant_id: Some(tenant_id),
        ..Default::default()
    };
    list_scoped(&state, &user, filter).await
}

/// Contracts on a property
#[utoipa::path(
    get,
    path = "/api/v1/contracts/property/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Property id")),
    responses(
        (status = 200, description = "The property's contracts", body = ListResponse<ContractDto>)
    ),
    tag = "contracts"
)]
pub async fn contracts_by_property(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(property_id): Path<Uuid>,
) -> Result<Json<ListResponse<ContractDto>>, ApiError> {
    let filter = ContractFilter {
        property_id: Some(property_id),
        ..Default::default()
    };
    list_scoped(&state, &user, filter).await
}

/// Contract detail
#[utoipa::path(
    get,
    path = "/api/v1/contracts/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Contract id")),
    responses(
        (status = 200, description = "Contract", body = ContractDto),
        (status = 403, description = "Not a party to this contract", body = ApiError),
        (status = 404, description = "Contract not found", body = ApiError)
    ),
    tag = "contracts"
)]
pub async fn get_contract(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ContractDto>, ApiError> {
    let contract = ContractRepository::new(&state.db)
        .find_by_id(id)
        .await?
        .ok_or_else(|| not_found("CONTRACT_NOT_FOUND", "Contract not found"))?;
    ensure_visible(&state, &user, &contract).await?;
    Ok(Json(contract.into()))
}

/// Amend or close a contract
#[utoipa::path(
    put,
    path = "/api/v1/contracts/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Contract id")),
    request_body = UpdateContractRequest,
    responses(
        (status = 200, description = "Contract updated", body = ContractDto),
        (status = 400, description = "Validation failed or invalid status transition", body = ApiError),
        (status = 403, description = "Agents and admins only", body = ApiError),
        (status = 404, description = "Contract not found", body = ApiError)
    ),
    tag = "contracts"
)]
pub async fn update_contract(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateContractRequest>,
) -> Result<Json<ContractDto>, ApiError> {
    require_any_role(&user, &[Role::Agent, Role::Admin])?;

    let updated = lifecycle::update_contract(
        &state.db,
        id,
        ContractPatch {
            end_date: request.end_date,
            monthly_rent: request.monthly_rent,
            monthly_charges: request.monthly_charges,
            special_conditions: request.special_conditions,
            status: request.status,
        },
    )
    .await?;
    Ok(Json(updated.into()))
}

/// Delete a contract
#[utoipa::path(
    delete,
    path = "/api/v1/contracts/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Contract id")),
    responses(
        (status = 200, description = "Contract deleted; property freed if it was active", body = MessageResponse),
        (status = 403, description = "Admin only", body = ApiError),
        (status = 404, description = "Contract not found", body = ApiError)
    ),
    tag = "contracts"
)]
pub async fn delete_contract(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    lifecycle::delete_contract(&state.db, id).await?;
    Ok(Json(MessageResponse::new("Contract deleted")))
}
