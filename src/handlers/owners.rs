//! # Owner Dashboard Handlers
//!
//! The caller's own portfolio: properties, the contracts on them, and the
//! same counters as the portfolio statistics restricted to those properties.

use axum::{extract::State, response::Json};

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::handlers::properties::{PropertyStatsResponse, stats_response};
use crate::handlers::types::{ContractDto, ListResponse, PropertyDto};
use crate::repositories::{ContractFilter, ContractRepository, PropertyRepository};
use crate::server::AppState;

/// Properties owned by the caller
#[utoipa::path(
    get,
    path = "/api/v1/owners/me/properties",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Owned properties", body = ListResponse<PropertyDto>),
        (status = 401, description = "Missing or invalid session token", body = ApiError)
    ),
    tag = "owners"
)]
pub async fn my_properties(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ListResponse<PropertyDto>>, ApiError> {
    let properties = PropertyRepository::new(&state.db).by_owner(user.id).await?;
    Ok(Json(ListResponse::new(properties)))
}

/// Contracts on the caller's properties
#[utoipa::path(
    get,
    path = "/api/v1/owners/me/contracts",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Contracts on owned properties", body = ListResponse<ContractDto>)
    ),
    tag = "owners"
)]
pub async fn my_contracts(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ListResponse<ContractDto>>, ApiError> {
    let contracts = ContractRepository::new(&state.db)
        .list(&ContractFilter {
            owner_id: Some(user.id),
            ..Default::default()
        })
        .await?;
    Ok(Json(ListResponse::new(contracts)))
}

/// Statistics over the caller's properties
#[utoipa::path(
    get,
    path = "/api/v1/owners/me/statistics",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Owner statistics", body = PropertyStatsResponse)
    ),
    tag = "owners"
)]
pub async fn my_statistics(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<PropertyStatsResponse>, ApiError> {
    let stats = PropertyRepository::new(&state.db)
        .stats(Some(user.id))
        .await?;
    Ok(Json(stats_response(&state, stats).await?))
}
