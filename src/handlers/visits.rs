//! # Visit API Handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::{CurrentUser, require_any_role};
use crate::error::{ApiError, forbidden, not_found};
use crate::handlers::types::{ListResponse, MessageResponse, VisitDto};
use crate::lifecycle::{self, NewVisit, VisitPatch};
use crate::models::user::Model as UserModel;
use crate::models::{Role, VisitOutcome, VisitStatus};
use crate::repositories::{VisitFilter, VisitRepository};
use crate::server::AppState;

#[derive(Debug, Default, Deserialize, Serialize, IntoParams, ToSchema)]
pub struct ListVisitsQuery {
    pub status: Option<VisitStatus>,
    pub agent_id: Option<Uuid>,
    pub property_id: Option<Uuid>,
    /// Scheduled at or after (RFC 3339)
    pub from: Option<DateTime<Utc>>,
    /// Scheduled at or before (RFC 3339)
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreateVisitRequest {
    pub property_id: Uuid,
    pub client_id: Option<Uuid>,
    pub scheduled_at: DateTime<Utc>,
    /// Default 30
    pub duration_minutes: Option<i32>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct UpdateVisitRequest {
    pub scheduled_at: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i32>,
    pub status: Option<VisitStatus>,
    pub notes: Option<String>,
    pub outcome: Option<VisitOutcome>,
}

/// Clients only see the visits they attend.
fn scope_filter(user: &UserModel, mut filter: VisitFilter) -> VisitFilter {
    if matches!(user.role, Role::Owner | Role::Tenant) {
        filter.client_id = Some(user.id);
    }
    filter
}

async fn list_scoped(
    state: &AppState,
    user: &UserModel,
    filter: VisitFilter,
) -> Result<Json<ListResponse<VisitDto>>, ApiError> {
    let visits = VisitRepository::new(&state.db)
        .list(&scope_filter(user, filter))
        .await?;
    Ok(Json(ListResponse::new(visits)))
}

/// List visits
#[utoipa::path(
    get,
    path = "/api/v1/visits",
    security(("bearer_auth" = [])),
    params(ListVisitsQuery),
    responses(
        (status = 200, description = "Visits in schedule order", body = ListResponse<VisitDto>),
        (status = 401, description = "Missing or invalid session token", body = ApiError)
    ),
    tag = "visits"
)]
pub async fn list_visits(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ListVisitsQuery>,
) -> Result<Json<ListResponse<VisitDto>>, ApiError> {
    let filter = VisitFilter {
        status: query.status,
        property_id: query.property_id,
        agent_id: query.agent_id,
        client_id: None,
        from: query.from,
        to: query.to,
    };
    list_scoped(&state, &user, filter).await
}

/// Schedule a visit
#[utoipa::path(
    post,
    path = "/api/v1/visits",
    security(("bearer_auth" = [])),
    request_body = CreateVisitRequest,
    responses(
        (status = 201, description = "Visit scheduled", body = VisitDto),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 403, description = "Agents and admins only", body = ApiError),
        (status = 404, description = "Property or client not found", body = ApiError)
    ),
    tag = "visits"
)]
pub async fn create_visit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<CreateVisitRequest>,
) -> Result<(StatusCode, Json<VisitDto>), ApiError> {
    require_any_role(&user, &[Role::Agent, Role::Admin])?;

    let visit = lifecycle::create_visit(
        &state.db,
        &user,
        NewVisit {
            property_id: request.property_id,
            client_id: request.client_id,
            scheduled_at: request.scheduled_at,
            duration_minutes: request.duration_minutes,
            notes: request.notes,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(visit.into())))
}

/// Visits handled by an agent
#[utoipa::path(
    get,
    path = "/api/v1/visits/agent/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Agent id")),
    responses((status = 200, description = "The agent's visits", body = ListResponse<VisitDto>)),
    tag = "visits"
)]
pub async fn visits_by_agent(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(agent_id): Path<Uuid>,
) -> Result<Json<ListResponse<VisitDto>>, ApiError> {
    let filter = VisitFilter {
        agent_id: Some(agent_id),
        ..Default::default()
    };
    list_scoped(&state, &user, filter).await
}

/// Visits of a property
#[utoipa::path(
    get,
    path = "/api/v1/visits/property/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Property id")),
    responses((status = 200, description = "The property's visits", body = ListResponse<VisitDto>)),
    tag = "visits"
)]
pub async fn visits_by_property(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(property_id): Path<Uuid>,
) -> Result<Json<ListResponse<VisitDto>>, ApiError> {
    let filter = VisitFilter {
        property_id: Some(property_id),
        ..Default::default()
    };
    list_scoped(&state, &user, filter).await
}

/// Visit detail
#[utoipa::path(
    get,
    path = "/api/v1/visits/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Visit id")),
    responses(
        (status = 200, description = "Visit", body = VisitDto),
        (status = 403, description = "Not attending this visit", body = ApiError),
        (status = 404, description = "Visit not found", body = ApiError)
    ),
    tag = "visits"
)]
pub async fn get_visit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<VisitDto>, ApiError> {
    let visit = VisitRepository::new(&state.db)
        .find_by_id(id)
        .await?
        .ok_or_else(|| not_found("VISIT_NOT_FOUND", "Visit not found"))?;

    if matches!(user.role, Role::Owner | Role::Tenant) && visit.client_id != Some(user.id) {
        return Err(forbidden(Some("Not your visit")));
    }
    Ok(Json(visit.into()))
}

/// Update a visit
#[utoipa::path(
    put,
    path = "/api/v1/visits/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Visit id")),
    request_body = UpdateVisitRequest,
    responses(
        (status = 200, description = "Visit updated", body = VisitDto),
        (status = 403, description = "Agents and admins only", body = ApiError),
        (status = 404, description = "Visit not found", body = ApiError)
    ),
    tag = "visits"
)]
pub async fn update_visit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateVisitRequest>,
) -> Result<Json<VisitDto>, ApiError> {
    require_any_role(&user, &[Role::Agent, Role::Admin])?;

    let visit = lifecycle::update_visit(
        &state.db,
        id,
        VisitPatch {
            scheduled_at: request.scheduled_at,
            duration_minutes: request.duration_minutes,
            status: request.status,
            notes: request.notes,
            outcome: request.outcome,
        },
    )
    .await?;
    Ok(Json(visit.into()))
}

/// Delete a visit
#[utoipa::path(
    delete,
    path = "/api/v1/visits/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Visit id")),
    responses(
        (status = 200, description = "Visit deleted", body = MessageResponse),
        (status = 403, description = "Admin only", body = ApiError),
        (status = 404, description = "Visit not found", body = ApiError)
    ),
    tag = "visits"
)]
pub async fn delete_visit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    if !VisitRepository::new(&state.db).delete(id).await? {
        return Err(not_found("VISIT_NOT_FOUND", "Visit not found"));
    }
    Ok(Json(MessageResponse::new("Visit deleted")))
}
