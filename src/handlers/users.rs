//! # Account Management Handlers
//!
//! Admin management of agents and clients (owners and tenants), the
//! caller's own profile, and per-agent activity counters.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::{CurrentUser, require_any_role};
use crate::error::{ApiError, not_found, validation_error};
use crate::handlers::auth::hash_password;
use crate::handlers::types::{ListResponse, MessageResponse, UserDto};
use crate::models::user::Model as UserModel;
use crate::models::{
    Contract, ContractStatus, Property, Role, UserStatus, Visit, VisitStatus, contract, property,
    visit,
};
use crate::repositories::{NewUser, UserChanges, UserRepository};
use crate::server::AppState;
use crate::validation::FieldErrors;

const CLIENT_ROLES: [Role; 2] = [Role::Owner, Role::Tenant];

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password: String,
}

/// Fields left out are unchanged. The password is rehashed only when supplied.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
    /// Admin only; ignored on `/profile`.
    pub status: Option<UserStatus>,
}

#[derive(Debug, Deserialize, Serialize, IntoParams, ToSchema)]
pub struct ListUsersQuery {
    pub status: Option<UserStatus>,
}

#[derive(Debug, Deserialize, Serialize, IntoParams, ToSchema)]
pub struct ListClientsQuery {
    /// `owner` or `tenant`; both when absent
    pub role: Option<Role>,
    pub status: Option<UserStatus>,
}

/// Activity counters for one agent
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AgentStatsResponse {
    pub agent_id: Uuid,
    pub managed_properties: u64,
    pub contracts_total: u64,
    pub contracts_active: u64,
    pub visits_planned: u64,
    pub visits_completed: u64,
}

async fn validate_changes(
    state: &AppState,
    request: UpdateUserRequest,
    allow_status: bool,
) -> Result<UserChanges, ApiError> {
    let mut errors = FieldErrors::new();
    if let Some(first_name) = &request.first_name {
        errors.required("first_name", first_name);
    }
    if let Some(last_name) = &request.last_name {
        errors.required("last_name", last_name);
    }
    if let Some(email) = &request.email {
        errors.email("email", email);
    }
    if let Some(password) = &request.password {
        errors.password("password", password, state.config.min_password_length);
    }
    errors.into_result()?;

    let password_hash = match request.password {
        Some(password) => Some(hash_password(Arc::clone(&state.hasher), password).await?),
        None => None,
    };

    Ok(UserChanges {
        first_name: request.first_name,
        last_name: request.last_name,
        email: request.email,
        phone: request.phone,
        password_hash,
        status: request.status.filter(|_| allow_status),
    })
}

async fn load_with_role(
    state: &AppState,
    id: Uuid,
    roles: &[Role],
    code: &str,
) -> Result<UserModel, ApiError> {
    UserRepository::new(&state.db)
        .find_by_id(id)
        .await?
        .filter(|user| roles.contains(&user.role))
        .ok_or_else(|| not_found(code, "Account not found"))
}

/// List agents
#[utoipa::path(
    get,
    path = "/api/v1/agents",
    security(("bearer_auth" = [])),
    params(ListUsersQuery),
    responses(
        (status = 200, description = "Agents", body = ListResponse<UserDto>),
        (status = 401, description = "Missing or invalid session token", body = ApiError),
        (status = 403, description = "Admin only", body = ApiError)
    ),
    tag = "agents"
)]
pub async fn list_agents(
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<ListResponse<UserDto>>, ApiError> {
    let agents = UserRepository::new(&state.db)
        .list_by_roles(&[Role::Agent], query.status)
        .await?;
    Ok(Json(ListResponse::new(agents)))
}

/// Create an agent account
#[utoipa::path(
    post,
    path = "/api/v1/agents",
    security(("bearer_auth" = [])),
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Agent created", body = UserDto),
        (status = 400, description = "Validation failed or email already registered", body = ApiError),
        (status = 403, description = "Admin only", body = ApiError)
    ),
    tag = "agents"
)]
pub async fn create_agent(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserDto>), ApiError> {
    let mut errors = FieldErrors::new();
    errors.required("first_name", &request.first_name);
    errors.required("last_name", &request.last_name);
    errors.email("email", &request.email);
    errors.password("password", &request.password, state.config.min_password_length);
    errors.into_result()?;

    let password_hash = hash_password(Arc::clone(&state.hasher), request.password).await?;
    let agent = UserRepository::new(&state.db)
        .create(NewUser {
            first_name: request.first_name,
            last_name: request.last_name,
            email: request.email,
            phone: request.phone,
            password_hash,
            role: Role::Agent,
        })
        .await?;

    tracing::info!(agent_id = %agent.id, created_by = %admin.id, "Agent created");
    Ok((StatusCode::CREATED, Json(agent.into())))
}

/// Get an agent
#[utoipa::path(
    get,
    path = "/api/v1/agents/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Agent id")),
    responses(
        (status = 200, description = "Agent", body = UserDto),
        (status = 404, description = "Agent not found", body = ApiError)
    ),
    tag = "agents"
)]
pub async fn get_agent(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserDto>, ApiError> {
    let agent = load_with_role(&state, id, &[Role::Agent], "AGENT_NOT_FOUND").await?;
    Ok(Json(agent.into()))
}

/// Update an agent
#[utoipa::path(
    put,
    path = "/api/v1/agents/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Agent id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Agent updated", body = UserDto),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 404, description = "Agent not found", body = ApiError)
    ),
    tag = "agents"
)]
pub async fn update_agent(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<UserDto>, ApiError> {
    load_with_role(&state, id, &[Role::Agent], "AGENT_NOT_FOUND").await?;
    let changes = validate_changes(&state, request, true).await?;
    let agent = UserRepository::new(&state.db).update(id, changes).await?;
    Ok(Json(agent.into()))
}

/// Deactivate an agent
#[utoipa::path(
    delete,
    path = "/api/v1/agents/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Agent id")),
    responses(
        (status = 200, description = "Agent deactivated", body = MessageResponse),
        (status = 404, description = "Agent not found", body = ApiError)
    ),
    tag = "agents"
)]
pub async fn delete_agent(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    load_with_role(&state, id, &[Role::Agent], "AGENT_NOT_FOUND").await?;
    UserRepository::new(&state.db)
        .set_status(id, UserStatus::Inactive)
        .await?;
    tracing::info!(agent_id = %id, admin_id = %admin.id, "Agent deactivated");
    Ok(Json(MessageResponse::new("Agent deactivated")))
}

/// Activity counters for the calling agent
#[utoipa::path(
    get,
    path = "/api/v1/agents/stats",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Agent statistics", body = AgentStatsResponse),
        (status = 403, description = "Agents and admins only", body = ApiError)
    ),
    tag = "agents"
)]
pub async fn agent_stats(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<AgentStatsResponse>, ApiError> {
    require_any_role(&user, &[Role::Agent, Role::Admin])?;
    let db = &state.db;

    let managed_properties = Property::find()
        .filter(property::Column::AgentId.eq(user.id))
        .count(db)
        .await?;
    let contracts_total = Contract::find()
        .filter(contract::Column::AgentId.eq(user.id))
        .count(db)
        .await?;
    let contracts_active = Contract::find()
        .filter(contract::Column::AgentId.eq(user.id))
        .filter(contract::Column::Status.eq(ContractStatus::Active))
        .count(db)
        .await?;
    let visits_planned = Visit::find()
        .filter(visit::Column::AgentId.eq(user.id))
        .filter(visit::Column::Status.is_in([VisitStatus::Planned, VisitStatus::Confirmed]))
        .count(db)
        .await?;
    let visits_completed = Visit::find()
        .filter(visit::Column::AgentId.eq(user.id))
        .filter(visit::Column::Status.eq(VisitStatus::Completed))
        .count(db)
        .await?;

    Ok(Json(AgentStatsResponse {
        agent_id: user.id,
        managed_properties,
        contracts_total,
        contracts_active,
        visits_planned,
        visits_completed,
    }))
}

/// List clients (owners and tenants)
#[utoipa::path(
    get,
    path = "/api/v1/clients",
    security(("bearer_auth" = [])),
    params(ListClientsQuery),
    responses(
        (status = 200, description = "Clients", body = ListResponse<UserDto>),
        (status = 400, description = "Role is not a client role", body = ApiError),
        (status = 403, description = "Admin only", body = ApiError)
    ),
    tag = "clients"
)]
pub async fn list_clients(
    State(state): State<AppState>,
    Query(query): Query<ListClientsQuery>,
) -> Result<Json<ListResponse<UserDto>>, ApiError> {
    let roles: Vec<Role> = match query.role {
        Some(role) if CLIENT_ROLES.contains(&role) => vec![role],
        Some(_) => {
            return Err(validation_error(
                "Request validation failed",
                serde_json::json!({ "fields": { "role": "must be owner or tenant" } }),
            ));
        }
        None => CLIENT_ROLES.to_vec(),
    };
    let clients = UserRepository::new(&state.db)
        .list_by_roles(&roles, query.status)
        .await?;
    Ok(Json(ListResponse::new(clients)))
}

/// Get a client
#[utoipa::path(
    get,
    path = "/api/v1/clients/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Client id")),
    responses(
        (status = 200, description = "Client", body = UserDto),
        (status = 404, description = "Client not found", body = ApiError)
    ),
    tag = "clients"
)]
pub async fn get_client(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserDto>, ApiError> {
    let client = load_with_role(&state, id, &CLIENT_ROLES, "CLIENT_NOT_FOUND").await?;
    Ok(Json(client.into()))
}

/// Update a client
#[utoipa::path(
    put,
    path = "/api/v1/clients/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Client id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Client updated", body = UserDto),
        (status = 404, description = "Client not found", body = ApiError)
    ),
    tag = "clients"
)]
pub async fn update_client(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<UserDto>, ApiError> {
    load_with_role(&state, id, &CLIENT_ROLES, "CLIENT_NOT_FOUND").await?;
    let changes = validate_changes(&state, request, true).await?;
    let client = UserRepository::new(&state.db).update(id, changes).await?;
    Ok(Json(client.into()))
}

/// Deactivate a client
#[utoipa::path(
    delete,
    path = "/api/v1/clients/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Client id")),
    responses(
        (status = 200, description = "Client deactivated", body = MessageResponse),
        (status = 404, description = "Client not found", body = ApiError)
    ),
    tag = "clients"
)]
pub async fn delete_client(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    load_with_role(&state, id, &CLIENT_ROLES, "CLIENT_NOT_FOUND").await?;
    UserRepository::new(&state.db)
        .set_status(id, UserStatus::Inactive)
        .await?;
    tracing::info!(client_id = %id, admin_id = %admin.id, "Client deactivated");
    Ok(Json(MessageResponse::new("Client deactivated")))
}

/// The caller's own profile
#[utoipa::path(
    get,
    path = "/api/v1/profile",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Profile", body = UserDto),
        (status = 401, description = "Missing or invalid session token", body = ApiError)
    ),
    tag = "profile"
)]
pub async fn get_profile(CurrentUser(user): CurrentUser) -> Json<UserDto> {
    Json(user.into())
}

/// Update the caller's own profile
#[utoipa::path(
    put,
    path = "/api/v1/profile",
    security(("bearer_auth" = [])),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserDto),
        (status = 400, description = "Validation failed or email taken", body = ApiError)
    ),
    tag = "profile"
)]
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<UserDto>, ApiError> {
    let changes = validate_changes(&state, request, false).await?;
    let updated = UserRepository::new(&state.db).update(user.id, changes).await?;
    Ok(Json(updated.into()))
}
