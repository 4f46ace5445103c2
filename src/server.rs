//! # Server Configuration
//!
//! Router assembly, shared state and the HTTP listener for the realty API.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    http::{HeaderValue, StatusCode},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
};
use sea_orm::DatabaseConnection;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::{auth_middleware, require_admin};
use crate::config::AppConfig;
use crate::handlers::{self, auth, catalog, contracts, owners, properties, users, visits};
use crate::password::{Argon2Hasher, SecretHasher};
use crate::telemetry::trace_id_middleware;
use crate::token::TokenService;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub tokens: Arc<TokenService>,
    pub hasher: Arc<dyn SecretHasher>,
}

impl AppState {
    pub fn new(config: AppConfig, db: DatabaseConnection) -> Self {
        let tokens = TokenService::from_config(&config);
        Self {
            db,
            config: Arc::new(config),
            tokens: Arc::new(tokens),
            hasher: Arc::new(Argon2Hasher::new()),
        }
    }
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/admin/login", post(auth::admin_login))
        .route("/properties", get(properties::list_properties))
        .route(
            "/properties/available",
            get(properties::list_available_properties),
        )
        .route("/properties/search", post(properties::search_properties))
        .route("/properties/{id}", get(properties::get_property))
        .route(
            "/properties/{id}/characteristics",
            get(properties::list_property_characteristics),
        )
        .route("/property-types", get(catalog::list_property_types))
        .route("/property-types/{id}", get(catalog::get_property_type))
        .route("/characteristics", get(catalog::list_characteristics))
        .route(
            "/characteristics/categories",
            get(catalog::list_categories),
        )
        .route(
            "/characteristics/category/{category}",
            get(catalog::characteristics_by_category),
        )
        .route("/characteristics/{id}", get(catalog::get_characteristic))
}

fn authenticated_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(auth::me))
        .route("/agents/stats", get(users::agent_stats))
        .route(
            "/profile",
            get(users::get_profile).put(users::update_profile),
        )
        .route("/properties", post(properties::create_property))
        .route(
            "/properties/statistics",
            get(properties::property_statistics),
        )
        .route(
            "/properties/owner/{id}",
            get(properties::properties_by_owner),
        )
        .route(
            "/properties/{id}",
            put(properties::update_property).delete(properties::delete_property),
        )
        .route(
            "/properties/{id}/characteristics",
            post(properties::attach_characteristic),
        )
        .route(
            "/properties/{id}/characteristics/{characteristic_id}",
            put(properties::update_property_characteristic)
                .delete(properties::detach_characteristic),
        )
        .route(
            "/contracts",
            get(contracts::list_contracts).post(contracts::create_contract),
        )
        .route("/contracts/expiring", get(contracts::expiring_contracts))
        .route(
            "/contracts/tenant/{id}",
            get(contracts::contracts_by_tenant),
        )
        .route(
            "/contracts/property/{id}",
            get(contracts::contracts_by_property),
        )
        .route(
            "/contracts/{id}",
            get(contracts::get_contract).put(contracts::update_contract),
        )
        .route(
            "/visits",
            get(visits::list_visits).post(visits::create_visit),
        )
        .route("/visits/agent/{id}", get(visits::visits_by_agent))
        .route("/visits/property/{id}", get(visits::visits_by_property))
        .route(
            "/visits/{id}",
            get(visits::get_visit).put(visits::update_visit),
        )
        .route("/owners/me/properties", get(owners::my_properties))
        .route("/owners/me/contracts", get(owners::my_contracts))
        .route("/owners/me/statistics", get(owners::my_statistics))
}

fn admin_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/agents",
            get(users::list_agents).post(users::create_agent),
        )
        .route(
            "/agents/{id}",
            get(users::get_agent)
                .put(users::update_agent)
                .delete(users::delete_agent),
        )
        .route("/clients", get(users::list_clients))
        .route(
            "/clients/{id}",
            get(users::get_client)
                .put(users::update_client)
                .delete(users::delete_client),
        )
        .route("/property-types", post(catalog::create_property_type))
        .route(
            "/property-types/{id}",
            put(catalog::update_property_type).delete(catalog::delete_property_type),
        )
        .route("/characteristics", post(catalog::create_characteristic))
        .route(
            "/characteristics/{id}",
            put(catalog::update_characteristic).delete(catalog::delete_characteristic),
        )
        .route(
            "/contracts/{id}",
            axum::routing::delete(contracts::delete_contract),
        )
        .route("/visits/{id}", axum::routing::delete(visits::delete_visit))
}

/// Requests running past `request_timeout_ms` are answered with 408.
fn timeout_layer(config: &AppConfig) -> TimeoutLayer {
    TimeoutLayer::with_status_code(
        StatusCode::REQUEST_TIMEOUT,
        Duration::from_millis(config.request_timeout_ms),
    )
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if config.cors_allowed_origins.is_empty() {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();
    layer.allow_origin(origins)
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let authenticated = authenticated_routes()
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));
    // Layers run outermost-last: authentication first, then the admin check.
    let admin = admin_routes()
        .route_layer(from_fn(require_admin))
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    let api = public_routes().merge(authenticated).merge(admin);

    let timeout = timeout_layer(&state.config);
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .nest("/api/v1", api)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(timeout)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(trace_id_middleware))
}

/// Starts the server with the given configuration
pub async fn run_server(config: AppConfig, db: DatabaseConnection) -> anyhow::Result<()> {
    let addr = config.bind_addr()?;
    let profile = config.profile.clone();
    let app = create_app(AppState::new(config, db));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, %profile, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

struct BearerSecurity;

impl Modify for BearerSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz,
        crate::handlers::readyz,
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::admin_login,
        crate::handlers::auth::me,
        crate::handlers::users::list_agents,
        crate::handlers::users::create_agent,
        crate::handlers::users::get_agent,
        crate::handlers::users::update_agent,
        crate::handlers::users::delete_agent,
        crate::handlers::users::agent_stats,
        crate::handlers::users::list_clients,
        crate::handlers::users::get_client,
        crate::handlers::users::update_client,
        crate::handlers::users::delete_client,
        crate::handlers::users::get_profile,
        crate::handlers::users::update_profile,
        crate::handlers::properties::list_properties,
        crate::handlers::properties::list_available_properties,
        crate::handlers::properties::search_properties,
        crate::handlers::properties::property_statistics,
        crate::handlers::properties::properties_by_owner,
        crate::handlers::properties::get_property,
        crate::handlers::properties::create_property,
        crate::handlers::properties::update_property,
        crate::handlers::properties::delete_property,
        crate::handlers::properties::list_property_characteristics,
        crate::handlers::properties::attach_characteristic,
        crate::handlers::properties::update_property_characteristic,
        crate::handlers::properties::detach_characteristic,
        crate::handlers::catalog::list_property_types,
        crate::handlers::catalog::get_property_type,
        crate::handlers::catalog::create_property_type,
        crate::handlers::catalog::update_property_type,
        crate::handlers::catalog::delete_property_type,
        crate::handlers::catalog::list_characteristics,
        crate::handlers::catalog::list_categories,
        crate::handlers::catalog::characteristics_by_category,
        crate::handlers::catalog::get_characteristic,
        crate::handlers::catalog::create_characteristic,
        crate::handlers::catalog::update_characteristic,
        crate::handlers::catalog::delete_characteristic,
        crate::handlers::contracts::list_contracts,
        crate::handlers::contracts::create_contract,
        crate::handlers::contracts::expiring_contracts,
        crate::handlers::contracts::contracts_by_tenant,
        crate::handlers::contracts::contracts_by_property,
        crate::handlers::contracts::get_contract,
        crate::handlers::contracts::update_contract,
        crate::handlers::contracts::delete_contract,
        crate::handlers::visits::list_visits,
        crate::handlers::visits::create_visit,
        crate::handlers::visits::visits_by_agent,
        crate::handlers::visits::visits_by_property,
        crate::handlers::visits::get_visit,
        crate::handlers::visits::update_visit,
        crate::handlers::visits::delete_visit,
        crate::handlers::owners::my_properties,
        crate::handlers::owners::my_contracts,
        crate::handlers::owners::my_statistics,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::error::ApiError,
            crate::handlers::HealthResponse,
            crate::handlers::types::UserDto,
            crate::handlers::types::PropertyDto,
            crate::handlers::types::PropertyTypeDto,
            crate::handlers::types::CharacteristicDto,
            crate::handlers::types::PropertyCharacteristicDto,
            crate::handlers::types::ContractDto,
            crate::handlers::types::VisitDto,
            crate::handlers::types::MessageResponse,
            crate::handlers::auth::RegisterRequest,
            crate::handlers::auth::LoginRequest,
            crate::handlers::auth::AuthResponse,
            crate::handlers::users::CreateUserRequest,
            crate::handlers::users::UpdateUserRequest,
            crate::handlers::users::AgentStatsResponse,
            crate::handlers::properties::CreatePropertyRequest,
            crate::handlers::properties::UpdatePropertyRequest,
            crate::handlers::properties::SearchPropertiesRequest,
            crate::handlers::properties::PropertyDetailResponse,
            crate::handlers::properties::PropertyStatsResponse,
            crate::handlers::properties::TypeCount,
            crate::handlers::properties::AttachCharacteristicRequest,
            crate::handlers::properties::CharacteristicValueRequest,
            crate::handlers::catalog::PropertyTypeRequest,
            crate::handlers::catalog::CharacteristicRequest,
            crate::handlers::catalog::CategoriesResponse,
            crate::handlers::contracts::CreateContractRequest,
            crate::handlers::contracts::UpdateContractRequest,
            crate::handlers::visits::CreateVisitRequest,
            crate::handlers::visits::UpdateVisitRequest,
            crate::models::Role,
            crate::models::UserStatus,
            crate::models::PropertyStatus,
            crate::models::PropertyCondition,
            crate::models::ContractStatus,
            crate::models::VisitStatus,
            crate::models::VisitOutcome,
            crate::models::CharacteristicCategory,
        )
    ),
    modifiers(&BearerSecurity),
    info(
        title = "Realty API",
        description = "Real-estate agency back end: properties, contracts, visits and accounts",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
