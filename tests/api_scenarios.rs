//! End-to-end API scenarios driven through the router with `tower::oneshot`.

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use realty::{
    models::{Role, UserStatus},
    repositories::{PropertyTypeRepository, UserChanges, UserRepository},
    server::{AppState, create_app},
};
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

#[path = "test_utils/mod.rs"]
mod test_utils;

struct TestApp {
    router: Router,
    db: DatabaseConnection,
    config: realty::config::AppConfig,
}

impl TestApp {
    async fn new() -> Self {
        let db = test_utils::setup_test_db().await.unwrap();
        let config = test_utils::test_config();
        let router = create_app(AppState::new(config.clone(), db.clone()));
        Self { router, db, config }
    }

    fn bearer(&self, user: &realty::models::user::Model) -> String {
        test_utils::bearer_for(&self.config, user)
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        auth: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }
}

fn property_body(property_type_id: Uuid, owner_id: Option<Uuid>) -> Value {
    json!({
        "owner_id": owner_id,
        "property_type_id": property_type_id,
        "title": "T3 lumineux proche gare",
        "address": "4 place Bellecour",
        "postal_code": "69002",
        "city": "Lyon",
        "living_area": 68.5,
        "rooms": 3,
        "rent_price": 1100.0,
        "monthly_charges": 90.0,
        "deposit": 2200.0
    })
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send(Method::GET, "/api/v1/contracts", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
    assert_eq!(body["details"]["reason"], "missing_token");

    let (status, body) = app
        .send(
            Method::GET,
            "/api/v1/auth/me",
            Some("Bearer not-a-token"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["details"]["reason"], "malformed_token");

    let (status, _) = app.send(Method::GET, "/api/v1/properties", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn register_then_read_identity() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({
                "first_name": "Lucie",
                "last_name": "Bernard",
                "email": "lucie@example.fr",
                "password": "motdepasse"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["role"], "tenant");
    assert!(body["user"].get("password_hash").is_none());
    let token = body["token"].as_str().unwrap().to_string();

    let (status, me) = app
        .send(
            Method::GET,
            "/api/v1/auth/me",
            Some(&format!("Bearer {token}")),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "lucie@example.fr");

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "lucie@example.fr", "password": "nope-nope" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn disabled_account_token_stops_working() {
    let app = TestApp::new().await;
    let owner = test_utils::create_user(&app.db, Role::Owner).await.unwrap();
    let bearer = app.bearer(&owner);

    let (status, _) = app
        .send(Method::GET, "/api/v1/auth/me", Some(&bearer), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    UserRepository::new(&app.db)
        .update(
            owner.id,
            UserChanges {
                status: Some(UserStatus::Inactive),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let (status, body) = app
        .send(Method::GET, "/api/v1/auth/me", Some(&bearer), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["details"]["reason"], "account_disabled");
}

#[tokio::test]
async fn admin_routes_reject_other_roles() {
    let app = TestApp::new().await;
    let agent = test_utils::create_user(&app.db, Role::Agent).await.unwrap();
    let admin = test_utils::create_user(&app.db, Role::Admin).await.unwrap();

    let (status, body) = app
        .send(Method::GET, "/api/v1/agents", Some(&app.bearer(&agent)), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    let (status, body) = app
        .send(Method::GET, "/api/v1/agents", Some(&app.bearer(&admin)), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);

    let tenant = test_utils::create_user(&app.db, Role::Tenant).await.unwrap();
    for caller in [&agent, &tenant] {
        let (status, body) = app
            .send(
                Method::POST,
                "/api/v1/property-types",
                Some(&app.bearer(caller)),
                Some(json!({ "label": "Chalet" })),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "FORBIDDEN");
    }

    let chalet = PropertyTypeRepository::new(&app.db)
        .find_by_label("Chalet")
        .await
        .unwrap();
    assert!(chalet.is_none());
}

#[tokio::test]
async fn rental_flow_over_http() {
    let app = TestApp::new().await;
    let owner = test_utils::create_user(&app.db, Role::Owner).await.unwrap();
    let agent = test_utils::create_user(&app.db, Role::Agent).await.unwrap();
    let tenant = test_utils::create_user(&app.db, Role::Tenant).await.unwrap();
    let other_tenant = test_utils::create_user(&app.db, Role::Tenant).await.unwrap();
    let type_id = test_utils::create_property_type(&app.db, "Appartement")
        .await
        .unwrap()
        .id;

    // Tenants cannot list properties.
    let (status, _) = app
        .send(
            Method::POST,
            "/api/v1/properties",
            Some(&app.bearer(&tenant)),
            Some(property_body(type_id, None)),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, property) = app
        .send(
            Method::POST,
            "/api/v1/properties",
            Some(&app.bearer(&owner)),
            Some(property_body(type_id, None)),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(property["status"], "available");
    assert_eq!(property["owner_id"], owner.id.to_string());
    let property_id = property["id"].as_str().unwrap().to_string();

    let (status, page) = app
        .send(Method::GET, "/api/v1/properties?city=lyon", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);
    assert_eq!(page["total_pages"], 1);

    let lease = json!({
        "property_id": property_id,
        "tenant_id": tenant.id,
        "start_date": "2025-03-01",
        "duration_months": 36
    });

    let (status, _) = app
        .send(
            Method::POST,
            "/api/v1/contracts",
            Some(&app.bearer(&tenant)),
            Some(lease.clone()),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, contract) = app
        .send(
            Method::POST,
            "/api/v1/contracts",
            Some(&app.bearer(&agent)),
            Some(lease.clone()),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(contract["status"], "active");
    assert_eq!(contract["monthly_rent"], 1100.0);
    assert_eq!(contract["end_date"], "2028-03-01");
    let contract_id = contract["id"].as_str().unwrap().to_string();

    let (_, detail) = app
        .send(
            Method::GET,
            &format!("/api/v1/properties/{property_id}"),
            None,
            None,
        )
        .await;
    assert_eq!(detail["status"], "rented");
    assert_eq!(detail["property_type"]["label"], "Appartement");

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/contracts",
            Some(&app.bearer(&agent)),
            Some(json!({
                "property_id": property_id,
                "tenant_id": other_tenant.id,
                "start_date": "2025-04-01",
                "duration_months": 12
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "PROPERTY_UNAVAILABLE");

    // Reads are scoped to the caller.
    let (_, mine) = app
        .send(Method::GET, "/api/v1/contracts", Some(&app.bearer(&tenant)), None)
        .await;
    assert_eq!(mine["count"], 1);
    let (_, theirs) = app
        .send(
            Method::GET,
            "/api/v1/contracts",
            Some(&app.bearer(&other_tenant)),
            None,
        )
        .await;
    assert_eq!(theirs["count"], 0);
    let (status, _) = app
        .send(
            Method::GET,
            &format!("/api/v1/contracts/{contract_id}"),
            Some(&app.bearer(&other_tenant)),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (_, owned) = app
        .send(
            Method::GET,
            "/api/v1/owners/me/contracts",
            Some(&app.bearer(&owner)),
            None,
        )
        .await;
    assert_eq!(owned["count"], 1);

    let (status, closed) = app
        .send(
            Method::PUT,
            &format!("/api/v1/contracts/{contract_id}"),
            Some(&app.bearer(&agent)),
            Some(json!({ "status": "terminated" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(closed["status"], "terminated");

    let (_, detail) = app
        .send(
            Method::GET,
            &format!("/api/v1/properties/{property_id}"),
            None,
            None,
        )
        .await;
    assert_eq!(detail["status"], "available");

    // History blocks deletion.
    let (status, body) = app
        .send(
            Method::DELETE,
            &format!("/api/v1/properties/{property_id}"),
            Some(&app.bearer(&owner)),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "IN_USE");
}

#[tokio::test]
async fn unknown_property_is_not_found() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send(
            Method::GET,
            &format!("/api/v1/properties/{}", Uuid::new_v4()),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "PROPERTY_NOT_FOUND");

    let (status, _) = app
        .send(Method::GET, "/api/v1/properties/not-a-uuid", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn characteristics_attach_to_owned_properties() {
    let app = TestApp::new().await;
    realty::seeds::seed_catalog(&app.db).await.unwrap();
    let owner = test_utils::create_user(&app.db, Role::Owner).await.unwrap();

    let (_, types) = app
        .send(Method::GET, "/api/v1/property-types", None, None)
        .await;
    assert_eq!(types["count"], 7);
    let type_id: Uuid = types["data"][0]["id"].as_str().unwrap().parse().unwrap();

    let property = test_utils::create_rental(&app.db, &owner, type_id, 750.0)
        .await
        .unwrap();

    let (_, balcony) = app
        .send(
            Method::GET,
            "/api/v1/characteristics/category/exterior",
            None,
            None,
        )
        .await;
    let characteristic_id = balcony["data"][0]["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .send(
            Method::POST,
            &format!("/api/v1/properties/{}/characteristics", property.id),
            Some(&app.bearer(&owner)),
            Some(json!({ "characteristic_id": characteristic_id, "value": "12 m²" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, listed) = app
        .send(
            Method::GET,
            &format!("/api/v1/properties/{}/characteristics", property.id),
            None,
            None,
        )
        .await;
    assert_eq!(listed["count"], 1);
    assert_eq!(listed["data"][0]["value"], "12 m²");

    let admin = test_utils::create_user(&app.db, Role::Admin).await.unwrap();
    let (status, body) = app
        .send(
            Method::DELETE,
            &format!("/api/v1/characteristics/{characteristic_id}"),
            Some(&app.bearer(&admin)),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "IN_USE");

    let (status, body) = app
        .send(
            Method::DELETE,
            &format!("/api/v1/property-types/{type_id}"),
            Some(&app.bearer(&admin)),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "IN_USE");

    let (status, _) = app
        .send(
            Method::DELETE,
            &format!(
                "/api/v1/properties/{}/characteristics/{characteristic_id}",
                property.id
            ),
            Some(&app.bearer(&owner)),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .send(
            Method::DELETE,
            &format!("/api/v1/characteristics/{characteristic_id}"),
            Some(&app.bearer(&admin)),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}
