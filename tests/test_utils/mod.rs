//! Test utilities for database testing.
//!
//! In-memory SQLite databases with migrations applied, plus fixtures for the
//! accounts, catalog entries and properties most tests start from.

#![allow(dead_code)]

use std::sync::OnceLock;

use anyhow::Result;
use migration::{Migrator, MigratorTrait};
use realty::{
    config::AppConfig,
    lifecycle::{self, NewProperty},
    models::{Role, property, property_type, user},
    password::{Argon2Hasher, SecretHasher},
    repositories::{NewUser, PropertyTypeInput, PropertyTypeRepository, UserRepository},
    token::TokenService,
};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "password123";

/// Sets up an in-memory SQLite database with all migrations applied.
///
/// The pool holds a single connection; every new SQLite memory connection
/// would otherwise see its own empty database.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).sqlx_logging(false);
    let db = Database::connect(options).await?;

    Migrator::up(&db, None).await?;

    Ok(db)
}

/// Config suitable for tests: local profile, dev secret.
pub fn test_config() -> AppConfig {
    AppConfig {
        profile: "test".to_string(),
        database_url: "sqlite::memory:".to_string(),
        db_max_connections: 1,
        ..Default::default()
    }
}

/// Argon2 is slow in debug builds; hash the shared test password once.
fn password_hash() -> String {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| {
        Argon2Hasher::new()
            .hash(TEST_PASSWORD)
            .expect("hashing test password")
    })
    .clone()
}

/// Creates an active user whose password is [`TEST_PASSWORD`].
pub async fn create_user(db: &DatabaseConnection, role: Role) -> Result<user::Model> {
    let email = format!("{}-{}@example.fr", role, Uuid::new_v4().simple());
    create_user_with_email(db, role, &email).await
}

pub async fn create_user_with_email(
    db: &DatabaseConnection,
    role: Role,
    email: &str,
) -> Result<user::Model> {
    let user = UserRepository::new(db)
        .create(NewUser {
            first_name: "Test".to_string(),
            last_name: role.to_string(),
            email: email.to_string(),
            phone: None,
            password_hash: password_hash(),
            role,
        })
        .await?;
    Ok(user)
}

pub async fn create_property_type(
    db: &DatabaseConnection,
    label: &str,
) -> Result<property_type::Model> {
    let property_type = PropertyTypeRepository::new(db)
        .create(PropertyTypeInput {
            label: label.to_string(),
            description: None,
        })
        .await?;
    Ok(property_type)
}

/// A listing in Lyon with a monthly rent, created by its owner.
pub fn rental_listing(property_type_id: Uuid, rent: f64) -> NewProperty {
    NewProperty {
        property_type_id,
        title: "Appartement lumineux".to_string(),
        address: "12 rue de la République".to_string(),
        postal_code: "69002".to_string(),
        city: "Lyon".to_string(),
        living_area: 54.0,
        rooms: Some(3),
        bedrooms: Some(2),
        rent_price: Some(rent),
        monthly_charges: Some(80.0),
        deposit: Some(rent * 2.0),
        ..Default::default()
    }
}

pub async fn create_rental(
    db: &DatabaseConnection,
    owner: &user::Model,
    property_type_id: Uuid,
    rent: f64,
) -> Result<property::Model> {
    let property =
        lifecycle::create_property(db, owner, rental_listing(property_type_id, rent)).await?;
    Ok(property)
}

/// Bearer header value for `user`.
pub fn bearer_for(config: &AppConfig, user: &user::Model) -> String {
    let issued = TokenService::from_config(config)
        .issue(user.id, user.role)
        .expect("issuing test token");
    format!("Bearer {}", issued.token)
}
