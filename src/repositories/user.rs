//! # User Repository
//!
//! Credential store access: account creation, lookups by id and email,
//! profile changes and soft status changes. Accounts are never deleted.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::user::{self, ActiveModel as UserActiveModel, Model as UserModel};
use crate::models::{Role, User, UserStatus};

/// Data for a new account; `password_hash` is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password_hash: String,
    pub role: Role,
}

/// Partial update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password_hash: Option<String>,
    pub status: Option<UserStatus>,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub struct UserRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> UserRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// Creates an account. A taken email yields [`RepositoryError::Conflict`].
    pub async fn create(&self, new_user: NewUser) -> Result<UserModel, RepositoryError> {
        let email = normalize_email(&new_user.email);
        if self.find_by_email(&email).await?.is_some() {
            return Err(RepositoryError::conflict("email already registered"));
        }

        let now = Utc::now();
        let user = UserActiveModel {
            id: Set(Uuid::new_v4()),
            first_name: Set(new_user.first_name.trim().to_string()),
            last_name: Set(new_user.last_name.trim().to_string()),
            email: Set(email),
            phone: Set(new_user.phone),
            password_hash: Set(new_user.password_hash),
            role: Set(new_user.role),
            status: Set(UserStatus::Active),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        user.insert(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<UserModel>, RepositoryError> {
        User::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn get(&self, id: Uuid) -> Result<UserModel, RepositoryError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("User"))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserModel>, RepositoryError> {
        User::find()
            .filter(user::Column::Email.eq(normalize_email(email)))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Lists accounts holding any of `roles`, newest first.
    pub async fn list_by_roles(
        &self,
        roles: &[Role],
        status: Option<UserStatus>,
    ) -> Result<Vec<UserModel>, RepositoryError> {
        let mut query = User::find().filter(user::Column::Role.is_in(roles.iter().copied()));
        if let Some(status) = status {
            query = query.filter(user::Column::Status.eq(status));
        }

        query
            .order_by_desc(user::Column::CreatedAt)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn count_by_role(&self, role: Role) -> Result<u64, RepositoryError> {
        User::find()
            .filter(user::Column::Role.eq(role))
            .count(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Applies `changes`. An email already used by another account is a conflict.
    pub async fn update(
        &self,
        id: Uuid,
        changes: UserChanges,
    ) -> Result<UserModel, RepositoryError> {
        let existing = self.get(id).await?;

        if let Some(email) = changes.email.as_deref().map(normalize_email)
            && email != existing.email
            && self
                .find_by_email(&email)
                .await?
                .is_some_and(|other| other.id != id)
        {
            return Err(RepositoryError::conflict("email already registered"));
        }

        let mut active = existing.into_active_model();
        if let Some(first_name) = changes.first_name {
            active.first_name = Set(first_name.trim().to_string());
        }
        if let Some(last_name) = changes.last_name {
            active.last_name = Set(last_name.trim().to_string());
        }
        if let Some(email) = changes.email {
            active.email = Set(normalize_email(&email));
        }
        if let Some(phone) = changes.phone {
            active.phone = Set(Some(phone));
        }
        if let Some(password_hash) = changes.password_hash {
            active.password_hash = Set(password_hash);
        }
        if let Some(status) = changes.status {
            active.status = Set(status);
        }
        active.updated_at = Set(Utc::now().into());

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Soft delete: accounts stay referenced by properties and contracts.
    pub async fn set_status(
        &self,
        id: Uuid,
        status: UserStatus,
    ) -> Result<UserModel, RepositoryError> {
        self.update(
            id,
            UserChanges {
                status: Some(status),
                ..Default::default()
            },
        )
        .await
    }
}
