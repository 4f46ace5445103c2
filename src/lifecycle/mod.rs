//! # Lifecycle Rules
//!
//! Writes that span more than one row or table. Each operation opens its own
//! transaction; returning early with an error drops it, which rolls back.
//!
//! Property status invariant: a property is `rented` exactly when at least
//! one active contract references it. Only this module moves a property into
//! or out of `rented`.

use axum::http::StatusCode;
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

use crate::error::{ApiError, RepositoryError};

pub mod catalog;
pub mod contracts;
pub mod properties;
pub mod visits;

pub use catalog::{
    delete_characteristic, delete_property_type, remove_property_characteristic,
    set_property_characteristic,
};
pub use contracts::{
    ContractPatch, NewContract, create_contract, delete_contract, update_contract,
    update_contract_status,
};
pub use properties::{NewProperty, PropertyPatch, create_property, delete_property, update_property};
pub use visits::{NewVisit, VisitPatch, create_visit, update_visit};

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("property {0} not found")]
    PropertyNotFound(Uuid),
    #[error("tenant {0} not found")]
    TenantNotFound(Uuid),
    #[error("client {0} not found")]
    ClientNotFound(Uuid),
    #[error("owner {0} not found")]
    OwnerNotFound(Uuid),
    #[error("contract {0} not found")]
    ContractNotFound(Uuid),
    #[error("property type {0} not found")]
    PropertyTypeNotFound(Uuid),
    #[error("characteristic {0} not found")]
    CharacteristicNotFound(Uuid),
    #[error("visit {0} not found")]
    VisitNotFound(Uuid),
    #[error("property {0} is not available")]
    PropertyUnavailable(Uuid),
    #[error("invalid transition: {0}")]
    InvalidTransition(String),
    #[error("{0} is still referenced")]
    InUse(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl From<LifecycleError> for ApiError {
    fn from(error: LifecycleError) -> Self {
        let message = error.to_string();
        match error {
            LifecycleError::PropertyNotFound(_) => {
                ApiError::new(StatusCode::NOT_FOUND, "PROPERTY_NOT_FOUND", message)
            }
            LifecycleError::TenantNotFound(_) => {
                ApiError::new(StatusCode::NOT_FOUND, "TENANT_NOT_FOUND", message)
            }
            LifecycleError::ClientNotFound(_) => {
                ApiError::new(StatusCode::NOT_FOUND, "CLIENT_NOT_FOUND", message)
            }
            LifecycleError::OwnerNotFound(_) => {
                ApiError::new(StatusCode::NOT_FOUND, "OWNER_NOT_FOUND", message)
            }
            LifecycleError::ContractNotFound(_) => {
                ApiError::new(StatusCode::NOT_FOUND, "CONTRACT_NOT_FOUND", message)
            }
            LifecycleError::PropertyTypeNotFound(_) => {
                ApiError::new(StatusCode::NOT_FOUND, "PROPERTY_TYPE_NOT_FOUND", message)
            }
            LifecycleError::CharacteristicNotFound(_) => {
                ApiError::new(StatusCode::NOT_FOUND, "CHARACTERISTIC_NOT_FOUND", message)
            }
            LifecycleError::VisitNotFound(_) => {
                ApiError::new(StatusCode::NOT_FOUND, "VISIT_NOT_FOUND", message)
            }
            LifecycleError::PropertyUnavailable(_) => {
                ApiError::new(StatusCode::BAD_REQUEST, "PROPERTY_UNAVAILABLE", message)
            }
            LifecycleError::InvalidTransition(_) => {
                ApiError::new(StatusCode::BAD_REQUEST, "INVALID_TRANSITION", message)
            }
            LifecycleError::InUse(_) => ApiError::new(StatusCode::BAD_REQUEST, "IN_USE", message),
            LifecycleError::Forbidden(_) => {
                ApiError::new(StatusCode::FORBIDDEN, "FORBIDDEN", message)
            }
            LifecycleError::Validation(_) => {
                ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", message)
            }
            LifecycleError::Repository(err) => err.into(),
            LifecycleError::Database(err) => err.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_rule_failures_are_bad_requests() {
        let id = Uuid::new_v4();
        for (error, code) in [
            (LifecycleError::PropertyUnavailable(id), "PROPERTY_UNAVAILABLE"),
            (
                LifecycleError::InvalidTransition("terminated -> active".into()),
                "INVALID_TRANSITION",
            ),
            (LifecycleError::InUse("property type".into()), "IN_USE"),
        ] {
            let api: ApiError = error.into();
            assert_eq!(api.status, StatusCode::BAD_REQUEST);
            assert_eq!(&*api.code, code);
        }
    }

    #[test]
    fn missing_entities_are_not_found() {
        let api: ApiError = LifecycleError::TenantNotFound(Uuid::new_v4()).into();
        assert_eq!(api.status, StatusCode::NOT_FOUND);
        assert_eq!(&*api.code, "TENANT_NOT_FOUND");
    }

    #[test]
    fn ownership_failure_is_forbidden() {
        let api: ApiError = LifecycleError::Forbidden("not your property".into()).into();
        assert_eq!(api.status, StatusCode::FORBIDDEN);
    }
}
