//! Contract creation and closing, and the property status moves they imply.

use chrono::{Datelike, Months, NaiveDate, Utc};
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, DatabaseTransaction, EntityTrait, IntoActiveModel, Set,
    TransactionTrait,
};
use tracing::info;
use uuid::Uuid;

use super::LifecycleError;
use crate::models::contract::{self, Model as ContractModel};
use crate::models::user::Model as UserModel;
use crate::models::{Contract, ContractStatus, PropertyStatus, Role};
use crate::repositories::{ContractRepository, PropertyRepository, UserRepository, sequence};

#[derive(Debug, Clone)]
pub struct NewContract {
    pub property_id: Uuid,
    pub tenant_id: Uuid,
    pub start_date: NaiveDate,
    /// Derived from `start_date + duration_months` when absent.
    pub end_date: Option<NaiveDate>,
    pub duration_months: i32,
    /// Defaults to the property's asking rent.
    pub monthly_rent: Option<f64>,
    /// Defaults to the property's charges.
    pub monthly_charges: Option<f64>,
    /// Defaults to the property's deposit, or zero.
    pub deposit: Option<f64>,
    pub special_conditions: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ContractPatch {
    pub end_date: Option<NaiveDate>,
    pub monthly_rent: Option<f64>,
    pub monthly_charges: Option<f64>,
    pub special_conditions: Option<String>,
    pub status: Option<ContractStatus>,
}

/// `CONTRAT-<year>-<NNNN>`.
pub fn format_contract_number(year: i32, seq: i64) -> String {
    format!("CONTRAT-{year}-{seq:04}")
}

/// Signs a lease: the property goes from `available` to `rented` and a new
/// active contract is recorded, or nothing happens at all.
pub async fn create_contract(
    db: &DatabaseConnection,
    actor: &UserModel,
    input: NewContract,
) -> Result<ContractModel, LifecycleError> {
    if input.duration_months <= 0 {
        return Err(LifecycleError::Validation(
            "duration_months must be positive".into(),
        ));
    }
    let end_date = match input.end_date {
        Some(end) => end,
        None => input
            .start_date
            .checked_add_months(Months::new(input.duration_months.unsigned_abs()))
            .ok_or_else(|| LifecycleError::Validation("contract end date out of range".into()))?,
    };
    if end_date < input.start_date {
        return Err(LifecycleError::Validation(
            "end_date must not precede start_date".into(),
        ));
    }

    let txn = db.begin().await?;

    let properties = PropertyRepository::new(&txn);
    let property = properties
        .find_by_id(input.property_id)
        .await?
        .ok_or(LifecycleError::PropertyNotFound(input.property_id))?;

    let tenant = UserRepository::new(&txn)
        .find_by_id(input.tenant_id)
        .await?
        .filter(|user| user.role == Role::Tenant)
        .ok_or(LifecycleError::TenantNotFound(input.tenant_id))?;

    if property.status != PropertyStatus::Available {
        return Err(LifecycleError::PropertyUnavailable(property.id));
    }

    let monthly_rent = input
        .monthly_rent
        .or(property.rent_price)
        .ok_or_else(|| LifecycleError::Validation("monthly_rent is required".into()))?;
    let monthly_charges = input.monthly_charges.unwrap_or(property.monthly_charges);
    let deposit = input.deposit.or(property.deposit).unwrap_or(0.0);
    if monthly_rent < 0.0 || monthly_charges < 0.0 || deposit < 0.0 {
        return Err(LifecycleError::Validation(
            "amounts must not be negative".into(),
        ));
    }

    // Status is re-checked in the write itself so a concurrent signing loses here.
    if !properties.claim_for_rent(property.id).await? {
        return Err(LifecycleError::PropertyUnavailable(property.id));
    }

    let now = Utc::now();
    let year = now.year();
    let seq = sequence::next_value(&txn, &format!("contract:{year}")).await?;

    let contract = contract::ActiveModel {
        id: Set(Uuid::new_v4()),
        contract_number: Set(format_contract_number(year, seq)),
        property_id: Set(property.id),
        tenant_id: Set(tenant.id),
        agent_id: Set(Some(actor.id)),
        start_date: Set(input.start_date),
        end_date: Set(Some(end_date)),
        duration_months: Set(input.duration_months),
        monthly_rent: Set(monthly_rent),
        monthly_charges: Set(monthly_charges),
        deposit: Set(deposit),
        special_conditions: Set(input.special_conditions),
        status: Set(ContractStatus::Active),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    counter!("contracts_created_total").increment(1);
    info!(
        contract_id = %contract.id,
        contract_number = %contract.contract_number,
        property_id = %contract.property_id,
        tenant_id = %contract.tenant_id,
        agent_id = %actor.id,
        "Contract created; property rented"
    );

    Ok(contract)
}

/// Applies `patch`. Moving an active contract to terminated or cancelled
/// frees its property unless another active contract still holds it.
pub async fn update_contract(
    db: &DatabaseConnection,
    id: Uuid,
    patch: ContractPatch,
) -> Result<ContractModel, LifecycleError> {
    let txn = db.begin().await?;

    let existing = ContractRepository::new(&txn)
        .find_by_id(id)
        .await?
        .ok_or(LifecycleError::ContractNotFound(id))?;

    let previous_status = existing.status;
    let next_status = patch.status.unwrap_or(previous_status);
    check_transition(previous_status, next_status)?;

    if let Some(end_date) = patch.end_date
        && end_date < existing.start_date
    {
        return Err(LifecycleError::Validation(
            "end_date must not precede start_date".into(),
        ));
    }
    if patch.monthly_rent.is_some_and(|v| v < 0.0) || patch.monthly_charges.is_some_and(|v| v < 0.0)
    {
        return Err(LifecycleError::Validation(
            "amounts must not be negative".into(),
        ));
    }

    let property_id = existing.property_id;
    let mut active = existing.into_active_model();
    if let Some(end_date) = patch.end_date {
        active.end_date = Set(Some(end_date));
    }
    if let Some(monthly_rent) = patch.monthly_rent {
        active.monthly_rent = Set(monthly_rent);
    }
    if let Some(monthly_charges) = patch.monthly_charges {
        active.monthly_charges = Set(monthly_charges);
    }
    if let Some(special_conditions) = patch.special_conditions {
        active.special_conditions = Set(Some(special_conditions));
    }
    active.status = Set(next_status);
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&txn).await?;

    let closing = !previous_status.is_closed() && next_status.is_closed();
    let released = if closing {
        release_property(&txn, property_id).await?
    } else {
        false
    };

    txn.commit().await?;

    if closing {
        counter!("contracts_closed_total", "status" => next_status.as_str()).increment(1);
        info!(
            contract_id = %updated.id,
            property_id = %property_id,
            status = next_status.as_str(),
            property_released = released,
            "Contract closed"
        );
    }

    Ok(updated)
}

/// Status-only form of [`update_contract`].
pub async fn update_contract_status(
    db: &DatabaseConnection,
    id: Uuid,
    status: ContractStatus,
) -> Result<ContractModel, LifecycleError> {
    update_contract(
        db,
        id,
        ContractPatch {
            status: Some(status),
            ..Default::default()
        },
    )
    .await
}

/// Removes a contract. An active one frees its property like a termination.
pub async fn delete_contract(db: &DatabaseConnection, id: Uuid) -> Result<(), LifecycleError> {
    let txn = db.begin().await?;

    let existing = ContractRepository::new(&txn)
        .find_by_id(id)
        .await?
        .ok_or(LifecycleError::ContractNotFound(id))?;

    Contract::delete_by_id(existing.id).exec(&txn).await?;

    let released = if existing.status == ContractStatus::Active {
        release_property(&txn, existing.property_id).await?
    } else {
        false
    };

    txn.commit().await?;

    info!(
        contract_id = %existing.id,
        property_id = %existing.property_id,
        property_released = released,
        "Contract deleted"
    );
    Ok(())
}

fn check_transition(from: ContractStatus, to: ContractStatus) -> Result<(), LifecycleError> {
    if from == to || from == ContractStatus::Active {
        return Ok(());
    }
    Err(LifecycleError::InvalidTransition(format!(
        "contract is {} and cannot become {}",
        from.as_str(),
        to.as_str()
    )))
}

/// Frees the property when no active contract references it any more.
/// Must run after the closing write so the count excludes it.
async fn release_property(
    txn: &DatabaseTransaction,
    property_id: Uuid,
) -> Result<bool, LifecycleError> {
    let remaining = ContractRepository::new(txn)
        .count_active_for_property(property_id, None)
        .await?;
    if remaining > 0 {
        return Ok(false);
    }
    Ok(PropertyRepository::new(txn).release(property_id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_numbers_are_zero_padded() {
        assert_eq!(format_contract_number(2025, 1), "CONTRAT-2025-0001");
        assert_eq!(format_contract_number(2025, 42), "CONTRAT-2025-0042");
        assert_eq!(format_contract_number(2026, 12345), "CONTRAT-2026-12345");
    }

    #[test]
    fn active_contracts_may_close() {
        assert!(check_transition(ContractStatus::Active, ContractStatus::Terminated).is_ok());
        assert!(check_transition(ContractStatus::Active, ContractStatus::Cancelled).is_ok());
        assert!(check_transition(ContractStatus::Active, ContractStatus::Active).is_ok());
    }

    #[test]
    fn closed_contracts_stay_closed() {
        assert!(check_transition(ContractStatus::Terminated, ContractStatus::Terminated).is_ok());
        assert!(matches!(
            check_transition(ContractStatus::Terminated, ContractStatus::Active),
            Err(LifecycleError::InvalidTransition(_))
        ));
        assert!(matches!(
            check_transition(ContractStatus::Cancelled, ContractStatus::Terminated),
            Err(LifecycleError::InvalidTransition(_))
        ));
    }
}
