//! Visit scheduling.

use chrono::{DateTime, Utc};
use sea_orm::{DatabaseConnection, IntoActiveModel, Set, TransactionTrait};
use tracing::info;
use uuid::Uuid;

use super::LifecycleError;
use crate::models::user::Model as UserModel;
use crate::models::visit::{self, Model as VisitModel};
use crate::models::{Role, VisitOutcome, VisitStatus};
use crate::repositories::{PropertyRepository, UserRepository, VisitRepository};

const DEFAULT_DURATION_MINUTES: i32 = 30;

#[derive(Debug, Clone)]
pub struct NewVisit {
    pub property_id: Uuid,
    /// Prospective owner or tenant attending the visit.
    pub client_id: Option<Uuid>,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: Option<i32>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct VisitPatch {
    pub scheduled_at: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i32>,
    pub status: Option<VisitStatus>,
    pub notes: Option<String>,
    pub outcome: Option<VisitOutcome>,
}

pub async fn create_visit(
    db: &DatabaseConnection,
    actor: &UserModel,
    input: NewVisit,
) -> Result<VisitModel, LifecycleError> {
    let duration = input.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES);
    check_duration(duration)?;

    let txn = db.begin().await?;

    PropertyRepository::new(&txn)
        .find_by_id(input.property_id)
        .await?
        .ok_or(LifecycleError::PropertyNotFound(input.property_id))?;

    if let Some(client_id) = input.client_id {
        UserRepository::new(&txn)
            .find_by_id(client_id)
            .await?
            .filter(|user| matches!(user.role, Role::Owner | Role::Tenant))
            .ok_or(LifecycleError::ClientNotFound(client_id))?;
    }

    let now = Utc::now();
    let created = VisitRepository::new(&txn)
        .insert(visit::ActiveModel {
            id: Set(Uuid::new_v4()),
            property_id: Set(input.property_id),
            agent_id: Set(actor.id),
            client_id: Set(input.client_id),
            scheduled_at: Set(input.scheduled_at.into()),
            duration_minutes: Set(duration),
            status: Set(VisitStatus::Planned),
            notes: Set(input.notes),
            outcome: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        })
        .await?;
    txn.commit().await?;

    info!(
        visit_id = %created.id,
        property_id = %created.property_id,
        agent_id = %actor.id,
        "Visit scheduled"
    );
    Ok(created)
}

pub async fn update_visit(
    db: &DatabaseConnection,
    id: Uuid,
    patch: VisitPatch,
) -> Result<VisitModel, LifecycleError> {
    if let Some(duration) = patch.duration_minutes {
        check_duration(duration)?;
    }

    let txn = db.begin().await?;
    let visits = VisitRepository::new(&txn);

    let existing = visits
        .find_by_id(id)
        .await?
        .ok_or(LifecycleError::VisitNotFound(id))?;

    let mut active = existing.into_active_model();
    if let Some(scheduled_at) = patch.scheduled_at {
        active.scheduled_at = Set(scheduled_at.into());
    }
    if let Some(duration) = patch.duration_minutes {
        active.duration_minutes = Set(duration);
    }
    if let Some(status) = patch.status {
        active.status = Set(status);
    }
    if let Some(notes) = patch.notes {
        active.notes = Set(Some(notes));
    }
    if let Some(outcome) = patch.outcome {
        active.outcome = Set(Some(outcome));
    }
    active.updated_at = Set(Utc::now().into());

    let updated = visits.save(active).await?;
    txn.commit().await?;
    Ok(updated)
}

fn check_duration(minutes: i32) -> Result<(), LifecycleError> {
    if !(1..=24 * 60).contains(&minutes) {
        return Err(LifecycleError::Validation(
            "duration_minutes must be between 1 and 1440".into(),
        ));
    }
    Ok(())
}
