//! Integration tests for the rules tying contracts and visits to property
//! availability.

use chrono::{Datelike, Duration, NaiveDate, Utc};
use realty::{
    lifecycle::{
        self, ContractPatch, LifecycleError, NewContract, NewProperty, NewVisit, PropertyPatch,
        VisitPatch,
    },
    models::{ContractStatus, PropertyStatus, Role, VisitOutcome, VisitStatus},
    repositories::{
        ContractFilter, ContractRepository, PropertyRepository, VisitRepository, sequence,
    },
};
use sea_orm::DatabaseConnection;
use uuid::Uuid;

#[path = "test_utils/mod.rs"]
mod test_utils;

struct Fixture {
    db: DatabaseConnection,
    owner: realty::models::user::Model,
    agent: realty::models::user::Model,
    tenant: realty::models::user::Model,
    type_id: Uuid,
}

async fn fixture() -> Fixture {
    let db = test_utils::setup_test_db().await.unwrap();
    let owner = test_utils::create_user(&db, Role::Owner).await.unwrap();
    let agent = test_utils::create_user(&db, Role::Agent).await.unwrap();
    let tenant = test_utils::create_user(&db, Role::Tenant).await.unwrap();
    let type_id = test_utils::create_property_type(&db, "Appartement")
        .await
        .unwrap()
        .id;
    Fixture {
        db,
        owner,
        agent,
        tenant,
        type_id,
    }
}

fn lease(property_id: Uuid, tenant_id: Uuid) -> NewContract {
    NewContract {
        property_id,
        tenant_id,
        start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        end_date: None,
        duration_months: 12,
        monthly_rent: None,
        monthly_charges: None,
        deposit: None,
        special_conditions: None,
    }
}

async fn property_status(db: &DatabaseConnection, id: Uuid) -> PropertyStatus {
    PropertyRepository::new(db)
        .find_by_id(id)
        .await
        .unwrap()
        .unwrap()
        .status
}

#[tokio::test]
async fn signing_a_contract_rents_the_property() {
    let f = fixture().await;
    let property = test_utils::create_rental(&f.db, &f.owner, f.type_id, 950.0)
        .await
        .unwrap();
    assert_eq!(property.status, PropertyStatus::Available);
    assert!(property.reference.starts_with("BIEN-"));

    let contract = lifecycle::create_contract(&f.db, &f.agent, lease(property.id, f.tenant.id))
        .await
        .unwrap();

    assert_eq!(contract.status, ContractStatus::Active);
    assert_eq!(contract.agent_id, Some(f.agent.id));
    assert_eq!(contract.monthly_rent, 950.0);
    assert_eq!(contract.monthly_charges, 80.0);
    assert_eq!(contract.deposit, 1900.0);
    assert_eq!(
        contract.end_date,
        NaiveDate::from_ymd_opt(2026, 1, 1)
    );
    assert_eq!(
        contract.contract_number,
        format!("CONTRAT-{}-0001", Utc::now().year())
    );
    assert_eq!(property_status(&f.db, property.id).await, PropertyStatus::Rented);
}

#[tokio::test]
async fn contract_numbers_increase_per_year() {
    let f = fixture().await;
    let first = test_utils::create_rental(&f.db, &f.owner, f.type_id, 700.0)
        .await
        .unwrap();
    let second = test_utils::create_rental(&f.db, &f.owner, f.type_id, 800.0)
        .await
        .unwrap();

    let a = lifecycle::create_contract(&f.db, &f.agent, lease(first.id, f.tenant.id))
        .await
        .unwrap();
    let b = lifecycle::create_contract(&f.db, &f.agent, lease(second.id, f.tenant.id))
        .await
        .unwrap();

    let year = Utc::now().year();
    assert_eq!(a.contract_number, format!("CONTRAT-{year}-0001"));
    assert_eq!(b.contract_number, format!("CONTRAT-{year}-0002"));
}

#[tokio::test]
async fn rented_property_cannot_be_leased_again() {
    let f = fixture().await;
    let property = test_utils::create_rental(&f.db, &f.owner, f.type_id, 950.0)
        .await
        .unwrap();
    lifecycle::create_contract(&f.db, &f.agent, lease(property.id, f.tenant.id))
        .await
        .unwrap();

    let counter = format!("contract:{}", Utc::now().year());
    let numbered = sequence::current_value(&f.db, &counter).await.unwrap();

    let other_tenant = test_utils::create_user(&f.db, Role::Tenant).await.unwrap();
    let err = lifecycle::create_contract(&f.db, &f.agent, lease(property.id, other_tenant.id))
        .await
        .unwrap_err();

    assert!(matches!(err, LifecycleError::PropertyUnavailable(id) if id == property.id));
    assert_eq!(
        ContractRepository::new(&f.db)
            .count_for_property(property.id)
            .await
            .unwrap(),
        1
    );
    assert_eq!(numbered, 1);
    assert_eq!(
        sequence::current_value(&f.db, &counter).await.unwrap(),
        numbered
    );
    assert!(
        ContractRepository::new(&f.db)
            .list(&ContractFilter {
                tenant_id: Some(other_tenant.id),
                ..Default::default()
            })
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn concurrent_signings_produce_one_contract() {
    let f = fixture().await;
    let property = test_utils::create_rental(&f.db, &f.owner, f.type_id, 950.0)
        .await
        .unwrap();
    let other_tenant = test_utils::create_user(&f.db, Role::Tenant).await.unwrap();

    let (a, b) = tokio::join!(
        lifecycle::create_contract(&f.db, &f.agent, lease(property.id, f.tenant.id)),
        lifecycle::create_contract(&f.db, &f.agent, lease(property.id, other_tenant.id)),
    );

    assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
    let err = a.err().or(b.err()).unwrap();
    assert!(matches!(err, LifecycleError::PropertyUnavailable(_)));
    assert_eq!(
        ContractRepository::new(&f.db)
            .count_active_for_property(property.id, None)
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn unknown_or_non_tenant_party_is_rejected() {
    let f = fixture().await;
    let property = test_utils::create_rental(&f.db, &f.owner, f.type_id, 950.0)
        .await
        .unwrap();

    let err = lifecycle::create_contract(&f.db, &f.agent, lease(property.id, f.owner.id))
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::TenantNotFound(_)));

    let err = lifecycle::create_contract(&f.db, &f.agent, lease(Uuid::new_v4(), f.tenant.id))
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::PropertyNotFound(_)));

    // Nothing was half-applied.
    assert_eq!(property_status(&f.db, property.id).await, PropertyStatus::Available);
}

#[tokio::test]
async fn terminating_a_contract_frees_the_property() {
    let f = fixture().await;
    let property = test_utils::create_rental(&f.db, &f.owner, f.type_id, 950.0)
        .await
        .unwrap();
    let contract = lifecycle::create_contract(&f.db, &f.agent, lease(property.id, f.tenant.id))
        .await
        .unwrap();

    let terminated =
        lifecycle::update_contract_status(&f.db, contract.id, ContractStatus::Terminated)
            .await
            .unwrap();
    assert_eq!(terminated.status, ContractStatus::Terminated);
    assert_eq!(property_status(&f.db, property.id).await, PropertyStatus::Available);

    // And it can be leased again.
    let next = lifecycle::create_contract(&f.db, &f.agent, lease(property.id, f.tenant.id))
        .await
        .unwrap();
    assert_eq!(next.status, ContractStatus::Active);
}

#[tokio::test]
async fn closed_contract_cannot_be_reactivated() {
    let f = fixture().await;
    let property = test_utils::create_rental(&f.db, &f.owner, f.type_id, 950.0)
        .await
        .unwrap();
    let contract = lifecycle::create_contract(&f.db, &f.agent, lease(property.id, f.tenant.id))
        .await
        .unwrap();
    lifecycle::update_contract_status(&f.db, contract.id, ContractStatus::Cancelled)
        .await
        .unwrap();

    let err = lifecycle::update_contract_status(&f.db, contract.id, ContractStatus::Active)
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::InvalidTransition(_)));
    assert_eq!(property_status(&f.db, property.id).await, PropertyStatus::Available);
}

#[tokio::test]
async fn editing_terms_keeps_property_rented() {
    let f = fixture().await;
    let property = test_utils::create_rental(&f.db, &f.owner, f.type_id, 950.0)
        .await
        .unwrap();
    let contract = lifecycle::create_contract(&f.db, &f.agent, lease(property.id, f.tenant.id))
        .await
        .unwrap();

    let updated = lifecycle::update_contract(
        &f.db,
        contract.id,
        ContractPatch {
            monthly_rent: Some(990.0),
            special_conditions: Some("Animaux acceptés".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(updated.monthly_rent, 990.0);
    assert_eq!(updated.status, ContractStatus::Active);
    assert_eq!(property_status(&f.db, property.id).await, PropertyStatus::Rented);
}

#[tokio::test]
async fn deleting_an_active_contract_frees_the_property() {
    let f = fixture().await;
    let property = test_utils::create_rental(&f.db, &f.owner, f.type_id, 950.0)
        .await
        .unwrap();
    let contract = lifecycle::create_contract(&f.db, &f.agent, lease(property.id, f.tenant.id))
        .await
        .unwrap();

    lifecycle::delete_contract(&f.db, contract.id).await.unwrap();

    assert_eq!(property_status(&f.db, property.id).await, PropertyStatus::Available);
    assert!(matches!(
        lifecycle::delete_contract(&f.db, contract.id).await,
        Err(LifecycleError::ContractNotFound(_))
    ));
}

#[tokio::test]
async fn rented_status_is_only_reachable_through_contracts() {
    let f = fixture().await;

    let err = lifecycle::create_property(
        &f.db,
        &f.owner,
        NewProperty {
            status: Some(PropertyStatus::Rented),
            ..test_utils::rental_listing(f.type_id, 500.0)
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, LifecycleError::InvalidTransition(_)));

    let property = test_utils::create_rental(&f.db, &f.owner, f.type_id, 500.0)
        .await
        .unwrap();
    let err = lifecycle::update_property(
        &f.db,
        &f.owner,
        property.id,
        PropertyPatch {
            status: Some(PropertyStatus::Rented),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, LifecycleError::InvalidTransition(_)));

    lifecycle::create_contract(&f.db, &f.agent, lease(property.id, f.tenant.id))
        .await
        .unwrap();
    let err = lifecycle::update_property(
        &f.db,
        &f.owner,
        property.id,
        PropertyPatch {
            status: Some(PropertyStatus::Available),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, LifecycleError::InvalidTransition(_)));
}

#[tokio::test]
async fn only_owner_or_admin_edits_a_property() {
    let f = fixture().await;
    let property = test_utils::create_rental(&f.db, &f.owner, f.type_id, 500.0)
        .await
        .unwrap();
    let stranger = test_utils::create_user(&f.db, Role::Owner).await.unwrap();
    let admin = test_utils::create_user(&f.db, Role::Admin).await.unwrap();

    let patch = || PropertyPatch {
        title: Some("Appartement rénové".to_string()),
        ..Default::default()
    };

    let err = lifecycle::update_property(&f.db, &stranger, property.id, patch())
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::Forbidden(_)));

    let updated = lifecycle::update_property(&f.db, &admin, property.id, patch())
        .await
        .unwrap();
    assert_eq!(updated.title, "Appartement rénové");
}

#[tokio::test]
async fn agents_list_on_behalf_of_owners() {
    let f = fixture().await;

    let err = lifecycle::create_property(
        &f.db,
        &f.agent,
        test_utils::rental_listing(f.type_id, 500.0),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, LifecycleError::Validation(_)));

    let err = lifecycle::create_property(
        &f.db,
        &f.agent,
        NewProperty {
            owner_id: Some(f.tenant.id),
            ..test_utils::rental_listing(f.type_id, 500.0)
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, LifecycleError::OwnerNotFound(_)));

    let property = lifecycle::create_property(
        &f.db,
        &f.agent,
        NewProperty {
            owner_id: Some(f.owner.id),
            ..test_utils::rental_listing(f.type_id, 500.0)
        },
    )
    .await
    .unwrap();
    assert_eq!(property.owner_id, f.owner.id);
    assert_eq!(property.agent_id, Some(f.agent.id));
    assert_eq!(property.country, "France");

    let err = lifecycle::create_property(
        &f.db,
        &f.tenant,
        test_utils::rental_listing(f.type_id, 500.0),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, LifecycleError::Forbidden(_)));
}

#[tokio::test]
async fn property_with_contract_history_cannot_be_deleted() {
    let f = fixture().await;
    let property = test_utils::create_rental(&f.db, &f.owner, f.type_id, 500.0)
        .await
        .unwrap();
    let contract = lifecycle::create_contract(&f.db, &f.agent, lease(property.id, f.tenant.id))
        .await
        .unwrap();
    lifecycle::update_contract_status(&f.db, contract.id, ContractStatus::Terminated)
        .await
        .unwrap();

    let err = lifecycle::delete_property(&f.db, &f.owner, property.id)
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::InUse(_)));
}

#[tokio::test]
async fn deleting_a_property_removes_its_visits() {
    let f = fixture().await;
    let property = test_utils::create_rental(&f.db, &f.owner, f.type_id, 500.0)
        .await
        .unwrap();
    let visit = lifecycle::create_visit(
        &f.db,
        &f.agent,
        NewVisit {
            property_id: property.id,
            client_id: Some(f.tenant.id),
            scheduled_at: Utc::now() + Duration::days(2),
            duration_minutes: None,
            notes: None,
        },
    )
    .await
    .unwrap();

    lifecycle::delete_property(&f.db, &f.owner, property.id)
        .await
        .unwrap();

    assert!(
        PropertyRepository::new(&f.db)
            .find_by_id(property.id)
            .await
            .unwrap()
            .is_none()
    );
    assert!(
        VisitRepository::new(&f.db)
            .find_by_id(visit.id)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn visits_are_scheduled_and_completed() {
    let f = fixture().await;
    let property = test_utils::create_rental(&f.db, &f.owner, f.type_id, 500.0)
        .await
        .unwrap();

    let visit = lifecycle::create_visit(
        &f.db,
        &f.agent,
        NewVisit {
            property_id: property.id,
            client_id: Some(f.tenant.id),
            scheduled_at: Utc::now() + Duration::days(1),
            duration_minutes: None,
            notes: Some("Premier passage".to_string()),
        },
    )
    .await
    .unwrap();
    assert_eq!(visit.status, VisitStatus::Planned);
    assert_eq!(visit.duration_minutes, 30);
    assert_eq!(visit.agent_id, f.agent.id);

    let done = lifecycle::update_visit(
        &f.db,
        visit.id,
        VisitPatch {
            status: Some(VisitStatus::Completed),
            outcome: Some(VisitOutcome::Interested),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(done.status, VisitStatus::Completed);
    assert_eq!(done.outcome, Some(VisitOutcome::Interested));

    // Visits never touch availability.
    assert_eq!(property_status(&f.db, property.id).await, PropertyStatus::Available);
}

#[tokio::test]
async fn visit_client_must_be_a_customer() {
    let f = fixture().await;
    let property = test_utils::create_rental(&f.db, &f.owner, f.type_id, 500.0)
        .await
        .unwrap();

    let err = lifecycle::create_visit(
        &f.db,
        &f.agent,
        NewVisit {
            property_id: property.id,
            client_id: Some(f.agent.id),
            scheduled_at: Utc::now(),
            duration_minutes: Some(45),
            notes: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, LifecycleError::ClientNotFound(_)));

    let err = lifecycle::create_visit(
        &f.db,
        &f.agent,
        NewVisit {
            property_id: property.id,
            client_id: None,
            scheduled_at: Utc::now(),
            duration_minutes: Some(0),
            notes: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, LifecycleError::Validation(_)));
}

#[tokio::test]
async fn expiring_contracts_fall_inside_the_window() {
    let f = fixture().await;
    let property = test_utils::create_rental(&f.db, &f.owner, f.type_id, 500.0)
        .await
        .unwrap();
    let today = Utc::now().date_naive();
    lifecycle::create_contract(
        &f.db,
        &f.agent,
        NewContract {
            start_date: today - Duration::days(300),
            end_date: Some(today + Duration::days(10)),
            ..lease(property.id, f.tenant.id)
        },
    )
    .await
    .unwrap();

    let contracts = ContractRepository::new(&f.db);
    assert_eq!(contracts.expiring(today, 30).await.unwrap().len(), 1);
    assert!(contracts.expiring(today, 5).await.unwrap().is_empty());
}

#[tokio::test]
async fn statistics_count_by_status() {
    let f = fixture().await;
    let rented = test_utils::create_rental(&f.db, &f.owner, f.type_id, 900.0)
        .await
        .unwrap();
    test_utils::create_rental(&f.db, &f.owner, f.type_id, 600.0)
        .await
        .unwrap();
    lifecycle::create_contract(&f.db, &f.agent, lease(rented.id, f.tenant.id))
        .await
        .unwrap();

    let stats = PropertyRepository::new(&f.db)
        .stats(Some(f.owner.id))
        .await
        .unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.rented, 1);
    assert_eq!(stats.available, 1);
    assert_eq!(stats.total_monthly_rent, 900.0);
    assert_eq!(stats.by_type, vec![(f.type_id, 2)]);
}
