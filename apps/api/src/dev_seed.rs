use seatkeeper_core::{AppError, AppResult};
use seatkeeper_domain::{
    LicenseKey, Principal, Relation, Relationship, RelationshipSubject, Resource, Service, Subject,
    SubjectId,
};
use seatkeeper_infrastructure::InMemoryDirectory;
use tracing::info;

use crate::api_services::StoreHandle;

const DEV_SEED_ORG_ID: &str = "o1";
const DEV_SEED_SERVICE_ID: &str = "smarts";
const DEV_SEED_MAX_SEATS: u32 = 10;
const DEV_SEED_ADMIN_ID: &str = "o1-admin";
const DEV_SEED_ASSIGNED_ID: &str = "u1";
const DEV_SEED_DISABLED_ID: &str = "u12";
const DEV_SEED_MEMBER_COUNT: usize = 12;

/// Seeds organization `o1` with a ten-seat `smarts` license held by `u1`.
///
/// `o1-admin` administers the organization; `u12` is a disabled member.
pub async fn run(store: &StoreHandle, directory: &InMemoryDirectory) -> AppResult<()> {
    let key = LicenseKey::new(DEV_SEED_ORG_ID, DEV_SEED_SERVICE_ID)?;
    store.provision_license(&key, DEV_SEED_MAX_SEATS).await?;

    store
        .write_relationship(Relationship::new(
            Resource::org(DEV_SEED_ORG_ID),
            Relation::Admin,
            RelationshipSubject::principal(DEV_SEED_ADMIN_ID),
        ))
        .await?;
    directory
        .add_principal(Principal::new(DEV_SEED_ADMIN_ID, "Org Admin"))
        .await;

    for index in 1..=DEV_SEED_MEMBER_COUNT {
        let id = format!("u{index}");
        directory
            .add_principal(Principal::new(id.as_str(), format!("User {index}")))
            .await;
        directory
            .add_member(
                DEV_SEED_ORG_ID,
                Subject::new(id.as_str(), id != DEV_SEED_DISABLED_ID),
            )
            .await;
        store
            .write_relationship(Relationship::new(
                Resource::org(DEV_SEED_ORG_ID),
                Relation::Member,
                RelationshipSubject::principal(id),
            ))
            .await?;
    }

    let seeded = store
        .as_store()
        .assign_seats(
            &[SubjectId::from(DEV_SEED_ASSIGNED_ID)],
            &key,
            &Service::new(DEV_SEED_SERVICE_ID),
        )
        .await;
    match seeded {
        Ok(()) | Err(AppError::AlreadyAssigned(_)) => {}
        Err(error) => return Err(error),
    }

    info!(
        license = %key,
        max_seats = DEV_SEED_MAX_SEATS,
        admin = DEV_SEED_ADMIN_ID,
        "development seed applied"
    );
    Ok(())
}
