use crate::db::connect;
use crate::{user, user_credentials, visitor};
use anyhow::Result;
use chrono::Utc;
use common::types::{Role, VisitorStatus};
use migration::MigratorTrait;
use sea_orm::{DatabaseConnection, EntityTrait};
use uuid::Uuid;

fn db_tests_disabled() -> bool {
    std::env::var("SKIP_DB_TESTS").is_ok() || std::env::var("DATABASE_URL").is_err()
}

async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = connect().await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

fn new_resident(society: &str) -> user::NewUser {
    user::NewUser {
        email: format!("resident_{}@example.com", Uuid::new_v4()),
        name: "Asha Resident".into(),
        role: Role::Resident,
        phone_number: "9876543210".into(),
        apartment: Some("A-101".into()),
        resident_id: Some("101".into()),
        society_id: Some(society.into()),
        verification_token: Some(Uuid::new_v4().to_string()),
    }
}

fn new_visitor(society: &str, added_by: Uuid) -> visitor::NewVisitor {
    visitor::NewVisitor {
        name: "Ravi".into(),
        phone_number: "9123456780".into(),
        purpose: "Delivery".into(),
        vehicle_number: Some("mh12ab1234".into()),
        image_url: None,
        resident_id: "101".into(),
        resident_name: "Asha Resident".into(),
        society_id: Some(society.into()),
        added_by,
        timestamp: Utc::now(),
    }
}

#[tokio::test]
async fn test_user_lifecycle() -> Result<()> {
    if db_tests_disabled() {
        return Ok(());
    }
    let db = setup_test_db().await?;
    let society = format!("society_{}", Uuid::new_v4());

    let form = new_resident(&society);
    let created = user::create(&db, &form).await?;
    assert!(!created.email_verified);
    assert_eq!(created.role()?, Role::Resident);

    let by_email = user::find_by_email(&db, &form.email.to_uppercase()).await?;
    assert_eq!(by_email.map(|u| u.id), Some(created.id));

    let token = form.verification_token.clone().unwrap();
    let by_token = user::find_by_verification_token(&db, &token).await?;
    assert_eq!(by_token.map(|u| u.id), Some(created.id));

    let verified = user::mark_verified(&db, created.id).await?;
    assert!(verified.email_verified);
    assert!(verified.verification_token.is_none());

    let found = user::find_resident(&db, &society, "101").await?;
    assert_eq!(found.map(|u| u.id), Some(created.id));

    user_credentials::upsert_password(&db, created.id, "hash-1".into(), "argon2").await?;
    let updated = user_credentials::upsert_password(&db, created.id, "hash-2".into(), "argon2").await?;
    assert_eq!(updated.password_hash, "hash-2");

    assert!(user::hard_delete(&db, created.id).await?);
    assert!(user_credentials::find_for_user(&db, created.id).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_visitor_status_and_cleanup() -> Result<()> {
    if db_tests_disabled() {
        return Ok(());
    }
    let db = setup_test_db().await?;
    let society = format!("society_{}", Uuid::new_v4());
    let watchman = Uuid::new_v4();

    let v = visitor::create(&db, &new_visitor(&society, watchman)).await?;
    assert_eq!(v.status()?, VisitorStatus::Pending);
    assert_eq!(v.vehicle_number.as_deref(), Some("MH12AB1234"));

    let approved = visitor::set_status(&db, v.id, VisitorStatus::Approved).await?.expect("row exists");
    assert_eq!(approved.status()?, VisitorStatus::Approved);
    assert_eq!(approved.resident_id, v.resident_id);
    assert!(visitor::set_status(&db, Uuid::new_v4(), VisitorStatus::Rejected).await?.is_none());

    visitor::create(&db, &new_visitor(&society, watchman)).await?;
    let removed = visitor::delete_by_society(&db, &society).await?;
    assert_eq!(removed.len(), 2);
    assert!(visitor::Entity::find_by_id(v.id).one(&db).await?.is_none());

    let other = format!("society_{}", Uuid::new_v4());
    visitor::create(&db, &new_visitor(&other, watchman)).await?;
    assert_eq!(visitor::delete_by_added_by(&db, watchman).await?.len(), 1);
    assert!(visitor::delete_by_added_by(&db, watchman).await?.is_empty());
    Ok(())
}
