use sea_orm::{DatabaseConnection, EntityTrait};
use uuid::Uuid;

use models::user::NewUser;

use crate::auth::domain::{AuthUser, Credentials};
use crate::auth::errors::AuthError;
use crate::auth::repository::AuthRepository;

pub struct SeaOrmAuthRepository {
    pub db: DatabaseConnection,
}

impl SeaOrmAuthRepository {
    pub fn new(db: DatabaseConnection) -> Self { Self { db } }
}

/// Rows with an unrecognised role are reported as repository errors.
fn to_domain(u: models::user::Model) -> Result<AuthUser, AuthError> {
    let role = u.role().map_err(|e| AuthError::Repository(e.to_string()))?;
    Ok(AuthUser {
        id: u.id,
        email: u.email,
        name: u.name,
        role,
        phone_number: u.phone_number,
        apartment: u.apartment,
        resident_id: u.resident_id,
        society_id: u.society_id,
        image_url: u.image_url,
        email_verified: u.email_verified,
    })
}

fn creds_to_domain(c: models::user_credentials::Model) -> Credentials {
    Credentials { user_id: c.user_id, password_hash: c.password_hash, password_algorithm: c.password_algorithm }
}

#[async_trait::async_trait]
impl AuthRepository for SeaOrmAuthRepository {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, AuthError> {
        models::user::find_by_email(&self.db, email).await?.map(to_domain).transpose()
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<AuthUser>, AuthError> {
        let res = models::user::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| AuthError::Repository(e.to_string()))?;
        res.map(to_domain).transpose()
    }

    async fn find_user_by_verification_token(&self, token: &str) -> Result<Option<AuthUser>, AuthError> {
        models::user::find_by_verification_token(&self.db, token).await?.map(to_domain).transpose()
    }

    async fn create_user(&self, new: &NewUser) -> Result<AuthUser, AuthError> {
        to_domain(models::user::create(&self.db, new).await?)
    }

    async fn mark_verified(&self, user_id: Uuid) -> Result<AuthUser, AuthError> {
        to_domain(models::user::mark_verified(&self.db, user_id).await?)
    }

    async fn set_verification_token(&self, user_id: Uuid, token: &str) -> Result<(), AuthError> {
        models::user::set_verification_token(&self.db, user_id, token).await?;
        Ok(())
    }

    async fn set_image_url(&self, user_id: Uuid, url: &str) -> Result<AuthUser, AuthError> {
        to_domain(models::user::set_image_url(&self.db, user_id, url).await?)
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<bool, AuthError> {
        Ok(models::user::hard_delete(&self.db, user_id).await?)
    }

    async fn list_residents(&self, society_id: &str) -> Result<Vec<AuthUser>, AuthError> {
        models::user::list_residents(&self.db, society_id)
            .await?
            .into_iter()
            .map(to_domain)
            .collect()
    }

    async fn find_resident(&self, society_id: &str, resident_id: &str) -> Result<Option<AuthUser>, AuthError> {
        models::user::find_resident(&self.db, society_id, resident_id).await?.map(to_domain).transpose()
    }

    async fn get_credentials(&self, user_id: Uuid) -> Result<Option<Credentials>, AuthError> {
        Ok(models::user_credentials::find_for_user(&self.db, user_id).await?.map(creds_to_domain))
    }

    async fn upsert_password(&self, user_id: Uuid, password_hash: String, password_algorithm: String) -> Result<Credentials, AuthError> {
        let c = models::user_credentials::upsert_password(&self.db, user_id, password_hash, &password_algorithm).await?;
        Ok(creds_to_domain(c))
    }
}
