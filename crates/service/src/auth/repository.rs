use async_trait::async_trait;
use uuid::Uuid;

use models::user::NewUser;

use super::domain::{AuthUser, Credentials};
use super::errors::AuthError;

/// Repository abstraction for account persistence.
#[async_trait]
pub trait AuthRepository: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, AuthError>;
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<AuthUser>, AuthError>;
    async fn find_user_by_verification_token(&self, token: &str) -> Result<Option<AuthUser>, AuthError>;
    async fn create_user(&self, new: &NewUser) -> Result<AuthUser, AuthError>;
    async fn mark_verified(&self, user_id: Uuid) -> Result<AuthUser, AuthError>;
    async fn set_verification_token(&self, user_id: Uuid, token: &str) -> Result<(), AuthError>;
    async fn set_image_url(&self, user_id: Uuid, url: &str) -> Result<AuthUser, AuthError>;
    async fn delete_user(&self, user_id: Uuid) -> Result<bool, AuthError>;

    /// Residents registered in a society, ordered by name.
    async fn list_residents(&self, society_id: &str) -> Result<Vec<AuthUser>, AuthError>;
    async fn find_resident(&self, society_id: &str, resident_id: &str) -> Result<Option<AuthUser>, AuthError>;

    async fn get_credentials(&self, user_id: Uuid) -> Result<Option<Credentials>, AuthError>;
    async fn upsert_password(&self, user_id: Uuid, password_hash: String, password_algorithm: String) -> Result<Credentials, AuthError>;
}

/// Simple in-memory mock repository for tests and doc examples
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use common::types::Role;
    use models::user::normalize_email;

    #[derive(Default)]
    pub struct MockAuthRepository {
        users: Mutex<HashMap<Uuid, (AuthUser, Option<String>)>>, // value: (user, verification token)
        creds: Mutex<HashMap<Uuid, Credentials>>,               // key: user_id
    }

    impl MockAuthRepository {
        fn update(&self, user_id: Uuid, apply: impl FnOnce(&mut AuthUser, &mut Option<String>)) -> Result<AuthUser, AuthError> {
            let mut users = self.users.lock().unwrap();
            let (user, token) = users.get_mut(&user_id).ok_or(AuthError::NotFound)?;
            apply(user, token);
            Ok(user.clone())
        }
    }

    #[async_trait]
    impl AuthRepository for MockAuthRepository {
        async fn find_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, AuthError> {
            let email = normalize_email(email);
            let users = self.users.lock().unwrap();
            Ok(users.values().find(|(u, _)| u.email == email).map(|(u, _)| u.clone()))
        }

        async fn find_user_by_id(&self, id: Uuid) -> Result<Option<AuthUser>, AuthError> {
            Ok(self.users.lock().unwrap().get(&id).map(|(u, _)| u.clone()))
        }

        async fn find_user_by_verification_token(&self, token: &str) -> Result<Option<AuthUser>, AuthError> {
            let users = self.users.lock().unwrap();
            Ok(users.values().find(|(_, t)| t.as_deref() == Some(token)).map(|(u, _)| u.clone()))
        }

        async fn create_user(&self, new: &NewUser) -> Result<AuthUser, AuthError> {
            new.validate()?;
            let email = normalize_email(&new.email);
            let mut users = self.users.lock().unwrap();
            if users.values().any(|(u, _)| u.email == email) {
                return Err(AuthError::Conflict);
            }
            let user = AuthUser {
                id: Uuid::new_v4(),
                email,
                name: new.name.trim().to_string(),
                role: new.role,
                phone_number: new.phone_number.clone(),
                apartment: new.apartment.clone(),
                resident_id: new.resident_id.clone(),
                society_id: new.society_id.clone(),
                image_url: None,
                email_verified: false,
            };
            users.insert(user.id, (user.clone(), new.verification_token.clone()));
            Ok(user)
        }

        async fn mark_verified(&self, user_id: Uuid) -> Result<AuthUser, AuthError> {
            self.update(user_id, |u, t| {
                u.email_verified = true;
                *t = None;
            })
        }

        async fn set_verification_token(&self, user_id: Uuid, token: &str) -> Result<(), AuthError> {
            self.update(user_id, |_, t| *t = Some(token.to_string())).map(|_| ())
        }

        async fn set_image_url(&self, user_id: Uuid, url: &str) -> Result<AuthUser, AuthError> {
            self.update(user_id, |u, _| u.image_url = Some(url.to_string()))
        }

        async fn delete_user(&self, user_id: Uuid) -> Result<bool, AuthError> {
            self.creds.lock().unwrap().remove(&user_id);
            Ok(self.users.lock().unwrap().remove(&user_id).is_some())
        }

        async fn list_residents(&self, society_id: &str) -> Result<Vec<AuthUser>, AuthError> {
            let users = self.users.lock().unwrap();
            let mut out: Vec<AuthUser> = users
                .values()
                .map(|(u, _)| u)
                .filter(|u| u.role == Role::Resident && u.society_id.as_deref() == Some(society_id))
                .cloned()
                .collect();
            out.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(out)
        }

        async fn find_resident(&self, society_id: &str, resident_id: &str) -> Result<Option<AuthUser>, AuthError> {
            Ok(self
                .list_residents(society_id)
                .await?
                .into_iter()
                .find(|u| u.resident_id.as_deref() == Some(resident_id)))
        }

        async fn get_credentials(&self, user_id: Uuid) -> Result<Option<Credentials>, AuthError> {
            let creds = self.creds.lock().unwrap();
            Ok(creds.get(&user_id).cloned())
        }

        async fn upsert_password(&self, user_id: Uuid, password_hash: String, password_algorithm: String) -> Result<Credentials, AuthError> {
            let mut creds = self.creds.lock().unwrap();
            let c = Credentials { user_id, password_hash, password_algorithm };
            creds.insert(user_id, c.clone());
            Ok(c)
        }
    }
}
