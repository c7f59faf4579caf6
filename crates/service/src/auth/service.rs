use std::sync::Arc;

use argon2::{Argon2, password_hash::{PasswordHasher, PasswordVerifier, SaltString}, PasswordHash};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header as JwtHeader, Validation};
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use tracing::{info, debug, instrument};
use uuid::Uuid;

use models::user::NewUser;

use super::domain::{AuthSession, AuthUser, Claims, LoginInput, RegisterInput, Registration};
use super::errors::AuthError;
use super::repository::AuthRepository;

const VERIFICATION_TOKEN_LEN: usize = 32;

/// Auth service configuration
#[derive(Clone, Debug)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub password_min_len: usize,
    pub password_algorithm: String,
}

impl AuthSettings {
    pub fn from_config(cfg: &configs::AuthConfig) -> Self {
        Self {
            jwt_secret: cfg.jwt_secret.clone(),
            token_ttl_hours: cfg.token_ttl_hours,
            password_min_len: cfg.password_min_len,
            password_algorithm: "argon2".into(),
        }
    }
}

fn new_verification_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(VERIFICATION_TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// Auth business service independent of web framework
#[derive(Clone)]
pub struct AuthService {
    repo: Arc<dyn AuthRepository>,
    cfg: AuthSettings,
}

impl AuthService {
    pub fn new(repo: Arc<dyn AuthRepository>, cfg: AuthSettings) -> Self { Self { repo, cfg } }

    pub fn repository(&self) -> Arc<dyn AuthRepository> { self.repo.clone() }

    /// Register a new, unverified account with a hashed password.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{AuthService, AuthSettings, repository::mock::MockAuthRepository};
    /// use service::auth::domain::RegisterInput;
    /// use common::types::Role;
    /// use std::sync::Arc;
    /// let svc = AuthService::new(Arc::new(MockAuthRepository::default()), AuthSettings {
    ///     jwt_secret: "secret".into(), token_ttl_hours: 12, password_min_len: 6, password_algorithm: "argon2".into(),
    /// });
    /// let input = RegisterInput {
    ///     email: "guard@example.com".into(), name: "Guard".into(), role: Role::Watchman,
    ///     phone_number: "9000000000".into(), apartment: None, resident_id: None,
    ///     society_id: Some("green-meadows".into()), password: "secret1".into(), confirm_password: "secret1".into(),
    /// };
    /// let reg = tokio_test::block_on(svc.register(input)).unwrap();
    /// assert!(!reg.user.email_verified);
    /// assert!(!reg.verification_token.is_empty());
    /// ```
    #[instrument(skip(self, input), fields(email = %input.email, role = %input.role))]
    pub async fn register(&self, input: RegisterInput) -> Result<Registration, AuthError> {
        if input.password.chars().count() < self.cfg.password_min_len {
            return Err(AuthError::Validation(format!(
                "password too short (>={})",
                self.cfg.password_min_len
            )));
        }
        if input.password != input.confirm_password {
            return Err(AuthError::Validation("passwords do not match".into()));
        }
        if let Some(existing) = self.repo.find_user_by_email(&input.email).await? {
            debug!("user exists: {}", existing.email);
            return Err(AuthError::Conflict);
        }

        let token = new_verification_token();
        let new = NewUser {
            email: input.email,
            name: input.name,
            role: input.role,
            phone_number: input.phone_number,
            apartment: input.apartment,
            resident_id: input.resident_id,
            society_id: input.society_id,
            verification_token: Some(token.clone()),
        };
        new.validate()?;

        let user = self.repo.create_user(&new).await?;
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(input.password.as_bytes(), &salt)
            .map_err(|e| AuthError::HashError(e.to_string()))?
            .to_string();

        self.repo.upsert_password(user.id, hash, self.cfg.password_algorithm.clone()).await?;
        info!(user_id = %user.id, role = %user.role, society_id = ?user.society_id, "user_registered");
        Ok(Registration { user, verification_token: token })
    }

    #[instrument(skip(self, token))]
    pub async fn verify_email(&self, token: &str) -> Result<AuthUser, AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::Validation("verification token required".into()));
        }
        let user = self.repo
            .find_user_by_verification_token(token)
            .await?
            .ok_or(AuthError::NotFound)?;
        let user = self.repo.mark_verified(user.id).await?;
        info!(user_id = %user.id, "email_verified");
        Ok(user)
    }

    /// Issue a fresh verification token for an account that has not verified yet.
    #[instrument(skip(self))]
    pub async fn resend_verification(&self, email: &str) -> Result<Registration, AuthError> {
        let user = self.repo.find_user_by_email(email).await?.ok_or(AuthError::NotFound)?;
        if user.email_verified {
            return Err(AuthError::Validation("email already verified".into()));
        }
        let token = new_verification_token();
        self.repo.set_verification_token(user.id, &token).await?;
        Ok(Registration { user, verification_token: token })
    }

    /// Authenticate a verified user and issue a signed token.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{AuthService, AuthSettings, repository::mock::MockAuthRepository};
    /// use service::auth::domain::{RegisterInput, LoginInput};
    /// use common::types::Role;
    /// use std::sync::Arc;
    /// let svc = AuthService::new(Arc::new(MockAuthRepository::default()), AuthSettings {
    ///     jwt_secret: "secret".into(), token_ttl_hours: 12, password_min_len: 6, password_algorithm: "argon2".into(),
    /// });
    /// let reg = tokio_test::block_on(svc.register(RegisterInput {
    ///     email: "u@e.com".into(), name: "N".into(), role: Role::Committee, phone_number: "123".into(),
    ///     apartment: None, resident_id: None, society_id: Some("s1".into()),
    ///     password: "Passw0rd".into(), confirm_password: "Passw0rd".into(),
    /// })).unwrap();
    /// tokio_test::block_on(svc.verify_email(&reg.verification_token)).unwrap();
    /// let session = tokio_test::block_on(svc.login(LoginInput { email: "u@e.com".into(), password: "Passw0rd".into() })).unwrap();
    /// assert_eq!(svc.decode_token(&session.token).unwrap().uid, reg.user.id);
    /// ```
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn login(&self, input: LoginInput) -> Result<AuthSession, AuthError> {
        let user = self.repo
            .find_user_by_email(&input.email)
            .await?
            .ok_or(AuthError::Unauthorized)?;

        let cred = self.repo
            .get_credentials(user.id)
            .await?
            .ok_or(AuthError::Unauthorized)?;

        let parsed = PasswordHash::new(&cred.password_hash).map_err(|e| AuthError::HashError(e.to_string()))?;
        if Argon2::default().verify_password(input.password.as_bytes(), &parsed).is_err() {
            return Err(AuthError::Unauthorized);
        }
        if !user.email_verified {
            return Err(AuthError::EmailNotVerified);
        }

        let token = self.issue_token(&user)?;
        info!(user_id = %user.id, role = %user.role, "user_logged_in");
        Ok(AuthSession { user, token })
    }

    fn issue_token(&self, user: &AuthUser) -> Result<String, AuthError> {
        let exp = (chrono::Utc::now() + chrono::Duration::hours(self.cfg.token_ttl_hours)).timestamp() as usize;
        let claims = Claims {
            sub: user.email.clone(),
            uid: user.id,
            role: user.role,
            sid: user.society_id.clone(),
            exp,
        };
        encode(&JwtHeader::default(), &claims, &EncodingKey::from_secret(self.cfg.jwt_secret.as_bytes()))
            .map_err(|e| AuthError::TokenError(e.to_string()))
    }

    pub fn decode_token(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.cfg.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| AuthError::TokenError(e.to_string()))?;
        Ok(data.claims)
    }

    /// The account behind a token; accounts deleted after the token was issued are NotFound.
    pub async fn current_user(&self, user_id: Uuid) -> Result<AuthUser, AuthError> {
        self.repo.find_user_by_id(user_id).await?.ok_or(AuthError::NotFound)
    }

    #[instrument(skip(self, url))]
    pub async fn set_profile_image(&self, user_id: Uuid, url: &str) -> Result<AuthUser, AuthError> {
        models::visitor::validate_image_url(url)?;
        self.repo.set_image_url(user_id, url).await
    }

    #[instrument(skip(self))]
    pub async fn delete_account(&self, user_id: Uuid) -> Result<(), AuthError> {
        if !self.repo.delete_user(user_id).await? {
            return Err(AuthError::NotFound);
        }
        info!(user_id = %user_id, "account_deleted");
        Ok(())
    }
}
