use serde::{Deserialize, Serialize};
use uuid::Uuid;

use common::types::Role;

/// Sign-up form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInput {
    pub email: String,
    pub name: String,
    pub role: Role,
    pub phone_number: String,
    #[serde(default)]
    pub apartment: Option<String>,
    #[serde(default)]
    pub resident_id: Option<String>,
    #[serde(default)]
    pub society_id: Option<String>,
    pub password: String,
    pub confirm_password: String,
}

/// Login input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// Domain user (business view, never carries the password hash)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub phone_number: String,
    pub apartment: Option<String>,
    pub resident_id: Option<String>,
    pub society_id: Option<String>,
    pub image_url: Option<String>,
    pub email_verified: bool,
}

/// Domain credentials (hashed)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub user_id: Uuid,
    pub password_hash: String,
    pub password_algorithm: String,
}

/// A freshly registered account and the token that verifies its email address.
#[derive(Debug, Clone)]
pub struct Registration {
    pub user: AuthUser,
    pub verification_token: String,
}

/// Login result (session)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub user: AuthUser,
    pub token: String,
}

/// JWT payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// email
    pub sub: String,
    pub uid: Uuid,
    pub role: Role,
    /// society id
    #[serde(default)]
    pub sid: Option<String>,
    pub exp: usize,
}
