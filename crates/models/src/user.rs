use sea_orm::{entity::prelude::*, Set, DatabaseConnection, QueryFilter, QueryOrder};
use uuid::Uuid;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use common::types::Role;

use crate::errors::ModelError;

static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{1,10}$").expect("phone regex"));
static RESIDENT_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{1,5}$").expect("resident id regex"));

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub email: String,
    pub name: String,
    pub role: String,
    pub phone_number: String,
    pub apartment: Option<String>,
    pub resident_id: Option<String>,
    pub society_id: Option<String>,
    pub image_url: Option<String>,
    pub email_verified: bool,
    pub verification_token: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef { match *self {} }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn role(&self) -> Result<Role, ModelError> {
        self.role.parse::<Role>().map_err(|e| ModelError::Validation(e.to_string()))
    }
}

/// Registration data after the form has been read, before it is stored.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub role: Role,
    pub phone_number: String,
    pub apartment: Option<String>,
    pub resident_id: Option<String>,
    pub society_id: Option<String>,
    pub verification_token: Option<String>,
}

impl NewUser {
    /// Sign-up form rules: every role needs a society; residents also need an apartment number.
    pub fn validate(&self) -> Result<(), ModelError> {
        validate_name(&self.name)?;
        validate_email(&self.email)?;
        validate_phone(&self.phone_number)?;
        validate_society_id(self.society_id.as_deref())?;
        match (self.role, self.resident_id.as_deref()) {
            (Role::Resident, None) => return Err(ModelError::validation("resident id required for residents")),
            (_, Some(rid)) => validate_resident_id(rid)?,
            _ => {}
        }
        Ok(())
    }
}

pub fn validate_name(name: &str) -> Result<(), ModelError> {
    let trimmed = name.trim();
    if trimmed.is_empty() { return Err(ModelError::validation("name required")); }
    if trimmed.chars().count() > 128 { return Err(ModelError::validation("name too long (<=128)")); }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), ModelError> {
    match email.trim().split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => Ok(()),
        _ => Err(ModelError::validation("invalid email")),
    }
}

/// Up to ten digits, nothing else.
pub fn validate_phone(phone: &str) -> Result<(), ModelError> {
    if PHONE_RE.is_match(phone.trim()) { Ok(()) } else { Err(ModelError::validation("phone number must be 1-10 digits")) }
}

/// Apartment number: up to five digits.
pub fn validate_resident_id(resident_id: &str) -> Result<(), ModelError> {
    if RESIDENT_ID_RE.is_match(resident_id.trim()) { Ok(()) } else { Err(ModelError::validation("resident id must be 1-5 digits")) }
}

pub fn validate_society_id(society_id: Option<&str>) -> Result<(), ModelError> {
    match society_id.map(str::trim) {
        Some(s) if !s.is_empty() && s.len() <= 64 => Ok(()),
        Some(s) if !s.is_empty() => Err(ModelError::validation("society id too long (<=64)")),
        _ => Err(ModelError::validation("society id required")),
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

fn blank_to_none(v: Option<&str>) -> Option<String> {
    v.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

pub async fn create(db: &DatabaseConnection, new: &NewUser) -> Result<Model, ModelError> {
    new.validate()?;
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(normalize_email(&new.email)),
        name: Set(new.name.trim().to_string()),
        role: Set(new.role.as_str().to_string()),
        phone_number: Set(new.phone_number.trim().to_string()),
        apartment: Set(blank_to_none(new.apartment.as_deref())),
        resident_id: Set(blank_to_none(new.resident_id.as_deref())),
        society_id: Set(blank_to_none(new.society_id.as_deref())),
        image_url: Set(None),
        email_verified: Set(false),
        verification_token: Set(new.verification_token.clone()),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(am.insert(db).await?)
}

pub async fn find_by_email(db: &DatabaseConnection, email: &str) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find().filter(Column::Email.eq(normalize_email(email))).one(db).await?)
}

pub async fn find_by_verification_token(db: &DatabaseConnection, token: &str) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find().filter(Column::VerificationToken.eq(token)).one(db).await?)
}

/// The resident living at `resident_id` within a society, if registered.
pub async fn find_resident(db: &DatabaseConnection, society_id: &str, resident_id: &str) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find()
        .filter(Column::Role.eq(Role::Resident.as_str()))
        .filter(Column::SocietyId.eq(society_id))
        .filter(Column::ResidentId.eq(resident_id))
        .one(db)
        .await?)
}

pub async fn list_residents(db: &DatabaseConnection, society_id: &str) -> Result<Vec<Model>, ModelError> {
    Ok(Entity::find()
        .filter(Column::Role.eq(Role::Resident.as_str()))
        .filter(Column::SocietyId.eq(society_id))
        .order_by_asc(Column::Name)
        .all(db)
        .await?)
}

async fn update_with(db: &DatabaseConnection, id: Uuid, apply: impl FnOnce(&mut ActiveModel)) -> Result<Model, ModelError> {
    let mut found: ActiveModel = Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or(ModelError::NotFound("user"))?
        .into();
    apply(&mut found);
    found.updated_at = Set(Utc::now().into());
    Ok(found.update(db).await?)
}

pub async fn mark_verified(db: &DatabaseConnection, id: Uuid) -> Result<Model, ModelError> {
    update_with(db, id, |am| {
        am.email_verified = Set(true);
        am.verification_token = Set(None);
    })
    .await
}

pub async fn set_verification_token(db: &DatabaseConnection, id: Uuid, token: &str) -> Result<Model, ModelError> {
    let token = token.to_string();
    update_with(db, id, move |am| am.verification_token = Set(Some(token))).await
}

pub async fn set_image_url(db: &DatabaseConnection, id: Uuid, url: &str) -> Result<Model, ModelError> {
    let url = url.to_string();
    update_with(db, id, move |am| am.image_url = Set(Some(url))).await
}

/// Removes the user row; credentials go with it via FK cascade.
pub async fn hard_delete(db: &DatabaseConnection, id: Uuid) -> Result<bool, ModelError> {
    let res = Entity::delete_by_id(id).exec(db).await?;
    Ok(res.rows_affected > 0)
}
