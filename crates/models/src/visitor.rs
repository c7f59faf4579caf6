use sea_orm::{entity::prelude::*, Set, DatabaseConnection, QueryFilter, QuerySelect};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::types::{VisitorRecord, VisitorStatus};

use crate::errors::ModelError;
use crate::user::{validate_phone, validate_resident_id};

const MAX_VEHICLE_LEN: usize = 16;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "visitor")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub phone_number: String,
    pub purpose: String,
    pub vehicle_number: Option<String>,
    pub image_url: Option<String>,
    pub resident_id: String,
    pub resident_name: String,
    pub society_id: Option<String>,
    pub status: String,
    pub added_by: Uuid,
    pub timestamp: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef { match *self {} }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn status(&self) -> Result<VisitorStatus, ModelError> {
        self.status.parse::<VisitorStatus>().map_err(|e| ModelError::Validation(e.to_string()))
    }

    pub fn to_record(&self) -> Result<VisitorRecord, ModelError> {
        Ok(VisitorRecord {
            id: self.id,
            name: self.name.clone(),
            phone_number: self.phone_number.clone(),
            purpose: self.purpose.clone(),
            vehicle_number: self.vehicle_number.clone(),
            image_url: self.image_url.clone(),
            timestamp: self.timestamp.with_timezone(&Utc),
            resident_id: self.resident_id.clone(),
            resident_name: self.resident_name.clone(),
            status: self.status()?,
            added_by: self.added_by,
            society_id: self.society_id.clone(),
        })
    }
}

/// A visitor ready to be stored: the gate form plus the audit fields taken from the caller.
#[derive(Debug, Clone)]
pub struct NewVisitor {
    pub name: String,
    pub phone_number: String,
    pub purpose: String,
    pub vehicle_number: Option<String>,
    pub image_url: Option<String>,
    pub resident_id: String,
    pub resident_name: String,
    pub society_id: Option<String>,
    pub added_by: Uuid,
    pub timestamp: DateTime<Utc>,
}

impl NewVisitor {
    /// Checks the form and returns a copy with trimmed fields and a canonical vehicle number.
    pub fn normalized(&self) -> Result<NewVisitor, ModelError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ModelError::validation("visitor name required"));
        }
        let purpose = self.purpose.trim();
        if purpose.is_empty() {
            return Err(ModelError::validation("purpose required"));
        }
        validate_phone(&self.phone_number)?;
        validate_resident_id(&self.resident_id)?;
        let vehicle_number = normalize_vehicle(self.vehicle_number.as_deref())?;
        if let Some(url) = self.image_url.as_deref() {
            validate_image_url(url)?;
        }
        Ok(NewVisitor {
            name: name.to_string(),
            phone_number: self.phone_number.trim().to_string(),
            purpose: purpose.to_string(),
            vehicle_number,
            image_url: self.image_url.clone(),
            resident_id: self.resident_id.trim().to_string(),
            resident_name: self.resident_name.trim().to_string(),
            society_id: self.society_id.clone(),
            added_by: self.added_by,
            timestamp: self.timestamp,
        })
    }
}

pub fn normalize_vehicle(raw: Option<&str>) -> Result<Option<String>, ModelError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) if v.chars().count() > MAX_VEHICLE_LEN => {
            Err(ModelError::validation("vehicle number too long (<=16)"))
        }
        Some(v) => Ok(Some(v.to_uppercase())),
    }
}

pub fn validate_image_url(url: &str) -> Result<(), ModelError> {
    if url.starts_with("https://") || url.starts_with("http://") {
        Ok(())
    } else {
        Err(ModelError::validation("image url must be http(s)"))
    }
}

pub async fn create(db: &DatabaseConnection, new: &NewVisitor) -> Result<Model, ModelError> {
    let new = new.normalized()?;
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(new.name),
        phone_number: Set(new.phone_number),
        purpose: Set(new.purpose),
        vehicle_number: Set(new.vehicle_number),
        image_url: Set(new.image_url),
        resident_id: Set(new.resident_id),
        resident_name: Set(new.resident_name),
        society_id: Set(new.society_id),
        status: Set(VisitorStatus::Pending.as_str().to_string()),
        added_by: Set(new.added_by),
        timestamp: Set(new.timestamp.into()),
    };
    Ok(am.insert(db).await?)
}

/// Only the status column changes; resident and society fields stay as logged.
pub async fn set_status(db: &DatabaseConnection, id: Uuid, status: VisitorStatus) -> Result<Option<Model>, ModelError> {
    let Some(found) = Entity::find_by_id(id).one(db).await? else {
        return Ok(None);
    };
    let mut am: ActiveModel = found.into();
    am.status = Set(status.as_str().to_string());
    Ok(Some(am.update(db).await?))
}

async fn delete_where(db: &DatabaseConnection, filter: sea_orm::Condition) -> Result<Vec<Uuid>, ModelError> {
    let ids: Vec<Uuid> = Entity::find()
        .select_only()
        .column(Column::Id)
        .filter(filter)
        .into_tuple()
        .all(db)
        .await?;
    if ids.is_empty() {
        return Ok(ids);
    }
    Entity::delete_many().filter(Column::Id.is_in(ids.clone())).exec(db).await?;
    Ok(ids)
}

/// Deletes every visitor of a society and returns the removed ids.
pub async fn delete_by_society(db: &DatabaseConnection, society_id: &str) -> Result<Vec<Uuid>, ModelError> {
    delete_where(db, sea_orm::Condition::all().add(Column::SocietyId.eq(society_id))).await
}

/// Deletes every visitor logged by `user_id` and returns the removed ids.
pub async fn delete_by_added_by(db: &DatabaseConnection, user_id: Uuid) -> Result<Vec<Uuid>, ModelError> {
    delete_where(db, sea_orm::Condition::all().add(Column::AddedBy.eq(user_id))).await
}
