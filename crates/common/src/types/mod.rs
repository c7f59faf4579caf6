//! Wire types shared by the HTTP server and the gate client.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::CoreError;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Health {
    pub status: String,
}

impl Health {
    pub fn ok() -> Self {
        Self { status: "ok".into() }
    }
}

/// The three user roles; each gets its own view of the visitor log.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Resident,
    Watchman,
    Committee,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Resident => "resident",
            Role::Watchman => "watchman",
            Role::Committee => "committee",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "resident" => Ok(Role::Resident),
            "watchman" => Ok(Role::Watchman),
            "committee" => Ok(Role::Committee),
            _ => Err(CoreError::UnknownRole(s.to_string())),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum VisitorStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl VisitorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisitorStatus::Pending => "pending",
            VisitorStatus::Approved => "approved",
            VisitorStatus::Rejected => "rejected",
        }
    }

    /// Approved and rejected are the only states a visitor can be moved into.
    pub fn is_decision(&self) -> bool {
        !matches!(self, VisitorStatus::Pending)
    }
}

impl fmt::Display for VisitorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VisitorStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(VisitorStatus::Pending),
            "approved" => Ok(VisitorStatus::Approved),
            "rejected" => Ok(VisitorStatus::Rejected),
            _ => Err(CoreError::UnknownStatus(s.to_string())),
        }
    }
}

/// A visitor entry as filled in at the gate.
///
/// `timestamp` is only set by offline replays, where it carries the time the entry was
/// captured rather than the time it reached the server.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VisitorSubmission {
    pub name: String,
    pub phone_number: String,
    pub purpose: String,
    #[serde(default)]
    pub vehicle_number: Option<String>,
    pub resident_id: String,
    #[serde(default)]
    pub resident_name: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// A persisted visitor as returned by the API.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VisitorRecord {
    pub id: Uuid,
    pub name: String,
    pub phone_number: String,
    pub purpose: String,
    pub vehicle_number: Option<String>,
    pub image_url: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub resident_id: String,
    pub resident_name: String,
    pub status: VisitorStatus,
    pub added_by: Uuid,
    pub society_id: Option<String>,
}

/// Outcome of one entry in an offline replay batch.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    pub index: usize,
    pub visitor_id: Option<Uuid>,
    pub error: Option<String>,
}

impl SyncOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub society_id: Option<String>,
    pub token: String,
}
