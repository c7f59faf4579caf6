use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use common::types::{Role, VisitorRecord, VisitorStatus};

use crate::auth::domain::AuthUser;
use crate::errors::ServiceError;

/// The authenticated user on whose behalf a visitor operation runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Caller {
    pub user_id: Uuid,
    pub role: Role,
    pub society_id: Option<String>,
    pub resident_id: Option<String>,
}

impl From<&AuthUser> for Caller {
    fn from(u: &AuthUser) -> Self {
        Self {
            user_id: u.id,
            role: u.role,
            society_id: u.society_id.clone(),
            resident_id: u.resident_id.clone(),
        }
    }
}

/// Which visitors a caller may see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisitorScope {
    /// Visitors addressed to one apartment, optionally pinned to a society.
    Resident { resident_id: String, society_id: Option<String> },
    Society(String),
    All,
}

impl VisitorScope {
    pub fn for_caller(caller: &Caller) -> Result<Self, ServiceError> {
        match caller.role {
            Role::Resident => {
                let resident_id = caller
                    .resident_id
                    .clone()
                    .ok_or_else(|| ServiceError::forbidden("resident account has no apartment number"))?;
                Ok(VisitorScope::Resident { resident_id, society_id: caller.society_id.clone() })
            }
            Role::Watchman => caller
                .society_id
                .clone()
                .map(VisitorScope::Society)
                .ok_or_else(|| ServiceError::forbidden("watchman account has no society")),
            Role::Committee => Ok(caller.society_id.clone().map(VisitorScope::Society).unwrap_or(VisitorScope::All)),
        }
    }

    pub fn contains(&self, v: &VisitorRecord) -> bool {
        match self {
            VisitorScope::Resident { resident_id, society_id } => {
                v.resident_id == *resident_id
                    && society_id.as_ref().map_or(true, |s| v.society_id.as_ref() == Some(s))
            }
            VisitorScope::Society(s) => v.society_id.as_ref() == Some(s),
            VisitorScope::All => true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct VisitorFilter {
    #[serde(default)]
    pub status: Option<VisitorStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisitorStats {
    pub total: u64,
    pub pending: u64,
    pub approved: u64,
    pub rejected: u64,
}

/// Visitor counts per hour of day (rows) and calendar day (columns).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heatmap {
    /// Seven UTC dates, oldest first, ending today.
    pub days: Vec<NaiveDate>,
    /// 24 rows of 7 counts.
    pub counts: Vec<[u32; 7]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResidentEntry {
    pub name: String,
    pub resident_id: String,
}
