use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use common::types::{VisitorRecord, VisitorStatus};
use models::visitor::NewVisitor;

use super::domain::VisitorScope;
use crate::errors::ServiceError;

/// Repository abstraction for visitor persistence.
#[async_trait]
pub trait VisitorRepository: Send + Sync {
    async fn insert(&self, new: &NewVisitor) -> Result<VisitorRecord, ServiceError>;
    async fn find(&self, id: Uuid) -> Result<Option<VisitorRecord>, ServiceError>;
    async fn update_status(&self, id: Uuid, status: VisitorStatus) -> Result<Option<VisitorRecord>, ServiceError>;

    /// One page of visitors in scope, newest first, plus the total matching count.
    async fn list(
        &self,
        scope: &VisitorScope,
        status: Option<VisitorStatus>,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<VisitorRecord>, u64), ServiceError>;

    /// Every visitor in scope logged at or after `since`, newest first.
    async fn all_in_scope(&self, scope: &VisitorScope, since: Option<DateTime<Utc>>) -> Result<Vec<VisitorRecord>, ServiceError>;

    async fn delete_by_society(&self, society_id: &str) -> Result<Vec<Uuid>, ServiceError>;
    async fn delete_by_added_by(&self, user_id: Uuid) -> Result<Vec<Uuid>, ServiceError>;
}

/// Simple in-memory mock repository for tests and doc examples
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockVisitorRepository {
        rows: Mutex<Vec<VisitorRecord>>,
    }

    impl MockVisitorRepository {
        fn sorted_in_scope(&self, scope: &VisitorScope, keep: impl Fn(&VisitorRecord) -> bool) -> Vec<VisitorRecord> {
            let rows = self.rows.lock().unwrap();
            let mut out: Vec<VisitorRecord> = rows.iter().filter(|v| scope.contains(v) && keep(v)).cloned().collect();
            out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
            out
        }

        fn remove_where(&self, pred: impl Fn(&VisitorRecord) -> bool) -> Vec<Uuid> {
            let mut rows = self.rows.lock().unwrap();
            let ids = rows.iter().filter(|v| pred(v)).map(|v| v.id).collect();
            rows.retain(|v| !pred(v));
            ids
        }
    }

    #[async_trait]
    impl VisitorRepository for MockVisitorRepository {
        async fn insert(&self, new: &NewVisitor) -> Result<VisitorRecord, ServiceError> {
            let n = new.normalized()?;
            let rec = VisitorRecord {
                id: Uuid::new_v4(),
                name: n.name,
                phone_number: n.phone_number,
                purpose: n.purpose,
                vehicle_number: n.vehicle_number,
                image_url: n.image_url,
                timestamp: n.timestamp,
                resident_id: n.resident_id,
                resident_name: n.resident_name,
                status: VisitorStatus::Pending,
                added_by: n.added_by,
                society_id: n.society_id,
            };
            self.rows.lock().unwrap().push(rec.clone());
            Ok(rec)
        }

        async fn find(&self, id: Uuid) -> Result<Option<VisitorRecord>, ServiceError> {
            Ok(self.rows.lock().unwrap().iter().find(|v| v.id == id).cloned())
        }

        async fn update_status(&self, id: Uuid, status: VisitorStatus) -> Result<Option<VisitorRecord>, ServiceError> {
            let mut rows = self.rows.lock().unwrap();
            Ok(rows.iter_mut().find(|v| v.id == id).map(|v| {
                v.status = status;
                v.clone()
            }))
        }

        async fn list(
            &self,
            scope: &VisitorScope,
            status: Option<VisitorStatus>,
            offset: u64,
            limit: u64,
        ) -> Result<(Vec<VisitorRecord>, u64), ServiceError> {
            let all = self.sorted_in_scope(scope, |v| status.map_or(true, |s| v.status == s));
            let total = all.len() as u64;
            let page = all.into_iter().skip(offset as usize).take(limit as usize).collect();
            Ok((page, total))
        }

        async fn all_in_scope(&self, scope: &VisitorScope, since: Option<DateTime<Utc>>) -> Result<Vec<VisitorRecord>, ServiceError> {
            Ok(self.sorted_in_scope(scope, |v| since.map_or(true, |t| v.timestamp >= t)))
        }

        async fn delete_by_society(&self, society_id: &str) -> Result<Vec<Uuid>, ServiceError> {
            Ok(self.remove_where(|v| v.society_id.as_deref() == Some(society_id)))
        }

        async fn delete_by_added_by(&self, user_id: Uuid) -> Result<Vec<Uuid>, ServiceError> {
            Ok(self.remove_where(|v| v.added_by == user_id))
        }
    }
}
