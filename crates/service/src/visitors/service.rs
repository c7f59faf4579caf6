use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Days, NaiveDate, NaiveTime, SecondsFormat, Timelike, Utc};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use common::types::{Role, SyncOutcome, VisitorRecord, VisitorStatus, VisitorSubmission};
use models::visitor::NewVisitor;

use super::domain::{Caller, Heatmap, ResidentEntry, VisitorFilter, VisitorScope, VisitorStats};
use super::repository::VisitorRepository;
use crate::auth::repository::AuthRepository;
use crate::errors::ServiceError;
use crate::feed::{FeedHub, FeedSubscription, VisitorEvent};
use crate::notify::{visitor_notification, Mailer, Sender, VisitorNotice};
use crate::pagination::{Page, Pagination};

pub const CSV_HEADER: &str = "Name,Purpose,Vehicle Number,Status,Timestamp";

/// Visitor log operations, scoped per caller.
#[derive(Clone)]
pub struct VisitorService {
    repo: Arc<dyn VisitorRepository>,
    users: Arc<dyn AuthRepository>,
    feed: FeedHub,
    mailer: Arc<dyn Mailer>,
    sender: Sender,
}

impl VisitorService {
    pub fn new(
        repo: Arc<dyn VisitorRepository>,
        users: Arc<dyn AuthRepository>,
        feed: FeedHub,
        mailer: Arc<dyn Mailer>,
        sender: Sender,
    ) -> Self {
        Self { repo, users, feed, mailer, sender }
    }

    pub fn feed(&self) -> &FeedHub { &self.feed }

    pub fn subscribe(&self, caller: &Caller) -> Result<FeedSubscription, ServiceError> {
        Ok(self.feed.subscribe(VisitorScope::for_caller(caller)?))
    }

    /// Log a visitor at the gate.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use common::types::{Role, VisitorStatus, VisitorSubmission};
    /// use service::auth::repository::mock::MockAuthRepository;
    /// use service::feed::FeedHub;
    /// use service::notify::{mock::MemoryMailer, Sender};
    /// use service::visitors::{domain::Caller, repository::mock::MockVisitorRepository, VisitorService};
    /// let svc = VisitorService::new(
    ///     Arc::new(MockVisitorRepository::default()), Arc::new(MockAuthRepository::default()),
    ///     FeedHub::default(), Arc::new(MemoryMailer::default()),
    ///     Sender { name: "GateLog".into(), address: "gate@example.com".into() },
    /// );
    /// let watchman = Caller { user_id: uuid::Uuid::new_v4(), role: Role::Watchman, society_id: Some("s1".into()), resident_id: None };
    /// let sub = VisitorSubmission {
    ///     name: "Ravi".into(), phone_number: "9876543210".into(), purpose: "Delivery".into(), vehicle_number: None,
    ///     resident_id: "101".into(), resident_name: "Asha".into(), image_url: None, timestamp: None,
    /// };
    /// let v = tokio_test::block_on(svc.create(&watchman, sub)).unwrap();
    /// assert_eq!(v.status, VisitorStatus::Pending);
    /// assert_eq!(v.society_id.as_deref(), Some("s1"));
    /// ```
    #[instrument(skip(self, caller, sub), fields(user_id = %caller.user_id, role = %caller.role))]
    pub async fn create(&self, caller: &Caller, sub: VisitorSubmission) -> Result<VisitorRecord, ServiceError> {
        self.create_at(caller, sub, Utc::now()).await
    }

    async fn create_at(&self, caller: &Caller, sub: VisitorSubmission, at: DateTime<Utc>) -> Result<VisitorRecord, ServiceError> {
        if caller.role == Role::Resident {
            return Err(ServiceError::forbidden("only watchmen and committee members can add visitors"));
        }
        let resident_name = if sub.resident_name.trim().is_empty() {
            self.lookup_resident_name(caller.society_id.as_deref(), &sub.resident_id).await
        } else {
            sub.resident_name
        };
        let new = NewVisitor {
            name: sub.name,
            phone_number: sub.phone_number,
            purpose: sub.purpose,
            vehicle_number: sub.vehicle_number,
            image_url: sub.image_url,
            resident_id: sub.resident_id,
            resident_name,
            society_id: caller.society_id.clone(),
            added_by: caller.user_id,
            timestamp: at,
        };
        let rec = self.repo.insert(&new).await?;
        info!(visitor_id = %rec.id, society_id = ?rec.society_id, "visitor_created");
        self.feed.publish(VisitorEvent::Created(rec.clone()));
        self.notify_resident(&rec).await;
        Ok(rec)
    }

    async fn lookup_resident_name(&self, society_id: Option<&str>, resident_id: &str) -> String {
        let Some(society) = society_id else { return String::new() };
        match self.users.find_resident(society, resident_id.trim()).await {
            Ok(Some(u)) => u.name,
            Ok(None) => String::new(),
            Err(e) => {
                warn!(error = %e, "resident lookup failed");
                String::new()
            }
        }
    }

    /// Emails the addressed resident; failures are logged and never surface to the caller.
    async fn notify_resident(&self, rec: &VisitorRecord) {
        let Some(society) = rec.society_id.as_deref() else { return };
        let resident = match self.users.find_resident(society, &rec.resident_id).await {
            Ok(Some(u)) => u,
            Ok(None) => return,
            Err(e) => {
                warn!(visitor_id = %rec.id, error = %e, "resident lookup for notification failed");
                return;
            }
        };
        let msg = visitor_notification(&self.sender, &VisitorNotice::from(rec), &resident.email);
        if let Err(e) = self.mailer.send(&msg).await {
            warn!(visitor_id = %rec.id, error = %e, "visitor notification failed");
        }
    }

    #[instrument(skip(self, caller), fields(user_id = %caller.user_id))]
    pub async fn list(&self, caller: &Caller, filter: VisitorFilter, page: Pagination) -> Result<Page<VisitorRecord>, ServiceError> {
        let scope = VisitorScope::for_caller(caller)?;
        let page = page.normalized();
        let (offset, limit) = page.offset_limit();
        let (items, total) = self.repo.list(&scope, filter.status, offset, limit).await?;
        Ok(Page { items, total, page: page.page, per_page: page.per_page })
    }

    pub async fn get(&self, caller: &Caller, id: Uuid) -> Result<VisitorRecord, ServiceError> {
        let scope = VisitorScope::for_caller(caller)?;
        match self.repo.find(id).await? {
            Some(v) if scope.contains(&v) => Ok(v),
            _ => Err(ServiceError::not_found("visitor")),
        }
    }

    /// Approve or reject. Residents decide only on their own pending visitors.
    #[instrument(skip(self, caller), fields(user_id = %caller.user_id, role = %caller.role))]
    pub async fn set_status(&self, caller: &Caller, id: Uuid, status: VisitorStatus) -> Result<VisitorRecord, ServiceError> {
        if !status.is_decision() {
            return Err(ServiceError::Validation("status must be approved or rejected".into()));
        }
        let current = self.get(caller, id).await?;
        if caller.role == Role::Resident && current.status != VisitorStatus::Pending {
            return Err(ServiceError::forbidden("visitor has already been decided"));
        }
        let updated = self
            .repo
            .update_status(id, status)
            .await?
            .ok_or_else(|| ServiceError::not_found("visitor"))?;
        info!(visitor_id = %id, status = %status, "visitor_status_changed");
        self.feed.publish(VisitorEvent::StatusChanged(updated.clone()));
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete_by_society(&self, society_id: &str) -> Result<usize, ServiceError> {
        let ids = self.repo.delete_by_society(society_id).await?;
        Ok(self.announce_deleted(ids))
    }

    #[instrument(skip(self))]
    pub async fn delete_by_added_by(&self, user_id: Uuid) -> Result<usize, ServiceError> {
        let ids = self.repo.delete_by_added_by(user_id).await?;
        Ok(self.announce_deleted(ids))
    }

    fn announce_deleted(&self, ids: Vec<Uuid>) -> usize {
        let n = ids.len();
        if n > 0 {
            info!(deleted = n, "visitors_deleted");
            self.feed.publish(VisitorEvent::Deleted { ids });
        }
        n
    }

    /// Replays submissions queued while the gate was offline, in order. Every entry is
    /// attempted; each keeps its capture time when it has one.
    #[instrument(skip(self, caller, batch), fields(user_id = %caller.user_id, size = batch.len()))]
    pub async fn sync_offline(&self, caller: &Caller, batch: Vec<VisitorSubmission>) -> Vec<SyncOutcome> {
        let mut out = Vec::with_capacity(batch.len());
        for (index, sub) in batch.into_iter().enumerate() {
            let at = sub.timestamp.unwrap_or_else(Utc::now);
            let outcome = match self.create_at(caller, sub, at).await {
                Ok(v) => SyncOutcome { index, visitor_id: Some(v.id), error: None },
                Err(e) => {
                    warn!(index, error = %e, "offline entry rejected");
                    SyncOutcome { index, visitor_id: None, error: Some(e.to_string()) }
                }
            };
            out.push(outcome);
        }
        out
    }

    pub async fn stats(&self, caller: &Caller) -> Result<VisitorStats, ServiceError> {
        let scope = VisitorScope::for_caller(caller)?;
        let mut stats = VisitorStats::default();
        for v in self.repo.all_in_scope(&scope, None).await? {
            stats.total += 1;
            match v.status {
                VisitorStatus::Pending => stats.pending += 1,
                VisitorStatus::Approved => stats.approved += 1,
                VisitorStatus::Rejected => stats.rejected += 1,
            }
        }
        Ok(stats)
    }

    /// Hour-of-day by day counts for the seven UTC dates ending `today`.
    pub async fn heatmap(&self, caller: &Caller, today: NaiveDate) -> Result<Heatmap, ServiceError> {
        let scope = VisitorScope::for_caller(caller)?;
        let days = (0..7u64)
            .rev()
            .map(|back| today.checked_sub_days(Days::new(back)))
            .collect::<Option<Vec<NaiveDate>>>()
            .ok_or_else(|| ServiceError::Validation(format!("date out of range: {today}")))?;
        let since = days[0].and_time(NaiveTime::MIN).and_utc();
        let mut counts = vec![[0u32; 7]; 24];
        for v in self.repo.all_in_scope(&scope, Some(since)).await? {
            let date = v.timestamp.date_naive();
            if let Some(col) = days.iter().position(|d| *d == date) {
                counts[v.timestamp.hour() as usize][col] += 1;
            }
        }
        Ok(Heatmap { days, counts })
    }

    /// Purposes seen in scope that start with `prefix`, most frequent first.
    pub async fn purpose_suggestions(&self, caller: &Caller, prefix: &str) -> Result<Vec<String>, ServiceError> {
        let prefix = prefix.trim().to_lowercase();
        if prefix.is_empty() {
            return Ok(Vec::new());
        }
        let scope = VisitorScope::for_caller(caller)?;
        let mut freq: HashMap<String, usize> = HashMap::new();
        for v in self.repo.all_in_scope(&scope, None).await? {
            let p = v.purpose.trim().to_lowercase();
            if !p.is_empty() {
                *freq.entry(p).or_default() += 1;
            }
        }
        let mut ranked: Vec<(String, usize)> = freq.into_iter().filter(|(p, _)| p.starts_with(&prefix)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(ranked.into_iter().map(|(p, _)| p).collect())
    }

    /// Residents of the caller's society whose name starts with `prefix`.
    pub async fn resident_directory(&self, caller: &Caller, prefix: &str) -> Result<Vec<ResidentEntry>, ServiceError> {
        let prefix = prefix.trim().to_lowercase();
        if prefix.is_empty() {
            return Ok(Vec::new());
        }
        let society = caller
            .society_id
            .as_deref()
            .ok_or_else(|| ServiceError::Validation("account has no society".into()))?;
        Ok(self
            .users
            .list_residents(society)
            .await?
            .into_iter()
            .filter(|u| u.name.to_lowercase().starts_with(&prefix))
            .filter_map(|u| u.resident_id.map(|resident_id| ResidentEntry { name: u.name, resident_id }))
            .collect())
    }

    pub async fn export_csv(&self, caller: &Caller) -> Result<String, ServiceError> {
        let scope = VisitorScope::for_caller(caller)?;
        let rows = self.repo.all_in_scope(&scope, None).await?;
        if rows.is_empty() {
            return Err(ServiceError::Validation("No visitors to export".into()));
        }
        let mut out = String::from(CSV_HEADER);
        out.push('\n');
        for v in &rows {
            let fields = [
                csv_field(&v.name),
                csv_field(&v.purpose),
                csv_field(v.vehicle_number.as_deref().unwrap_or("N/A")),
                v.status.as_str().to_string(),
                v.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            ];
            out.push_str(&fields.join(","));
            out.push('\n');
        }
        Ok(out)
    }
}

fn csv_field(raw: &str) -> String {
    if raw.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}
