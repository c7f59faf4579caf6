use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect};
use uuid::Uuid;

use common::types::{VisitorRecord, VisitorStatus};
use models::visitor::{self, NewVisitor};

use crate::errors::ServiceError;
use crate::visitors::domain::VisitorScope;
use crate::visitors::repository::VisitorRepository;

pub struct SeaOrmVisitorRepository {
    pub db: DatabaseConnection,
}

impl SeaOrmVisitorRepository {
    pub fn new(db: DatabaseConnection) -> Self { Self { db } }
}

fn scope_condition(scope: &VisitorScope) -> Condition {
    match scope {
        VisitorScope::Resident { resident_id, society_id } => {
            let mut cond = Condition::all().add(visitor::Column::ResidentId.eq(resident_id.as_str()));
            if let Some(s) = society_id {
                cond = cond.add(visitor::Column::SocietyId.eq(s.as_str()));
            }
            cond
        }
        VisitorScope::Society(s) => Condition::all().add(visitor::Column::SocietyId.eq(s.as_str())),
        VisitorScope::All => Condition::all(),
    }
}

fn to_records(rows: Vec<visitor::Model>) -> Result<Vec<VisitorRecord>, ServiceError> {
    rows.iter().map(|m| m.to_record().map_err(ServiceError::from)).collect()
}

#[async_trait::async_trait]
impl VisitorRepository for SeaOrmVisitorRepository {
    async fn insert(&self, new: &NewVisitor) -> Result<VisitorRecord, ServiceError> {
        Ok(visitor::create(&self.db, new).await?.to_record()?)
    }

    async fn find(&self, id: Uuid) -> Result<Option<VisitorRecord>, ServiceError> {
        let found = visitor::Entity::find_by_id(id).one(&self.db).await?;
        Ok(found.map(|m| m.to_record()).transpose()?)
    }

    async fn update_status(&self, id: Uuid, status: VisitorStatus) -> Result<Option<VisitorRecord>, ServiceError> {
        let updated = visitor::set_status(&self.db, id, status).await?;
        Ok(updated.map(|m| m.to_record()).transpose()?)
    }

    async fn list(
        &self,
        scope: &VisitorScope,
        status: Option<VisitorStatus>,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<VisitorRecord>, u64), ServiceError> {
        let mut cond = scope_condition(scope);
        if let Some(s) = status {
            cond = cond.add(visitor::Column::Status.eq(s.as_str()));
        }
        let query = visitor::Entity::find().filter(cond);
        let total = query.clone().count(&self.db).await?;
        let rows = query
            .order_by_desc(visitor::Column::Timestamp)
            .offset(offset)
            .limit(limit)
            .all(&self.db)
            .await?;
        Ok((to_records(rows)?, total))
    }

    async fn all_in_scope(&self, scope: &VisitorScope, since: Option<DateTime<Utc>>) -> Result<Vec<VisitorRecord>, ServiceError> {
        let mut cond = scope_condition(scope);
        if let Some(t) = since {
            cond = cond.add(visitor::Column::Timestamp.gte(t));
        }
        let rows = visitor::Entity::find()
            .filter(cond)
            .order_by_desc(visitor::Column::Timestamp)
            .all(&self.db)
            .await?;
        to_records(rows)
    }

    async fn delete_by_society(&self, society_id: &str) -> Result<Vec<Uuid>, ServiceError> {
        Ok(visitor::delete_by_society(&self.db, society_id).await?)
    }

    async fn delete_by_added_by(&self, user_id: Uuid) -> Result<Vec<Uuid>, ServiceError> {
        Ok(visitor::delete_by_added_by(&self.db, user_id).await?)
    }
}
