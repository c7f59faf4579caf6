//! In-process live feed of visitor changes.
//!
//! Every mutation in the visitor service is published once; each subscriber filters the
//! stream through its own [`VisitorScope`]. A subscriber that falls behind loses the
//! overflowed events and resumes with the next one.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

use common::types::VisitorRecord;

use crate::visitors::domain::VisitorScope;

pub const DEFAULT_FEED_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum VisitorEvent {
    Created(VisitorRecord),
    StatusChanged(VisitorRecord),
    Deleted { ids: Vec<Uuid> },
}

impl VisitorEvent {
    /// SSE event name.
    pub fn kind(&self) -> &'static str {
        match self {
            VisitorEvent::Created(_) => "created",
            VisitorEvent::StatusChanged(_) => "status_changed",
            VisitorEvent::Deleted { .. } => "deleted",
        }
    }

    /// Deletions carry ids only and reach every subscriber.
    pub fn visible_to(&self, scope: &VisitorScope) -> bool {
        match self {
            VisitorEvent::Created(v) | VisitorEvent::StatusChanged(v) => scope.contains(v),
            VisitorEvent::Deleted { .. } => true,
        }
    }
}

#[derive(Clone)]
pub struct FeedHub {
    tx: broadcast::Sender<VisitorEvent>,
}

impl FeedHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Returns the number of subscribers that will see the event.
    pub fn publish(&self, event: VisitorEvent) -> usize {
        let kind = event.kind();
        match self.tx.send(event) {
            Ok(n) => {
                debug!(kind, receivers = n, "feed_published");
                n
            }
            Err(_) => 0,
        }
    }

    pub fn subscribe(&self, scope: VisitorScope) -> FeedSubscription {
        FeedSubscription { rx: self.tx.subscribe(), scope }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for FeedHub {
    fn default() -> Self { Self::new(DEFAULT_FEED_CAPACITY) }
}

pub struct FeedSubscription {
    rx: broadcast::Receiver<VisitorEvent>,
    scope: VisitorScope,
}

impl FeedSubscription {
    /// Next event in scope; `None` once the hub is gone.
    pub async fn next(&mut self) -> Option<VisitorEvent> {
        loop {
            match self.rx.recv().await {
                Ok(ev) if ev.visible_to(&self.scope) => return Some(ev),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "feed subscriber lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::types::VisitorStatus;

    fn record(society: &str) -> VisitorRecord {
        VisitorRecord {
            id: Uuid::new_v4(),
            name: "Ravi".into(),
            phone_number: "9".into(),
            purpose: "Delivery".into(),
            vehicle_number: None,
            image_url: None,
            timestamp: Utc::now(),
            resident_id: "101".into(),
            resident_name: "Asha".into(),
            status: VisitorStatus::Pending,
            added_by: Uuid::new_v4(),
            society_id: Some(society.into()),
        }
    }

    #[tokio::test]
    async fn subscriber_only_sees_its_society() {
        let hub = FeedHub::new(8);
        let mut sub = hub.subscribe(VisitorScope::Society("s1".into()));
        hub.publish(VisitorEvent::Created(record("s2")));
        let mine = record("s1");
        hub.publish(VisitorEvent::Created(mine.clone()));
        assert_eq!(sub.next().await, Some(VisitorEvent::Created(mine)));
    }

    #[tokio::test]
    async fn deletions_reach_everyone() {
        let hub = FeedHub::default();
        let mut sub = hub.subscribe(VisitorScope::Resident { resident_id: "9".into(), society_id: None });
        let ids = vec![Uuid::new_v4()];
        hub.publish(VisitorEvent::Deleted { ids: ids.clone() });
        assert_eq!(sub.next().await, Some(VisitorEvent::Deleted { ids }));
    }

    #[tokio::test]
    async fn lagged_subscriber_keeps_receiving() {
        let hub = FeedHub::new(2);
        let mut sub = hub.subscribe(VisitorScope::All);
        for _ in 0..5 {
            hub.publish(VisitorEvent::Created(record("s1")));
        }
        let last = record("s1");
        hub.publish(VisitorEvent::StatusChanged(last.clone()));
        let mut seen = Vec::new();
        while let Ok(Some(ev)) = tokio::time::timeout(std::time::Duration::from_millis(50), sub.next()).await {
            seen.push(ev);
        }
        assert_eq!(seen.last(), Some(&VisitorEvent::StatusChanged(last)));
        assert!(seen.len() <= 2);
    }

    #[test]
    fn publish_without_subscribers_is_noop() {
        let hub = FeedHub::new(4);
        assert_eq!(hub.publish(VisitorEvent::Deleted { ids: vec![] }), 0);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn deleted_payload_shape() {
        let id = Uuid::nil();
        let json = serde_json::to_value(VisitorEvent::Deleted { ids: vec![id] }).unwrap();
        assert_eq!(json, serde_json::json!({ "ids": [id.to_string()] }));
    }
}
