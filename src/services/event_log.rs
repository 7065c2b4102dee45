use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::identity_service::IdentityRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    IdentityCreated,
}

/// Audit event appended to the external event log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityEvent {
    pub event_type: EventType,
    pub identity_id: String,
    pub payload: serde_json::Value,
    pub recorded_at: DateTime<Utc>,
}

impl IdentityEvent {
    pub fn created(record: &IdentityRecord) -> Self {
        Self {
            event_type: EventType::IdentityCreated,
            identity_id: record.id.clone(),
            payload: serde_json::to_value(record).unwrap_or(serde_json::Value::Null),
            recorded_at: Utc::now(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EventLogError {
    #[error("event log unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait EventLog: Send + Sync {
    async fn append(&self, event: IdentityEvent) -> Result<(), EventLogError>;
}

/// Keeps appended events in memory; used in local mode and tests
#[derive(Debug, Default)]
pub struct InMemoryEventLog {
    events: Mutex<Vec<IdentityEvent>>,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<IdentityEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl EventLog for InMemoryEventLog {
    async fn append(&self, event: IdentityEvent) -> Result<(), EventLogError> {
        tracing::info!(
            event_type = ?event.event_type,
            identity_id = %event.identity_id,
            "event recorded"
        );
        self.events.lock().await.push(event);
        Ok(())
    }
}
