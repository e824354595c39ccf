//! Integration records and the store accessor trait.
//!
//! An integration record binds an agent (tenant) to an external calendar
//! account. The record itself lives in whatever persistence layer the
//! deployment uses; the engine only sees it through [`IntegrationStore`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use calbroker_providers::BoxFuture;

/// The integration type handled by this engine.
pub const INTEGRATION_TYPE_CALENDAR: &str = "calendar";

/// Lifecycle status of an integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegrationStatus {
    /// Created but not yet configured.
    Pending,
    /// Configured but not yet verified.
    Configured,
    /// Healthy and usable.
    Active,
    /// Last operation failed for a non-auth reason.
    Error,
    /// Authorization has expired; a human must reconnect.
    Expired,
}

impl IntegrationStatus {
    /// Returns the wire name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Configured => "configured",
            Self::Active => "active",
            Self::Error => "error",
            Self::Expired => "expired",
        }
    }
}

/// An integration record as stored for one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationRecord {
    /// Unique identifier.
    pub id: String,
    /// The agent (tenant) this integration belongs to.
    pub agent_id: String,
    /// Human-readable name.
    pub name: String,
    /// Integration type tag (e.g., "calendar").
    pub integration_type: String,
    /// Provider configuration blob (parsed by the providers crate).
    pub config: serde_json::Value,
    /// Lifecycle status.
    pub status: IntegrationStatus,
    /// Soft-delete flag; an inactive integration refuses all operations.
    pub is_active: bool,
    /// Who created the integration, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last-write timestamp.
    pub updated_at: DateTime<Utc>,
}

impl IntegrationRecord {
    /// Returns `true` if this record is a calendar integration.
    pub fn is_calendar(&self) -> bool {
        self.integration_type == INTEGRATION_TYPE_CALENDAR
    }

    /// Returns `true` if this integration may serve operations.
    pub fn is_usable(&self) -> bool {
        self.status == IntegrationStatus::Active && self.is_active
    }
}

/// An error from the integration store.
#[derive(Debug, Error)]
#[error("integration store error: {0}")]
pub struct StoreError(pub String);

impl StoreError {
    /// Creates a new store error.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Read/write access to integration records.
///
/// The persistence layer behind this trait is out of scope for the engine;
/// deployments provide a database-backed implementation, tests use
/// [`MemoryIntegrationStore`].
pub trait IntegrationStore: Send + Sync {
    /// Fetches a record by id, returning `None` when it does not exist.
    fn get(&self, id: String) -> BoxFuture<'_, Result<Option<IntegrationRecord>, StoreError>>;

    /// Writes a record back, replacing the stored version.
    fn update(&self, record: IntegrationRecord) -> BoxFuture<'_, Result<(), StoreError>>;
}

/// An in-memory [`IntegrationStore`].
///
/// Used in tests and useful for embedding the engine without a database.
#[derive(Debug, Default)]
pub struct MemoryIntegrationStore {
    records: std::sync::Mutex<std::collections::HashMap<String, IntegrationRecord>>,
}

impl MemoryIntegrationStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record, replacing any existing one with the same id.
    pub fn insert(&self, record: IntegrationRecord) {
        let mut records = self.records.lock().expect("store lock poisoned");
        records.insert(record.id.clone(), record);
    }

    /// Returns a snapshot of a stored record.
    pub fn snapshot(&self, id: &str) -> Option<IntegrationRecord> {
        let records = self.records.lock().expect("store lock poisoned");
        records.get(id).cloned()
    }
}

impl IntegrationStore for MemoryIntegrationStore {
    fn get(&self, id: String) -> BoxFuture<'_, Result<Option<IntegrationRecord>, StoreError>> {
        let record = self.snapshot(&id);
        Box::pin(async move { Ok(record) })
    }

    fn update(&self, mut record: IntegrationRecord) -> BoxFuture<'_, Result<(), StoreError>> {
        record.updated_at = Utc::now();
        self.insert(record);
        Box::pin(async move { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(id: &str) -> IntegrationRecord {
        let created = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        IntegrationRecord {
            id: id.to_string(),
            agent_id: "agent-1".to_string(),
            name: "Salon calendar".to_string(),
            integration_type: INTEGRATION_TYPE_CALENDAR.to_string(),
            config: serde_json::json!({"provider": "google", "accessToken": "tok"}),
            status: IntegrationStatus::Active,
            is_active: true,
            created_by: None,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn usability_requires_active_status_and_flag() {
        let mut rec = record("int-1");
        assert!(rec.is_usable());

        rec.status = IntegrationStatus::Expired;
        assert!(!rec.is_usable());

        rec.status = IntegrationStatus::Active;
        rec.is_active = false;
        assert!(!rec.is_usable());
    }

    #[test]
    fn status_serde_is_lowercase() {
        assert_eq!(
            serde_json::to_string(&IntegrationStatus::Expired).unwrap(),
            r#""expired""#
        );
        let parsed: IntegrationStatus = serde_json::from_str(r#""active""#).unwrap();
        assert_eq!(parsed, IntegrationStatus::Active);
    }

    #[tokio::test]
    async fn memory_store_roundtrip() {
        let store = MemoryIntegrationStore::new();
        store.insert(record("int-1"));

        let fetched = store.get("int-1".to_string()).await.unwrap().unwrap();
        assert_eq!(fetched.id, "int-1");

        let mut updated = fetched;
        updated.status = IntegrationStatus::Expired;
        store.update(updated).await.unwrap();

        let fetched = store.get("int-1".to_string()).await.unwrap().unwrap();
        assert_eq!(fetched.status, IntegrationStatus::Expired);

        assert!(store.get("missing".to_string()).await.unwrap().is_none());
    }
}
