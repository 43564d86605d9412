//! Durable audit trail

use deadpool_postgres::Pool;
use serde_json::Value as JsonValue;

use super::DbError;

/// One audited access to a resource
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub resource_type: &'static str,
    pub resource_id: String,
    pub action: &'static str,
    pub actor: String,
    pub details: JsonValue,
}

/// Writes audit rows to the `audit_log` table
#[derive(Clone)]
pub struct AuditLog {
    pool: Pool,
}

impl AuditLog {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub async fn write(&self, entry: &AuditEntry) -> Result<(), DbError> {
        let client = self.pool.get().await?;
        client
            .execute(
                "INSERT INTO audit_log (resource_type, resource_id, action, actor, details) \
                 VALUES ($1, $2, $3, $4, $5)",
                &[
                    &entry.resource_type,
                    &entry.resource_id,
                    &entry.action,
                    &entry.actor,
                    &entry.details,
                ],
            )
            .await?;
        Ok(())
    }
}
