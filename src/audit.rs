use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

/// Audit-log collaborator. The posting engine records every lifecycle
/// transition through this seam; the owning application decides where the
/// records land.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(
        &self,
        actor: &str,
        action: &str,
        entity_type: &str,
        entity_id: &str,
        details: Value,
    );
}

/// Default sink that writes audit records to the tracing log.
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(
        &self,
        actor: &str,
        action: &str,
        entity_type: &str,
        entity_id: &str,
        details: Value,
    ) {
        info!(
            target: "audit",
            actor,
            action,
            entity_type,
            entity_id,
            %details,
            "audit record"
        );
    }
}
