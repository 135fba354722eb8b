use callplan_core::audit::{AuditEvent, AuditOutcome, AuditSink};
use tracing::{info, warn};

/// Writes the audit trail into the structured log stream.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: AuditEvent) {
        let metadata = serde_json::to_string(&event.metadata).unwrap_or_default();
        match event.outcome {
            AuditOutcome::Success => info!(
                event_name = "audit.event",
                audit_event_id = %event.event_id,
                audit_event_type = %event.event_type,
                category = event.category.as_str(),
                outcome = event.outcome.as_str(),
                actor = %event.actor,
                subject_id = event.subject_id.as_deref().unwrap_or_default(),
                correlation_id = %event.correlation_id,
                occurred_at = %event.occurred_at.to_rfc3339(),
                metadata = %metadata,
                "audit event"
            ),
            AuditOutcome::Rejected | AuditOutcome::Failed => warn!(
                event_name = "audit.event",
                audit_event_id = %event.event_id,
                audit_event_type = %event.event_type,
                category = event.category.as_str(),
                outcome = event.outcome.as_str(),
                actor = %event.actor,
                subject_id = event.subject_id.as_deref().unwrap_or_default(),
                correlation_id = %event.correlation_id,
                occurred_at = %event.occurred_at.to_rfc3339(),
                metadata = %metadata,
                "audit event"
            ),
        }
    }
}
