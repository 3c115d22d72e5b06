//! Prompt construction for the decision model

use crate::models::LogRecord;

/// Upper bound on the serialized log payload handed to the model
pub const MAX_PAYLOAD_BYTES: usize = 16 * 1024;

/// Fixed instruction stating the decision policy and the output contract
pub const SYSTEM_INSTRUCTION: &str = "You are an autonomous agent monitoring cloud logs for a \
Kubernetes application. Analyze the provided log entries and determine whether the deployment \
needs remediation. If the error density indicates load pressure, output a JSON object with \
'action': 'scale', 'replicas': <number>. If the error density indicates a regression from a \
recent release, output a JSON object with 'action': 'rollback', 'deployment_name': <name>. If \
no action is needed, output a JSON object with 'action': 'none'. Only output the single JSON \
object, no prose, no markdown fencing.";

/// Serialize records to a bounded JSON payload, newest records first
///
/// Records beyond the byte budget are dropped from the tail; the backend
/// already returns newest-first, so truncation sheds the oldest entries.
pub fn render_log_payload(records: &[LogRecord]) -> String {
    let mut kept = records.len();
    while kept > 0 {
        let payload = serde_json::to_string_pretty(&records[..kept])
            .unwrap_or_else(|_| "[]".to_string());
        if payload.len() <= MAX_PAYLOAD_BYTES || kept == 1 {
            return payload;
        }
        kept -= 1;
    }
    "[]".to_string()
}
