//! Parsing of model replies into action plans

use crate::models::ActionPlan;
use serde_json::Value;

/// Parse one model reply into an [`ActionPlan`]
///
/// The remote model is known to sometimes wrap its reply in a markdown code
/// fence despite being told not to, so fences are stripped before parsing.
/// Any shape that is not one of the documented well-formed replies maps to
/// `Invalid`; this function never fails.
pub fn parse_action_plan(reply: &str) -> ActionPlan {
    let cleaned = strip_code_fence(reply.trim());

    let value: Value = match serde_json::from_str(cleaned) {
        Ok(value) => value,
        Err(e) => {
            return ActionPlan::Invalid {
                reason: format!("reply is not valid JSON: {}", e),
            }
        }
    };

    let Some(object) = value.as_object() else {
        return ActionPlan::Invalid {
            reason: "reply is not a JSON object".to_string(),
        };
    };

    match object.get("action").and_then(Value::as_str) {
        Some("none") => ActionPlan::NoAction,
        Some("scale") => match object.get("replicas") {
            Some(Value::Number(n)) if n.as_u64().map_or(false, |v| v <= u32::MAX as u64) => {
                ActionPlan::ScaleTo {
                    replicas: n.as_u64().unwrap_or(0) as u32,
                }
            }
            Some(other) => ActionPlan::Invalid {
                reason: format!("scale action with non-integer replicas: {}", other),
            },
            None => ActionPlan::Invalid {
                reason: "scale action without replicas".to_string(),
            },
        },
        Some("rollback") => match object.get("deployment_name").and_then(Value::as_str) {
            Some(name) if !name.is_empty() => ActionPlan::RollbackTo {
                deployment_name: name.to_string(),
                revision: object
                    .get("revision")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            },
            _ => ActionPlan::Invalid {
                reason: "rollback action without deployment_name".to_string(),
            },
        },
        Some(other) => ActionPlan::Invalid {
            reason: format!("unknown action: {}", other),
        },
        None => ActionPlan::Invalid {
            reason: "missing action field".to_string(),
        },
    }
}

/// Remove a surrounding markdown code fence, with or without a language tag
fn strip_code_fence(reply: &str) -> &str {
    let Some(rest) = reply.strip_prefix("```") else {
        return reply;
    };
    // Drop the language tag line if present ("```json\n...").
    let body = match rest.split_once('\n') {
        Some((_tag, body)) => body,
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}
