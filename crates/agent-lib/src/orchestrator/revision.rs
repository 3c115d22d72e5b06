//! Revision history selection for rollback

use super::OrchestratorError;
use k8s_openapi::api::apps::v1::ReplicaSet;

/// Annotation carrying the deployment revision number on a ReplicaSet
const REVISION_ANNOTATION: &str = "deployment.kubernetes.io/revision";

/// Pick the rollback target out of a deployment's ReplicaSet history
///
/// Sorts by creation timestamp descending regardless of the order the API
/// returned the list in: index 0 is the current revision, index 1 the one to
/// roll back to. Fewer than two entries (including a selector mismatch that
/// matched zero or one ReplicaSet) is `NoPreviousRevision`.
pub fn previous_revision(
    mut history: Vec<ReplicaSet>,
    deployment: &str,
) -> Result<ReplicaSet, OrchestratorError> {
    if history.len() < 2 {
        return Err(OrchestratorError::NoPreviousRevision {
            deployment: deployment.to_string(),
        });
    }

    history.sort_by(|a, b| {
        let a_time = a.metadata.creation_timestamp.as_ref().map(|t| t.0);
        let b_time = b.metadata.creation_timestamp.as_ref().map(|t| t.0);
        b_time.cmp(&a_time)
    });

    Ok(history.swap_remove(1))
}

/// Identifier of a ReplicaSet revision
///
/// Prefers the revision annotation the deployment controller stamps on each
/// ReplicaSet; falls back to the ReplicaSet name.
pub fn revision_id(rs: &ReplicaSet) -> String {
    rs.metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(REVISION_ANNOTATION))
        .cloned()
        .or_else(|| rs.metadata.name.clone())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
    use std::collections::BTreeMap;

    fn replica_set(name: &str, created_hour: u32, revision: Option<&str>) -> ReplicaSet {
        let mut rs = ReplicaSet::default();
        rs.metadata.name = Some(name.to_string());
        rs.metadata.creation_timestamp = Some(Time(
            Utc.with_ymd_and_hms(2024, 5, 1, created_hour, 0, 0).unwrap(),
        ));
        if let Some(rev) = revision {
            let mut annotations = BTreeMap::new();
            annotations.insert(REVISION_ANNOTATION.to_string(), rev.to_string());
            rs.metadata.annotations = Some(annotations);
        }
        rs
    }

    #[test]
    fn test_empty_history_has_no_previous_revision() {
        let err = previous_revision(vec![], "nginx").unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::NoPreviousRevision { deployment } if deployment == "nginx"
        ));
    }

    #[test]
    fn test_single_replica_set_has_no_previous_revision() {
        let history = vec![replica_set("nginx-aaa", 10, Some("1"))];
        let err = previous_revision(history, "nginx").unwrap_err();
        assert!(matches!(err, OrchestratorError::NoPreviousRevision { .. }));
    }

    #[test]
    fn test_picks_second_newest_when_already_sorted() {
        let history = vec![
            replica_set("nginx-ccc", 12, Some("3")),
            replica_set("nginx-bbb", 11, Some("2")),
            replica_set("nginx-aaa", 10, Some("1")),
        ];
        let rs = previous_revision(history, "nginx").unwrap();
        assert_eq!(rs.metadata.name.as_deref(), Some("nginx-bbb"));
    }

    #[test]
    fn test_picks_second_newest_regardless_of_input_order() {
        let history = vec![
            replica_set("nginx-aaa", 10, Some("1")),
            replica_set("nginx-ccc", 12, Some("3")),
            replica_set("nginx-bbb", 11, Some("2")),
        ];
        let rs = previous_revision(history, "nginx").unwrap();
        assert_eq!(rs.metadata.name.as_deref(), Some("nginx-bbb"));
    }

    #[test]
    fn test_missing_creation_timestamp_sorts_last() {
        let mut untimed = ReplicaSet::default();
        untimed.metadata.name = Some("nginx-untimed".to_string());

        let history = vec![
            untimed,
            replica_set("nginx-new", 12, Some("2")),
            replica_set("nginx-old", 10, Some("1")),
        ];
        let rs = previous_revision(history, "nginx").unwrap();
        assert_eq!(rs.metadata.name.as_deref(), Some("nginx-old"));
    }

    #[test]
    fn test_revision_id_prefers_annotation() {
        let rs = replica_set("nginx-bbb", 11, Some("2"));
        assert_eq!(revision_id(&rs), "2");
    }

    #[test]
    fn test_revision_id_falls_back_to_name() {
        let rs = replica_set("nginx-bbb", 11, None);
        assert_eq!(revision_id(&rs), "nginx-bbb");
    }
}
