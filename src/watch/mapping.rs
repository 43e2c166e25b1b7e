// src/watch/mapping.rs

//! Pure event -> status translation used by the reconciler.
//!
//! This is the only place where the orchestration system's state vocabulary
//! is translated. Run views built from engine manifests pass phases through
//! untouched.

use crate::types::RunStatus;
use crate::watch::event::{EventType, WatchEvent};

/// Status write derived from one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub deployment_id: String,
    pub status: RunStatus,
}

/// Map a deployment `status.state` onto the local vocabulary.
///
/// `Available` means the deployment serves traffic, `Creating` means it is
/// still rolling out. Anything else is taken verbatim.
pub fn map_deployment_state(state: &str) -> RunStatus {
    match state {
        "Available" => RunStatus::Succeeded,
        "Creating" => RunStatus::Pending,
        other => RunStatus::from(other),
    }
}

/// Status write for an event, or `None` when the event carries no state.
///
/// The result depends on the event alone, so replaying an event yields the
/// same write.
pub fn status_update(event: &WatchEvent) -> Option<StatusUpdate> {
    if matches!(event.kind, EventType::Bookmark | EventType::Error) {
        return None;
    }

    let state = event.state()?;
    Some(StatusUpdate {
        deployment_id: event.name().to_string(),
        status: map_deployment_state(state),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watch::event::{ObjectMeta, ResourceObject, ResourceStatus};

    fn event(kind: EventType, name: &str, state: Option<&str>) -> WatchEvent {
        WatchEvent {
            kind,
            object: ResourceObject {
                metadata: ObjectMeta {
                    name: name.to_string(),
                    resource_version: None,
                },
                status: state.map(|s| ResourceStatus {
                    state: Some(s.to_string()),
                }),
            },
        }
    }

    #[test]
    fn vocabulary_aliases_are_normalised() {
        assert_eq!(map_deployment_state("Available"), RunStatus::Succeeded);
        assert_eq!(map_deployment_state("Creating"), RunStatus::Pending);
        assert_eq!(map_deployment_state("Failed"), RunStatus::Failed);
        assert_eq!(
            map_deployment_state("Rolling"),
            RunStatus::Other("Rolling".into())
        );
    }

    #[test]
    fn event_without_status_yields_no_update() {
        assert_eq!(status_update(&event(EventType::Modified, "d1", None)), None);
    }

    #[test]
    fn deleted_events_still_carry_their_state() {
        let update = status_update(&event(EventType::Deleted, "d1", Some("Failed"))).unwrap();
        assert_eq!(update.deployment_id, "d1");
        assert_eq!(update.status, RunStatus::Failed);
    }

    #[test]
    fn bookmarks_are_ignored() {
        assert_eq!(
            status_update(&event(EventType::Bookmark, "d1", Some("Available"))),
            None
        );
    }

    #[test]
    fn mapping_is_idempotent() {
        let e = event(EventType::Modified, "d1", Some("Available"));
        assert_eq!(status_update(&e), status_update(&e));
    }
}
