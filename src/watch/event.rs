// src/watch/event.rs

use serde::{Deserialize, Serialize};

/// Change notification for one custom resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchEvent {
    #[serde(rename = "type")]
    pub kind: EventType,
    pub object: ResourceObject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventType {
    Added,
    Modified,
    Deleted,
    /// Progress marker carrying only a resource version.
    Bookmark,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceObject {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ResourceStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl WatchEvent {
    /// External identifier of the resource (the deployment id).
    pub fn name(&self) -> &str {
        &self.object.metadata.name
    }

    pub fn resource_version(&self) -> Option<&str> {
        self.object.metadata.resource_version.as_deref()
    }

    /// Reported `status.state`, if the object carries one.
    pub fn state(&self) -> Option<&str> {
        self.object.status.as_ref()?.state.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_deployment_event() {
        let raw = r#"{
            "type": "MODIFIED",
            "object": {
                "apiVersion": "machinelearning.seldon.io/v1alpha2",
                "metadata": {"name": "d1", "resourceVersion": "42"},
                "status": {"state": "Creating", "replicas": 1}
            }
        }"#;
        let event: WatchEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(event.kind, EventType::Modified);
        assert_eq!(event.name(), "d1");
        assert_eq!(event.resource_version(), Some("42"));
        assert_eq!(event.state(), Some("Creating"));
    }

    #[test]
    fn missing_status_has_no_state() {
        let raw = r#"{"type": "ADDED", "object": {"metadata": {"name": "d2"}}}"#;
        let event: WatchEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(event.state(), None);
    }
}
