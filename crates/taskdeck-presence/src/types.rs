//! Principals, viewer records and tracker state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use taskdeck_store::{server_timestamp, Document, Fields};
use tracing::debug;

// ---------------------------------------------------------------------------
// Principal
// ---------------------------------------------------------------------------

/// The authenticated identity of a client session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub subject_id: String,
    pub display_name: Option<String>,
    pub avatar_ref: Option<String>,
}

impl Principal {
    pub fn new(subject_id: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            display_name: None,
            avatar_ref: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_avatar(mut self, avatar_ref: impl Into<String>) -> Self {
        self.avatar_ref = Some(avatar_ref.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Viewer record
// ---------------------------------------------------------------------------

/// Assertion that `subject_id` has `resource_id`'s detail view open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerRecord {
    pub subject_id: String,
    pub resource_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_ref: Option<String>,
    /// Assigned by the store when the record is written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joined_at: Option<DateTime<Utc>>,
}

impl ViewerRecord {
    /// Field map written on join. `joinedAt` is left for the store to fill in.
    pub(crate) fn join_fields(resource_id: &str, principal: &Principal) -> Fields {
        let mut fields = Fields::new();
        fields.insert("subjectId".into(), Value::from(principal.subject_id.as_str()));
        fields.insert("resourceId".into(), Value::from(resource_id));
        if let Some(name) = &principal.display_name {
            fields.insert("displayName".into(), Value::from(name.as_str()));
        }
        if let Some(avatar) = &principal.avatar_ref {
            fields.insert("avatarRef".into(), Value::from(avatar.as_str()));
        }
        fields.insert("joinedAt".into(), server_timestamp());
        fields
    }

    /// Decode a stored document. The record key always wins: the subject id
    /// is the document id and the resource id is the watched task, whatever
    /// the body claims.
    pub(crate) fn from_document(resource_id: &str, doc: &Document) -> Option<Self> {
        let mut fields = doc.fields.clone();
        fields.insert("subjectId".into(), Value::from(doc.id.as_str()));
        fields.insert("resourceId".into(), Value::from(resource_id));

        match serde_json::from_value::<ViewerRecord>(Value::Object(fields)) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!(doc = %doc.id, error = %e, "Skipping malformed viewer record");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tracker options & state
// ---------------------------------------------------------------------------

/// Behavior switches for a [`PresenceTracker`](crate::PresenceTracker).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceOptions {
    /// Show the local principal in its own viewer list once its record exists.
    pub include_self: bool,
    /// Write the local principal's record. When false the tracker only reads.
    pub announce: bool,
}

impl Default for PresenceOptions {
    fn default() -> Self {
        Self {
            include_self: true,
            announce: true,
        }
    }
}

/// What the UI renders for one task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresenceState {
    pub viewers: Vec<ViewerRecord>,
    /// The local principal's join write has been acknowledged.
    pub is_present: bool,
}

impl PresenceState {
    pub fn viewer_ids(&self) -> Vec<&str> {
        self.viewers.iter().map(|v| v.subject_id.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn doc(id: &str, fields: serde_json::Value) -> Document {
        Document {
            id: id.into(),
            fields: fields.as_object().cloned().unwrap(),
            update_time: Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap(),
        }
    }

    #[test]
    fn join_fields_use_camel_case_and_server_time() {
        let principal = Principal::new("u1").with_display_name("Ada");
        let fields = ViewerRecord::join_fields("t1", &principal);
        assert_eq!(fields["subjectId"], "u1");
        assert_eq!(fields["resourceId"], "t1");
        assert_eq!(fields["displayName"], "Ada");
        assert!(!fields.contains_key("avatarRef"));
        assert_eq!(fields["joinedAt"], server_timestamp());
    }

    #[test]
    fn decodes_full_record() {
        let record = ViewerRecord::from_document(
            "t1",
            &doc(
                "u1",
                json!({
                    "subjectId": "u1",
                    "resourceId": "t1",
                    "displayName": "Ada",
                    "avatarRef": "https://img/ada.png",
                    "joinedAt": "2026-01-02T03:04:05.000Z"
                }),
            ),
        )
        .unwrap();
        assert_eq!(record.display_name.as_deref(), Some("Ada"));
        assert_eq!(record.avatar_ref.as_deref(), Some("https://img/ada.png"));
        assert_eq!(
            record.joined_at,
            Some(Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap())
        );
    }

    #[test]
    fn bare_document_falls_back_to_path_ids() {
        let record = ViewerRecord::from_document("t7", &doc("u9", json!({}))).unwrap();
        assert_eq!(record.subject_id, "u9");
        assert_eq!(record.resource_id, "t7");
        assert_eq!(record.display_name, None);
        assert_eq!(record.joined_at, None);
    }

    #[test]
    fn body_ids_cannot_override_record_key() {
        let record = ViewerRecord::from_document(
            "t1",
            &doc("u2", json!({ "subjectId": "u1", "resourceId": "t9" })),
        )
        .unwrap();
        assert_eq!(record.subject_id, "u2");
        assert_eq!(record.resource_id, "t1");
    }

    #[test]
    fn malformed_document_is_skipped() {
        let record = ViewerRecord::from_document("t1", &doc("u1", json!({ "joinedAt": 42 })));
        assert!(record.is_none());
    }

    #[test]
    fn default_options_announce_and_include_self() {
        let options = PresenceOptions::default();
        assert!(options.include_self);
        assert!(options.announce);
    }
}
