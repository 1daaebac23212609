//! Bug tracker responses to a flag or attachment update, and the change list
//! mirrored back to the dashboard backend.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;

use crate::error::FetchError;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FieldChange {
    #[serde(default)]
    pub removed: String,
    #[serde(default)]
    pub added: String,
}

/// Field changes the tracker accepted for one object.
///
/// For attachment updates `bugzilla_id` holds the attachment id, exactly as
/// the tracker reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    #[serde(rename = "id")]
    pub bugzilla_id: u64,
    #[serde(default)]
    pub changes: BTreeMap<String, FieldChange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateTarget {
    Bug,
    Attachment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BugUpdateResult {
    /// The tracker answered but refused the update.
    Failed(String),
    BugChanged(Vec<ChangeSet>),
    AttachmentChanged(Vec<ChangeSet>),
}

impl BugUpdateResult {
    /// Decode a tracker response body.
    ///
    /// Shapes are tried in order (`bugs`, `attachments`, `message`) and the
    /// first one that fits wins.
    pub fn decode(value: &Value) -> Result<Self, FetchError> {
        if let Some(list) = decode_list(value, "bugs") {
            return Ok(Self::BugChanged(list));
        }
        if let Some(list) = decode_list(value, "attachments") {
            return Ok(Self::AttachmentChanged(list));
        }
        if let Some(message) = value.get("message").and_then(Value::as_str) {
            return Ok(Self::Failed(message.to_string()));
        }
        Err(FetchError::Decode(
            "expected one of `bugs`, `attachments` or `message`".to_string(),
        ))
    }

    /// Encode back into the tracker response shape.
    #[must_use]
    pub fn encode(&self) -> Value {
        match self {
            Self::Failed(message) => json!({ "error": true, "message": message }),
            Self::BugChanged(list) => json!({ "bugs": list }),
            Self::AttachmentChanged(list) => json!({ "attachments": list }),
        }
    }

    #[must_use]
    pub const fn target(&self) -> Option<UpdateTarget> {
        match self {
            Self::Failed(_) => None,
            Self::BugChanged(_) => Some(UpdateTarget::Bug),
            Self::AttachmentChanged(_) => Some(UpdateTarget::Attachment),
        }
    }

    #[must_use]
    pub fn change_sets(&self) -> &[ChangeSet] {
        match self {
            Self::Failed(_) => &[],
            Self::BugChanged(list) | Self::AttachmentChanged(list) => list,
        }
    }

    /// Change list for the backend mirror request, or `None` when the
    /// tracker refused the update.
    #[must_use]
    pub fn sync_payload(&self) -> Option<Vec<BackendChange>> {
        let target = self.target()?;
        Some(
            self.change_sets()
                .iter()
                .map(|set| BackendChange {
                    bugzilla_id: set.bugzilla_id,
                    target,
                    changes: set.changes.clone(),
                })
                .collect(),
        )
    }
}

fn decode_list(value: &Value, key: &str) -> Option<Vec<ChangeSet>> {
    let raw = value.get(key)?;
    serde_json::from_value(raw.clone()).ok()
}

/// One entry of the `PUT {backend}/bugs/{id}` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendChange {
    pub bugzilla_id: u64,
    pub target: UpdateTarget,
    pub changes: BTreeMap<String, FieldChange>,
}
