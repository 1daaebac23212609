//! Pending attachment approvals.
//!
//! Reviewers tick uplift versions; the tracker wants flags per attachment.
//! The pending state is therefore a two-level map
//! `attachment id -> version name -> status` where a `?` status means "no
//! change requested" and is never stored.

use crate::model::{AttachmentApprovals, EditorMode, FlagStatus, UpliftVersion};

/// Status a checkbox toggle requests for `version` under `mode`.
///
/// Unchecking reverts to the version's current status.
#[must_use]
pub fn target_status(mode: EditorMode, version: &UpliftVersion, checked: bool) -> FlagStatus {
    match (mode, checked) {
        (EditorMode::Approve, true) => FlagStatus::Approved,
        (EditorMode::Reject, true) => FlagStatus::Rejected,
        (EditorMode::Approve | EditorMode::Reject, false) => version.status.clone(),
        (EditorMode::None | EditorMode::Flags, _) => FlagStatus::Pending,
    }
}

/// Merge `{version.name: status}` into the entry of every attachment that
/// carries `version`, then prune `?` values and empty entries.
#[must_use]
pub fn merge_approval(
    pending: &AttachmentApprovals,
    version: &UpliftVersion,
    status: &FlagStatus,
) -> AttachmentApprovals {
    let mut merged = pending.clone();
    for attachment_id in &version.attachment_ids {
        let mut entry = merged.remove(attachment_id).unwrap_or_default();
        entry.insert(version.name.clone(), status.clone());
        entry.retain(|_, s| !s.is_pending());
        if !entry.is_empty() {
            merged.insert(attachment_id.clone(), entry);
        }
    }
    merged
}

/// Apply one checkbox toggle to the pending approvals of a bug.
#[must_use]
pub fn toggle_approval(
    pending: &AttachmentApprovals,
    mode: EditorMode,
    version: &UpliftVersion,
    checked: bool,
) -> AttachmentApprovals {
    merge_approval(pending, version, &target_status(mode, version, checked))
}
