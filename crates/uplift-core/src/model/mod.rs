pub mod bug;
pub mod status;
pub mod update_result;
pub mod wire;

pub use bug::{
    Analysis, AnalysisId, AttachmentApprovals, Bug, BugId, Contributor, Patch, UpliftRequest,
    UpliftVersion,
};
pub use status::{ContributorRole, EditorMode, FlagStatus};
pub use update_result::{BackendChange, BugUpdateResult, ChangeSet, FieldChange, UpdateTarget};
