//! Analysis and bug value types as served by the dashboard backend.
//!
//! Wire names follow the backend serializer (`bugzilla_id`, `flags_status`,
//! `versions`, `changes_add`, ...). Fields that only exist while a reviewer
//! works on a bug are skipped on the wire and start out empty on decode.
//!
//! The backend may also describe people as `creator`, `assignee` and
//! `reviewers` instead of a `contributors` list; decoding folds those into
//! `contributors`, one card per email with the roles merged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::status::{ContributorRole, EditorMode, FlagStatus};
use super::update_result::BugUpdateResult;
use super::wire::{gravatar_url, landing_dates};
use crate::remote::RemoteData;

/// Dashboard-internal bug identifier.
pub type BugId = u64;

/// Dashboard-internal analysis identifier.
pub type AnalysisId = u64;

/// attachment id → (version flag name → requested status).
pub type AttachmentApprovals = BTreeMap<String, BTreeMap<String, FlagStatus>>;

/// A named group of bugs under review, e.g. one release channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub id: AnalysisId,
    pub name: String,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub bugs: Vec<Bug>,
}

impl Analysis {
    #[must_use]
    pub fn bug(&self, id: BugId) -> Option<&Bug> {
        self.bugs.iter().find(|bug| bug.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawBug")]
pub struct Bug {
    pub id: BugId,
    pub bugzilla_id: u64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub keywords: BTreeSet<String>,
    #[serde(default)]
    pub flags_status: BTreeMap<String, String>,
    #[serde(default)]
    pub flags_tracking: BTreeMap<String, String>,
    #[serde(default)]
    pub contributors: Vec<Contributor>,
    #[serde(default, rename = "uplift")]
    pub uplift_request: Option<UpliftRequest>,
    #[serde(default, rename = "versions")]
    pub uplift_versions: BTreeMap<String, UpliftVersion>,
    #[serde(default)]
    pub patches: BTreeMap<String, Patch>,
    #[serde(default, with = "landing_dates")]
    pub landings: BTreeMap<String, DateTime<Utc>>,

    #[serde(skip)]
    pub editor_mode: EditorMode,
    #[serde(skip)]
    pub pending_edits: BTreeMap<String, String>,
    #[serde(skip)]
    pub pending_attachment_approvals: AttachmentApprovals,
    /// Outcome of the last publish to the bug tracker.
    #[serde(skip)]
    pub update_status: RemoteData<BugUpdateResult>,
    /// Outcome of mirroring the last accepted change to the backend.
    #[serde(skip)]
    pub sync_status: RemoteData<()>,
}

impl Bug {
    /// Close the editor and drop anything typed into it.
    pub fn close_editor(&mut self) {
        self.editor_mode = EditorMode::None;
        self.pending_edits.clear();
        self.pending_attachment_approvals.clear();
    }

    /// Replace the wire data with `fresh`, keeping the session fields.
    #[must_use]
    pub fn refreshed_from(&self, fresh: Self) -> Self {
        Self {
            editor_mode: self.editor_mode,
            pending_edits: self.pending_edits.clone(),
            pending_attachment_approvals: self.pending_attachment_approvals.clone(),
            update_status: self.update_status.clone(),
            sync_status: RemoteData::Success(()),
            ..fresh
        }
    }

    /// Look up an uplift version by its flag name.
    ///
    /// A flag name can head several groups (`beta +`, `beta ?`); pending
    /// groups win over decided ones.
    #[must_use]
    pub fn version_named(&self, name: &str) -> Option<&UpliftVersion> {
        self.versions_named(name)
            .find(|v| v.status == FlagStatus::Pending)
            .or_else(|| self.versions_named(name).next())
    }

    /// Every uplift version group carrying the flag `name`.
    pub fn versions_named<'a, 'b>(
        &'a self,
        name: &'b str,
    ) -> impl Iterator<Item = &'a UpliftVersion> {
        self.uplift_versions.values().filter(move |v| v.name == name)
    }
}

#[derive(Deserialize)]
struct RawBug {
    id: BugId,
    bugzilla_id: u64,
    #[serde(default)]
    url: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    keywords: BTreeSet<String>,
    #[serde(default)]
    flags_status: BTreeMap<String, String>,
    #[serde(default)]
    flags_tracking: BTreeMap<String, String>,
    #[serde(default)]
    contributors: Vec<Contributor>,
    #[serde(default)]
    creator: Option<Contributor>,
    #[serde(default)]
    assignee: Option<Contributor>,
    #[serde(default)]
    reviewers: Vec<Contributor>,
    #[serde(default)]
    uplift: Option<UpliftRequest>,
    #[serde(default)]
    versions: BTreeMap<String, UpliftVersion>,
    #[serde(default)]
    patches: BTreeMap<String, Patch>,
    #[serde(default, with = "landing_dates")]
    landings: BTreeMap<String, DateTime<Utc>>,
}

impl From<RawBug> for Bug {
    fn from(raw: RawBug) -> Self {
        let mut contributors = raw.contributors;
        let people = raw
            .creator
            .map(|c| (c, ContributorRole::Creator))
            .into_iter()
            .chain(raw.assignee.map(|c| (c, ContributorRole::Assignee)))
            .chain(raw.reviewers.into_iter().map(|c| (c, ContributorRole::Reviewer)));
        for (person, role) in people {
            add_role(&mut contributors, person, role);
        }

        Self {
            id: raw.id,
            bugzilla_id: raw.bugzilla_id,
            url: raw.url,
            summary: raw.summary,
            keywords: raw.keywords,
            flags_status: raw.flags_status,
            flags_tracking: raw.flags_tracking,
            contributors,
            uplift_request: raw.uplift,
            uplift_versions: raw.versions,
            patches: raw.patches,
            landings: raw.landings,
            editor_mode: EditorMode::None,
            pending_edits: BTreeMap::new(),
            pending_attachment_approvals: BTreeMap::new(),
            update_status: RemoteData::NotAsked,
            sync_status: RemoteData::NotAsked,
        }
    }
}

fn add_role(contributors: &mut Vec<Contributor>, mut person: Contributor, role: ContributorRole) {
    if let Some(known) = contributors.iter_mut().find(|c| c.email == person.email) {
        if !known.roles.contains(&role) {
            known.roles.push(role);
        }
        return;
    }
    if !person.roles.contains(&role) {
        person.roles.push(role);
    }
    contributors.push(person);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawUser")]
pub struct Contributor {
    pub email: String,
    pub name: String,
    #[serde(rename = "avatar")]
    pub avatar_url: String,
    pub roles: Vec<ContributorRole>,
}

/// A person as the backend sends it: a bare login or a user record.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawUser {
    Login(String),
    Record(RawContributor),
}

/// Tracker user records carry `name` as the login and `real_name` as the
/// display name; dashboard records carry only `name`.
#[derive(Deserialize)]
struct RawContributor {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    real_name: Option<String>,
    #[serde(default, alias = "avatar_url")]
    avatar: Option<String>,
    #[serde(default)]
    roles: Vec<ContributorRole>,
}

impl From<RawUser> for Contributor {
    fn from(raw: RawUser) -> Self {
        let raw = match raw {
            RawUser::Login(login) => RawContributor {
                email: Some(login.clone()),
                name: None,
                real_name: Some(login),
                avatar: None,
                roles: Vec::new(),
            },
            RawUser::Record(record) => record,
        };
        let login = raw.name.filter(|v| !v.is_empty());
        let real_name = raw.real_name.filter(|v| !v.is_empty());

        // Uplift authors come without an email; the login stands in.
        let email = raw
            .email
            .filter(|v| !v.is_empty())
            .or_else(|| login.clone())
            .or_else(|| real_name.clone())
            .unwrap_or_default();
        let name = real_name.or(login).unwrap_or_else(|| email.clone());
        let avatar_url = raw
            .avatar
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| gravatar_url(&email));
        Self {
            email,
            name,
            avatar_url,
            roles: raw.roles,
        }
    }
}

/// The reviewer-facing uplift request attached to a bug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpliftRequest {
    #[serde(rename = "id")]
    pub bugzilla_id: u64,
    #[serde(rename = "comment", default)]
    pub comment_body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Contributor>,
}

/// One approval flag (`approval-mozilla-<channel>`) and the attachments
/// carrying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpliftVersion {
    pub name: String,
    pub status: FlagStatus,
    #[serde(rename = "attachments", default)]
    pub attachment_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patch {
    #[serde(default)]
    pub source: String,
    #[serde(rename = "changes_add", default)]
    pub additions: u64,
    #[serde(rename = "changes_del", default)]
    pub deletions: u64,
    #[serde(default)]
    pub changes_size: u64,
    #[serde(default)]
    pub url: String,
}

impl Patch {
    /// Zero-sized changes are test-only commits.
    #[must_use]
    pub const fn is_test(&self) -> bool {
        self.changes_size == 0
    }
}
