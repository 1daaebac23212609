//! View projection: pure functions from [`Model`] to a serializable display
//! tree. Renderers (text, JSON, HTML) consume the tree and never look at the
//! model directly.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::model::{
    Analysis, Bug, BugId, BugUpdateResult, Contributor, EditorMode, FlagStatus, Patch,
    UpliftRequest, UpliftVersion,
};
use crate::remote::RemoteData;
use crate::update::Model;

/// Flag value the tracker uses for "unset".
const UNSET_FLAG: &str = "---";
const APPROVAL_PREFIX: &str = "approval-mozilla-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TagStyle {
    Info,
    Success,
    Danger,
    Default,
}

impl TagStyle {
    /// Style for an uplift flag status.
    #[must_use]
    pub const fn for_status(status: &FlagStatus) -> Self {
        match status {
            FlagStatus::Pending => Self::Info,
            FlagStatus::Approved => Self::Success,
            FlagStatus::Rejected => Self::Danger,
            FlagStatus::Other(_) => Self::Default,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub label: String,
    pub style: TagStyle,
}

impl Tag {
    fn new(label: impl Into<String>, style: TagStyle) -> Self {
        Self {
            label: label.into(),
            style,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Menu {
    NotAsked,
    Loading,
    Error { message: String },
    Loaded { analyses: Vec<MenuEntry> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuEntry {
    pub id: u64,
    pub name: String,
    pub count: u64,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Page {
    NotSelected,
    Loading,
    Error { message: String },
    Loaded(AnalysisView),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisView {
    pub id: u64,
    pub name: String,
    pub count: u64,
    pub bugs: Vec<BugSummary>,
    /// Detail panel of the selected bug, if it exists in this analysis.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<BugDetail>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BugSummary {
    pub id: BugId,
    pub bugzilla_id: u64,
    pub url: String,
    pub summary: String,
    pub versions: Vec<Tag>,
    pub keywords: Vec<Tag>,
    pub editing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BugDetail {
    pub summary: BugSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uplift: Option<UpliftView>,
    pub contributors: Vec<ContributorCard>,
    pub status_flags: Vec<FlagRow>,
    pub tracking_flags: Vec<FlagRow>,
    pub patches: Vec<PatchRow>,
    pub landings: Vec<LandingRow>,
    pub editor: EditorPanel,
    pub banners: Vec<Banner>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpliftView {
    pub bugzilla_id: u64,
    pub comment: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<ContributorCard>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContributorCard {
    pub name: String,
    pub email: String,
    pub avatar_url: String,
    pub roles: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlagRow {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchRow {
    pub revision: String,
    /// "Patch" or "Test".
    pub kind: &'static str,
    pub source: String,
    pub additions: u64,
    pub deletions: u64,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LandingRow {
    pub channel: String,
    /// `dd/mm/yyyy`
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum EditorPanel {
    Closed,
    Flags {
        fields: Vec<FlagField>,
        comment: String,
        publish: PublishButton,
    },
    Decision {
        decision: EditorMode,
        versions: Vec<VersionChoice>,
        comment: String,
        publish: PublishButton,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlagField {
    /// Edit key; sent to the tracker as `cf_<key>`.
    pub key: String,
    pub current: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionChoice {
    pub name: String,
    pub status: Tag,
    pub checked: bool,
    pub attachments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishButton {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Banner {
    pub style: TagStyle,
    pub text: String,
}

/// The analyses menu.
#[must_use]
pub fn project_menu(model: &Model) -> Menu {
    let active = model.current_analysis.success().map(|a| a.id);
    match &model.all_analyses {
        RemoteData::NotAsked => Menu::NotAsked,
        RemoteData::Loading => Menu::Loading,
        RemoteData::Failure(err) => Menu::Error {
            message: err.to_string(),
        },
        RemoteData::Success(analyses) => Menu::Loaded {
            analyses: analyses
                .iter()
                .map(|a| MenuEntry {
                    id: a.id,
                    name: a.name.clone(),
                    count: a.count,
                    active: active == Some(a.id),
                })
                .collect(),
        },
    }
}

/// The analysis page, with a detail panel for `selected` when given.
#[must_use]
pub fn project_page(model: &Model, selected: Option<BugId>) -> Page {
    match &model.current_analysis {
        RemoteData::NotAsked => Page::NotSelected,
        RemoteData::Loading => Page::Loading,
        RemoteData::Failure(err) => Page::Error {
            message: err.to_string(),
        },
        RemoteData::Success(analysis) => Page::Loaded(analysis_view(
            analysis,
            selected,
            model.can_publish,
        )),
    }
}

fn analysis_view(analysis: &Analysis, selected: Option<BugId>, can_publish: bool) -> AnalysisView {
    AnalysisView {
        id: analysis.id,
        name: analysis.name.clone(),
        count: analysis.count,
        bugs: analysis.bugs.iter().map(bug_summary).collect(),
        detail: selected
            .and_then(|id| analysis.bug(id))
            .map(|bug| bug_detail(bug, can_publish)),
    }
}

#[must_use]
pub fn bug_summary(bug: &Bug) -> BugSummary {
    BugSummary {
        id: bug.id,
        bugzilla_id: bug.bugzilla_id,
        url: bug.url.clone(),
        summary: bug.summary.clone(),
        versions: bug.uplift_versions.values().map(version_tag).collect(),
        keywords: bug
            .keywords
            .iter()
            .map(|k| Tag::new(k.as_str(), TagStyle::Default))
            .collect(),
        editing: bug.editor_mode.is_open(),
    }
}

#[must_use]
pub fn bug_detail(bug: &Bug, can_publish: bool) -> BugDetail {
    BugDetail {
        summary: bug_summary(bug),
        uplift: bug.uplift_request.as_ref().map(uplift_view),
        contributors: bug.contributors.iter().map(contributor_card).collect(),
        status_flags: flag_rows(&bug.flags_status),
        tracking_flags: flag_rows(&bug.flags_tracking),
        patches: bug
            .patches
            .iter()
            .map(|(revision, patch)| patch_row(revision, patch))
            .collect(),
        landings: bug
            .landings
            .iter()
            .map(|(channel, date)| LandingRow {
                channel: channel.clone(),
                date: date.format("%d/%m/%Y").to_string(),
            })
            .collect(),
        editor: editor_panel(bug, can_publish),
        banners: banners(bug),
    }
}

fn short_version_name(name: &str) -> &str {
    name.strip_prefix(APPROVAL_PREFIX).unwrap_or(name)
}

fn version_tag(version: &UpliftVersion) -> Tag {
    Tag::new(
        format!("{} {}", short_version_name(&version.name), version.status),
        TagStyle::for_status(&version.status),
    )
}

fn uplift_view(request: &UpliftRequest) -> UpliftView {
    UpliftView {
        bugzilla_id: request.bugzilla_id,
        comment: request.comment_body.clone(),
        author: request.author.as_ref().map(contributor_card),
    }
}

fn contributor_card(contributor: &Contributor) -> ContributorCard {
    ContributorCard {
        name: contributor.name.clone(),
        email: contributor.email.clone(),
        avatar_url: contributor.avatar_url.clone(),
        roles: contributor
            .roles
            .iter()
            .map(|role| Tag::new(role.label(), TagStyle::Default))
            .collect(),
    }
}

fn flag_rows(flags: &BTreeMap<String, String>) -> Vec<FlagRow> {
    flags
        .iter()
        .filter(|(_, value)| value.as_str() != UNSET_FLAG)
        .map(|(name, value)| FlagRow {
            name: name.clone(),
            value: value.clone(),
        })
        .collect()
}

fn patch_row(revision: &str, patch: &Patch) -> PatchRow {
    PatchRow {
        revision: revision.to_string(),
        kind: if patch.is_test() { "Test" } else { "Patch" },
        source: patch.source.clone(),
        additions: patch.additions,
        deletions: patch.deletions,
        url: patch.url.clone(),
    }
}

fn publish_button(bug: &Bug, can_publish: bool) -> PublishButton {
    let reason = if bug.update_status.is_loading() {
        Some("publishing")
    } else if can_publish {
        None
    } else {
        Some("authorization not verified")
    };
    PublishButton {
        enabled: reason.is_none(),
        reason,
    }
}

fn editor_panel(bug: &Bug, can_publish: bool) -> EditorPanel {
    let comment = bug
        .pending_edits
        .get(crate::model::wire::COMMENT_KEY)
        .cloned()
        .unwrap_or_default();
    match bug.editor_mode {
        EditorMode::None => EditorPanel::Closed,
        EditorMode::Flags => {
            let fields = flag_fields("status", &bug.flags_status)
                .chain(flag_fields("tracking", &bug.flags_tracking))
                .map(|(key, current)| FlagField {
                    pending: bug.pending_edits.get(&key).cloned(),
                    key,
                    current,
                })
                .collect();
            EditorPanel::Flags {
                fields,
                comment,
                publish: publish_button(bug, can_publish),
            }
        }
        mode @ (EditorMode::Approve | EditorMode::Reject) => {
            let target = if mode == EditorMode::Approve {
                FlagStatus::Approved
            } else {
                FlagStatus::Rejected
            };
            let versions = bug
                .uplift_versions
                .values()
                .map(|version| VersionChoice {
                    name: version.name.clone(),
                    status: version_tag(version),
                    checked: is_checked(bug, version, &target),
                    attachments: version.attachment_ids.clone(),
                })
                .collect();
            EditorPanel::Decision {
                decision: mode,
                versions,
                comment,
                publish: publish_button(bug, can_publish),
            }
        }
    }
}

fn flag_fields<'a>(
    prefix: &'a str,
    flags: &'a BTreeMap<String, String>,
) -> impl Iterator<Item = (String, String)> + 'a {
    flags
        .iter()
        .map(move |(name, value)| (format!("{prefix}_{name}"), value.clone()))
}

fn is_checked(bug: &Bug, version: &UpliftVersion, target: &FlagStatus) -> bool {
    version.attachment_ids.iter().any(|attachment| {
        bug.pending_attachment_approvals
            .get(attachment)
            .and_then(|versions| versions.get(&version.name))
            == Some(target)
    })
}

fn banners(bug: &Bug) -> Vec<Banner> {
    let mut out = Vec::new();
    match &bug.update_status {
        RemoteData::NotAsked => {}
        RemoteData::Loading => out.push(Banner {
            style: TagStyle::Info,
            text: "Publishing changes to Bugzilla".to_string(),
        }),
        RemoteData::Success(BugUpdateResult::Failed(message)) => out.push(Banner {
            style: TagStyle::Danger,
            text: format!("Rejected by Bugzilla: {message}"),
        }),
        RemoteData::Success(result) => {
            let changed: usize = result.change_sets().iter().map(|c| c.changes.len()).sum();
            out.push(Banner {
                style: TagStyle::Success,
                text: format!("Bugzilla updated ({changed} field changes)"),
            });
        }
        RemoteData::Failure(err) => out.push(Banner {
            style: TagStyle::Danger,
            text: format!("Request failed: {err}"),
        }),
    }
    match &bug.sync_status {
        RemoteData::NotAsked => {}
        RemoteData::Loading => out.push(Banner {
            style: TagStyle::Info,
            text: "Syncing dashboard".to_string(),
        }),
        RemoteData::Success(()) => out.push(Banner {
            style: TagStyle::Success,
            text: "Dashboard in sync".to_string(),
        }),
        RemoteData::Failure(err) => out.push(Banner {
            style: TagStyle::Danger,
            text: format!("Dashboard sync failed: {err}"),
        }),
    }
    out
}
