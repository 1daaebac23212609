//! The update engine: one pure transition from `(event, model, auth)` to
//! `(model', auth', effects)`.
//!
//! All state lives in [`Model`] and is passed by value. Asynchronous work is
//! never performed here; it is described as [`Effect`]s and its outcome comes
//! back later as another [`Event`]. Every bug mutation goes through
//! [`update_bug`].

use tracing::{debug, info, warn};

use crate::approvals::toggle_approval;
use crate::auth::{AuthContext, AuthEvent, AuthorizedRequest, Credentials, RequestPurpose};
use crate::config::DashboardConfig;
use crate::error::FetchError;
use crate::model::wire::{attachment_update_body, comment_or_default, flags_update_body};
use crate::model::{
    Analysis, AnalysisId, Bug, BugId, BugUpdateResult, EditorMode, UpliftVersion,
};
use crate::remote::RemoteData;

/// Everything the dashboard knows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Model {
    pub config: DashboardConfig,
    pub all_analyses: RemoteData<Vec<Analysis>>,
    pub current_analysis: RemoteData<Analysis>,
    /// Whether publishing to the tracker is expected to succeed, as of the
    /// last editor opening.
    pub can_publish: bool,
}

impl Model {
    #[must_use]
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            config,
            all_analyses: RemoteData::NotAsked,
            current_analysis: RemoteData::NotAsked,
            can_publish: false,
        }
    }

    /// Find a bug of the loaded analysis.
    #[must_use]
    pub fn bug(&self, id: BugId) -> Option<&Bug> {
        self.current_analysis.success().and_then(|a| a.bug(id))
    }
}

#[derive(Debug, Clone)]
pub enum Event {
    StartFetchAllAnalyses,
    AllAnalysesFetched(RemoteData<Vec<Analysis>>),
    StartFetchAnalysis(AnalysisId),
    AnalysisFetched(RemoteData<Analysis>),
    StartEditingBug(BugId, EditorMode),
    CancelEditing(BugId),
    SetFieldEdit {
        bug: BugId,
        key: String,
        value: String,
    },
    ToggleUpliftApproval {
        bug: BugId,
        version: UpliftVersion,
        checked: bool,
    },
    PublishEdits(BugId),
    BugEditSaved(BugId, RemoteData<BugUpdateResult>),
    BugRefetched(BugId, RemoteData<Bug>),
    Auth(AuthEvent),
}

/// Work the host must perform on behalf of the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Sign with the current credentials and send.
    Request(AuthorizedRequest),
    /// Verify credentials and report back with `AuthEvent::CheckCompleted`.
    CheckCredentials(Credentials),
}

#[derive(Debug, Clone)]
pub struct Transition {
    pub model: Model,
    pub auth: AuthContext,
    pub effects: Vec<Effect>,
}

impl Transition {
    const fn unchanged(model: Model, auth: AuthContext) -> Self {
        Self {
            model,
            auth,
            effects: Vec::new(),
        }
    }

    fn with_effects(model: Model, auth: AuthContext, effects: Vec<Effect>) -> Self {
        Self {
            model,
            auth,
            effects,
        }
    }
}

/// Apply one event.
#[must_use]
pub fn apply(event: Event, mut model: Model, auth: AuthContext) -> Transition {
    match event {
        Event::StartFetchAllAnalyses => {
            model.all_analyses = RemoteData::Loading;
            let request = AuthorizedRequest::get(
                model.config.backend("analysis"),
                RequestPurpose::AllAnalyses,
            );
            Transition::with_effects(model, auth, vec![Effect::Request(request)])
        }
        Event::AllAnalysesFetched(result) => {
            debug!(state = result.label(), "analysis list received");
            model.all_analyses = result;
            model.current_analysis = RemoteData::NotAsked;
            Transition::unchanged(model, auth)
        }
        Event::StartFetchAnalysis(id) => {
            model.current_analysis = RemoteData::Loading;
            let request = AuthorizedRequest::get(
                model.config.backend(&format!("analysis/{id}")),
                RequestPurpose::Analysis,
            );
            Transition::with_effects(model, auth, vec![Effect::Request(request)])
        }
        Event::AnalysisFetched(result) => {
            if let RemoteData::Failure(err) = &result {
                warn!("analysis fetch failed: {err}");
            }
            model.current_analysis = result;
            Transition::unchanged(model, auth)
        }
        Event::StartEditingBug(bug_id, mode) => start_editing(model, auth, bug_id, mode),
        Event::CancelEditing(bug_id) => start_editing(model, auth, bug_id, EditorMode::None),
        Event::SetFieldEdit { bug, key, value } => {
            let model = update_bug(model, bug, |mut b| {
                b.pending_edits.insert(key.clone(), value.clone());
                b
            });
            Transition::unchanged(model, auth)
        }
        Event::ToggleUpliftApproval {
            bug,
            version,
            checked,
        } => {
            let model = update_bug(model, bug, |mut b| {
                b.pending_attachment_approvals = toggle_approval(
                    &b.pending_attachment_approvals,
                    b.editor_mode,
                    &version,
                    checked,
                );
                b
            });
            Transition::unchanged(model, auth)
        }
        Event::PublishEdits(bug_id) => publish(model, auth, bug_id),
        Event::BugEditSaved(bug_id, result) => edit_saved(model, auth, bug_id, result),
        Event::BugRefetched(bug_id, result) => {
            let model = match result {
                RemoteData::Success(fresh) => {
                    info!(bug = bug_id, "bug refreshed from backend");
                    update_bug(model, bug_id, |b| b.refreshed_from(fresh.clone()))
                }
                RemoteData::Failure(err) => {
                    warn!(bug = bug_id, "backend sync failed: {err}");
                    update_bug(model, bug_id, |mut b| {
                        b.sync_status = RemoteData::Failure(err.clone());
                        b
                    })
                }
                RemoteData::NotAsked | RemoteData::Loading => model,
            };
            Transition::unchanged(model, auth)
        }
        Event::Auth(auth_event) => apply_auth(auth_event, model, auth),
    }
}

/// Rebuild the bug list of the loaded analysis, applying `f` to the bug
/// with `bug_id` only. Order and all other bugs are preserved; nothing
/// happens unless the analysis is loaded.
#[must_use]
pub fn update_bug(mut model: Model, bug_id: BugId, mut f: impl FnMut(Bug) -> Bug) -> Model {
    model.current_analysis = match model.current_analysis {
        RemoteData::Success(analysis) => {
            let Analysis {
                id,
                name,
                count,
                bugs,
            } = analysis;
            let bugs = bugs
                .into_iter()
                .map(|bug| if bug.id == bug_id { f(bug) } else { bug })
                .collect();
            RemoteData::Success(Analysis {
                id,
                name,
                count,
                bugs,
            })
        }
        other => other,
    };
    model
}

fn start_editing(model: Model, auth: AuthContext, bug_id: BugId, mode: EditorMode) -> Transition {
    let Some(analysis) = model.current_analysis.success() else {
        debug!(bug = bug_id, "editor ignored: no analysis loaded");
        return Transition::unchanged(model, auth);
    };
    if analysis.bug(bug_id).is_none() {
        debug!(bug = bug_id, "editor ignored: unknown bug");
        return Transition::unchanged(model, auth);
    }

    // One open editor at a time.
    let others: Vec<BugId> = analysis
        .bugs
        .iter()
        .filter(|b| b.id != bug_id && b.editor_mode.is_open())
        .map(|b| b.id)
        .collect();
    let mut model = others.into_iter().fold(model, |model, other| {
        update_bug(model, other, |mut b| {
            b.close_editor();
            b
        })
    });

    model.can_publish = auth.is_verified();
    debug!(bug = bug_id, %mode, can_publish = model.can_publish, "editor mode set");
    let model = update_bug(model, bug_id, |mut b| {
        b.close_editor();
        b.editor_mode = mode;
        b
    });
    Transition::unchanged(model, auth)
}

fn publish(model: Model, auth: AuthContext, bug_id: BugId) -> Transition {
    let Some(bug) = model.bug(bug_id) else {
        return Transition::unchanged(model, auth);
    };
    if auth.credentials.is_none() {
        debug!(bug = bug_id, "publish dropped: no credentials");
        return Transition::unchanged(model, auth);
    }

    let requests = publish_requests(&model.config, bug);
    if requests.is_empty() {
        debug!(bug = bug_id, mode = %bug.editor_mode, "nothing to publish");
        return Transition::unchanged(model, auth);
    }

    info!(
        bug = bug_id,
        bugzilla_id = bug.bugzilla_id,
        requests = requests.len(),
        "publishing edits"
    );
    let model = update_bug(model, bug_id, |mut b| {
        b.update_status = RemoteData::Loading;
        b
    });
    let effects = requests.into_iter().map(Effect::Request).collect();
    Transition::with_effects(model, auth, effects)
}

/// Tracker requests for the bug's open editor.
///
/// Flag edits go out as a single bug update; approvals and rejections as one
/// request per attachment, with no ordering between them.
#[must_use]
pub fn publish_requests(config: &DashboardConfig, bug: &Bug) -> Vec<AuthorizedRequest> {
    let purpose = RequestPurpose::BugUpdate(bug.id);
    match bug.editor_mode {
        EditorMode::None => Vec::new(),
        EditorMode::Flags => vec![AuthorizedRequest::put(
            config.tracker(&format!("bug/{}", bug.bugzilla_id)),
            flags_update_body(&bug.pending_edits, &config.default_comment),
            purpose,
        )],
        EditorMode::Approve | EditorMode::Reject => {
            let comment = comment_or_default(&bug.pending_edits, &config.default_comment);
            bug.pending_attachment_approvals
                .iter()
                .map(|(attachment_id, versions)| {
                    AuthorizedRequest::put(
                        config.tracker(&format!("bug/attachment/{attachment_id}")),
                        attachment_update_body(comment, versions),
                        purpose.clone(),
                    )
                })
                .collect()
        }
    }
}

fn edit_saved(
    model: Model,
    auth: AuthContext,
    bug_id: BugId,
    result: RemoteData<BugUpdateResult>,
) -> Transition {
    let sync = match (&result, model.bug(bug_id)) {
        (RemoteData::Success(update), Some(bug)) => update
            .sync_payload()
            .map(|payload| (bug.bugzilla_id, payload)),
        _ => None,
    };
    // Signed out while the tracker update was in flight: the tracker has the
    // change, the dashboard never hears of it.
    let unsynced = sync.is_some() && auth.credentials.is_none();
    if unsynced {
        warn!(bug = bug_id, "tracker accepted update but dashboard sync skipped: signed out");
    }
    let sync = sync.filter(|_| !unsynced);

    match &result {
        RemoteData::Success(BugUpdateResult::Failed(message)) => {
            warn!(bug = bug_id, "tracker rejected update: {message}");
        }
        RemoteData::Failure(err) => warn!(bug = bug_id, "tracker update failed: {err}"),
        _ => info!(bug = bug_id, state = result.label(), "tracker update finished"),
    }

    let syncing = sync.is_some();
    let model = update_bug(model, bug_id, |mut b| {
        b.update_status = result.clone();
        b.close_editor();
        if syncing {
            b.sync_status = RemoteData::Loading;
        } else if unsynced {
            b.sync_status = RemoteData::Failure(FetchError::Unauthenticated(
                "dashboard not updated".into(),
            ));
        }
        b
    });

    let effects = match sync {
        Some((bugzilla_id, payload)) => match serde_json::to_value(payload) {
            Ok(body) => vec![Effect::Request(AuthorizedRequest::put(
                model.config.backend(&format!("bugs/{bugzilla_id}")),
                body,
                RequestPurpose::BugSync(bug_id),
            ))],
            Err(err) => {
                warn!(bug = bug_id, "could not encode backend change list: {err}");
                Vec::new()
            }
        },
        None => Vec::new(),
    };
    Transition::with_effects(model, auth, effects)
}

fn apply_auth(event: AuthEvent, mut model: Model, mut auth: AuthContext) -> Transition {
    match event {
        AuthEvent::Login(credentials) => {
            info!(client_id = %credentials.client_id, "credentials loaded");
            auth.credentials = Some(credentials.clone());
            auth.check = RemoteData::Loading;
            Transition::with_effects(model, auth, vec![Effect::CheckCredentials(credentials)])
        }
        AuthEvent::Logout => {
            model.can_publish = false;
            Transition::unchanged(model, AuthContext::default())
        }
        AuthEvent::CheckCompleted(result) => {
            if let RemoteData::Failure(err) = &result {
                warn!("credential check failed: {err}");
            }
            auth.check = result;
            model.can_publish = auth.is_verified();
            Transition::unchanged(model, auth)
        }
        AuthEvent::Completed { purpose, response } => {
            let routed = match purpose {
                RequestPurpose::AllAnalyses => Event::AllAnalysesFetched(RemoteData::from_result(
                    response.and_then(|r| r.json::<Vec<Analysis>>()),
                )),
                RequestPurpose::Analysis => Event::AnalysisFetched(RemoteData::from_result(
                    response.and_then(|r| r.json::<Analysis>()),
                )),
                RequestPurpose::BugUpdate(bug_id) => Event::BugEditSaved(
                    bug_id,
                    RemoteData::from_result(response.and_then(|r| r.update_result())),
                ),
                RequestPurpose::BugSync(bug_id) => Event::BugRefetched(
                    bug_id,
                    RemoteData::from_result(response.and_then(|r| r.json::<Bug>())),
                ),
                RequestPurpose::Other(tag) => {
                    debug!(%tag, "ignoring completion with unknown purpose");
                    return Transition::unchanged(model, auth);
                }
            };
            apply(routed, model, auth)
        }
    }
}
