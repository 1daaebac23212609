//! End-to-end runs of the update engine through fetch, edit, publish and
//! backend sync, driving `apply` by hand and answering effects inline.

use serde_json::json;
use std::collections::BTreeMap;
use uplift_core::auth::{
    AuthContext, AuthEvent, AuthorizedRequest, Credentials, Method, RawResponse, RequestPurpose,
};
use uplift_core::config::DashboardConfig;
use uplift_core::error::FetchError;
use uplift_core::model::{BugUpdateResult, EditorMode, FlagStatus};
use uplift_core::{Effect, Event, Model, RemoteData, Transition, apply};

fn analysis_3() -> serde_json::Value {
    json!({
        "id": 3,
        "name": "55",
        "count": 1,
        "bugs": [{
            "id": 9,
            "bugzilla_id": 1234,
            "url": "https://bugzilla.mozilla.org/1234",
            "summary": "Crash in nsDocShell",
            "keywords": ["crash"],
            "flags_status": {"firefox55": "affected"},
            "flags_tracking": {"firefox55": "+"},
            "contributors": [],
            "uplift": {"id": 555, "comment": "Low risk."},
            "versions": {"55": {"name": "55", "status": "?", "attachments": ["a1"]}},
            "patches": {},
            "landings": {}
        }]
    })
}

fn signed_in() -> AuthContext {
    let mut auth = AuthContext::with_credentials(Credentials {
        client_id: "mozilla-ldap/reviewer".into(),
        access_token: "token".into(),
    });
    auth.check = RemoteData::Success("mozilla-ldap/reviewer".into());
    auth
}

fn only_request(t: &Transition) -> AuthorizedRequest {
    match t.effects.as_slice() {
        [Effect::Request(request)] => request.clone(),
        other => panic!("expected exactly one request, got {other:?}"),
    }
}

fn complete(t: Transition, request: &AuthorizedRequest, status: u16, body: serde_json::Value) -> Transition {
    apply(
        Event::Auth(AuthEvent::Completed {
            purpose: request.purpose.clone(),
            response: Ok(RawResponse {
                status,
                body: body.to_string(),
            }),
        }),
        t.model,
        t.auth,
    )
}

/// Fetch analysis 3 through the effect/completion cycle.
fn loaded(auth: AuthContext) -> Transition {
    let t = apply(
        Event::StartFetchAnalysis(3),
        Model::new(DashboardConfig::default()),
        auth,
    );
    assert!(t.model.current_analysis.is_loading());
    let request = only_request(&t);
    assert_eq!(request.method, Method::Get);
    assert_eq!(request.url, "http://localhost:5000/analysis/3");
    complete(t, &request, 200, analysis_3())
}

fn send(t: Transition, event: Event) -> Transition {
    apply(event, t.model, t.auth)
}

fn toggle(t: Transition, checked: bool) -> Transition {
    let version = t.model.bug(9).unwrap().uplift_versions["55"].clone();
    send(
        t,
        Event::ToggleUpliftApproval {
            bug: 9,
            version,
            checked,
        },
    )
}

#[test]
fn approve_tick_records_plus_for_attachment() {
    let t = loaded(signed_in());
    let t = send(t, Event::StartEditingBug(9, EditorMode::Approve));
    let t = toggle(t, true);

    let expected = BTreeMap::from([(
        "a1".to_string(),
        BTreeMap::from([("55".to_string(), FlagStatus::Approved)]),
    )]);
    assert_eq!(t.model.bug(9).unwrap().pending_attachment_approvals, expected);
}

#[test]
fn approve_untick_prunes_entry() {
    let t = loaded(signed_in());
    let t = send(t, Event::StartEditingBug(9, EditorMode::Approve));
    let t = toggle(t, true);
    let t = toggle(t, false);
    assert!(t.model.bug(9).unwrap().pending_attachment_approvals.is_empty());
}

#[test]
fn switching_mode_clears_earlier_edits() {
    let t = loaded(signed_in());
    let t = send(t, Event::StartEditingBug(9, EditorMode::Flags));
    let t = send(
        t,
        Event::SetFieldEdit {
            bug: 9,
            key: "status_firefox55".into(),
            value: "fixed".into(),
        },
    );
    let t = send(t, Event::StartEditingBug(9, EditorMode::Approve));
    let bug = t.model.bug(9).unwrap();
    assert_eq!(bug.editor_mode, EditorMode::Approve);
    assert!(bug.pending_edits.is_empty());
    assert!(bug.pending_attachment_approvals.is_empty());
}

#[test]
fn transport_failure_still_closes_editor() {
    let t = loaded(signed_in());
    let t = send(t, Event::StartEditingBug(9, EditorMode::Flags));
    let t = send(
        t,
        Event::BugEditSaved(9, RemoteData::Failure(FetchError::Transport("timeout".into()))),
    );
    let bug = t.model.bug(9).unwrap();
    assert_eq!(bug.editor_mode, EditorMode::None);
    assert!(bug.update_status.failure().is_some());
    assert!(t.effects.is_empty());
}

#[test]
fn flags_publish_then_sync_round_trip() {
    let t = loaded(signed_in());
    let t = send(t, Event::StartEditingBug(9, EditorMode::Flags));
    assert!(t.model.can_publish);
    let t = send(
        t,
        Event::SetFieldEdit {
            bug: 9,
            key: "status_firefox55".into(),
            value: "fixed".into(),
        },
    );
    let t = send(
        t,
        Event::SetFieldEdit {
            bug: 9,
            key: "comment".into(),
            value: "Marking fixed.".into(),
        },
    );
    let t = send(t, Event::PublishEdits(9));
    let publish = only_request(&t);
    assert_eq!(publish.method, Method::Put);
    assert_eq!(publish.url, "https://bugzilla.mozilla.org/rest/bug/1234");
    assert_eq!(publish.purpose, RequestPurpose::BugUpdate(9));
    assert_eq!(
        publish.body,
        Some(json!({
            "comment": {"body": "Marking fixed.", "is_markdown": true},
            "cf_status_firefox55": "fixed"
        }))
    );

    let t = complete(
        t,
        &publish,
        200,
        json!({"bugs": [{"id": 1234, "changes": {"cf_status_firefox55": {"removed": "affected", "added": "fixed"}}}]}),
    );
    let bug = t.model.bug(9).unwrap();
    assert_eq!(bug.editor_mode, EditorMode::None);
    assert!(matches!(bug.update_status, RemoteData::Success(BugUpdateResult::BugChanged(_))));
    assert!(bug.sync_status.is_loading());

    let sync = only_request(&t);
    assert_eq!(sync.url, "http://localhost:5000/bugs/1234");
    assert_eq!(sync.purpose, RequestPurpose::BugSync(9));
    assert_eq!(
        sync.body,
        Some(json!([{
            "bugzilla_id": 1234,
            "target": "bug",
            "changes": {"cf_status_firefox55": {"removed": "affected", "added": "fixed"}}
        }]))
    );

    let mut fresh = analysis_3()["bugs"][0].clone();
    fresh["flags_status"]["firefox55"] = "fixed".into();
    let t = complete(t, &sync, 200, fresh);
    let bug = t.model.bug(9).unwrap();
    assert_eq!(bug.flags_status["firefox55"], "fixed");
    assert!(bug.sync_status.is_success());
    assert!(matches!(bug.update_status, RemoteData::Success(BugUpdateResult::BugChanged(_))));
    assert!(t.effects.is_empty());
}

#[test]
fn tracker_rejection_is_shown_and_not_synced() {
    let t = loaded(signed_in());
    let t = send(t, Event::StartEditingBug(9, EditorMode::Reject));
    let t = toggle(t, true);
    let t = send(t, Event::PublishEdits(9));
    let request = only_request(&t);
    assert_eq!(request.url, "https://bugzilla.mozilla.org/rest/bug/attachment/a1");
    assert_eq!(
        request.body,
        Some(json!({
            "comment": "Modified from Uplift Dashboard.",
            "flags": [{"name": "55", "status": "-"}]
        }))
    );

    let t = complete(t, &request, 401, json!({"error": true, "message": "Not authorized"}));
    let bug = t.model.bug(9).unwrap();
    assert_eq!(
        bug.update_status,
        RemoteData::Success(BugUpdateResult::Failed("Not authorized".into()))
    );
    assert_eq!(bug.sync_status, RemoteData::NotAsked);
    assert!(t.effects.is_empty());
}

#[test]
fn fetch_error_status_becomes_failure() {
    let t = apply(
        Event::StartFetchAllAnalyses,
        Model::new(DashboardConfig::default()),
        AuthContext::default(),
    );
    let request = only_request(&t);
    let t = complete(t, &request, 503, json!({"message": "maintenance"}));
    assert!(matches!(
        t.model.all_analyses.failure(),
        Some(FetchError::Http { status: 503, .. })
    ));
}

#[test]
fn unsigned_publish_is_silently_dropped() {
    let t = loaded(AuthContext::default());
    let t = send(t, Event::StartEditingBug(9, EditorMode::Approve));
    assert!(!t.model.can_publish);
    let t = toggle(t, true);
    let before = t.model.clone();
    let t = send(t, Event::PublishEdits(9));
    assert!(t.effects.is_empty());
    assert_eq!(t.model, before);
}
