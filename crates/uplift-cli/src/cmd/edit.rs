//! `flags`, `approve` and `reject`: open an editor on one bug, fill it in,
//! publish, and report what the tracker and backend said.

use anyhow::{Result, anyhow};
use clap::Args;
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;
use tracing::warn;
use uplift_core::error::ErrorCode;
use uplift_core::model::wire::COMMENT_KEY;
use uplift_core::model::{
    AnalysisId, Bug, BugId, BugUpdateResult, EditorMode, FlagStatus, UpliftVersion,
};
use uplift_core::runtime::{Runtime, Transport};
use uplift_core::view::{Banner, bug_detail};
use uplift_core::{Event, RemoteData};

use super::{coded, fetch_analysis, fetch_error, open_runtime, resolve_bug};
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode, write_banners};
use crate::transport::HttpTransport;

#[derive(Args, Debug)]
pub struct FlagsArgs {
    /// Analysis id
    pub analysis: AnalysisId,

    /// Bugzilla bug number
    pub bug: u64,

    /// Field edit as key=value (e.g. status_firefox55=fixed); repeatable
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_key_val, required = true)]
    pub edits: Vec<(String, String)>,

    /// Comment posted with the change
    #[arg(long)]
    pub comment: Option<String>,
}

#[derive(Args, Debug)]
pub struct DecisionArgs {
    /// Analysis id
    pub analysis: AnalysisId,

    /// Bugzilla bug number
    pub bug: u64,

    /// Uplift flag name (e.g. approval-mozilla-beta); repeatable
    #[arg(long = "version", value_name = "NAME", required = true)]
    pub versions: Vec<String>,

    /// Comment posted with the decision
    #[arg(long)]
    pub comment: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EditReport {
    pub bug: u64,
    pub mode: EditorMode,
    pub outcome: &'static str,
    pub banners: Vec<Banner>,
}

fn parse_key_val(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in `{raw}`"));
    }
    if key == COMMENT_KEY {
        return Err("use --comment for the comment".to_string());
    }
    Ok((key.to_string(), value.to_string()))
}

pub fn run_flags(args: &FlagsArgs, project_root: &Path, output: OutputMode) -> Result<()> {
    publish(
        project_root,
        args.analysis,
        args.bug,
        EditorMode::Flags,
        args.comment.as_deref(),
        output,
        |runtime, bug_id| {
            for (key, value) in &args.edits {
                runtime.dispatch(Event::SetFieldEdit {
                    bug: bug_id,
                    key: key.clone(),
                    value: value.clone(),
                });
            }
            Ok(())
        },
    )
}

pub fn run_decision(
    args: &DecisionArgs,
    mode: EditorMode,
    project_root: &Path,
    output: OutputMode,
) -> Result<()> {
    publish(
        project_root,
        args.analysis,
        args.bug,
        mode,
        args.comment.as_deref(),
        output,
        |runtime, bug_id| tick_versions(runtime, bug_id, &args.versions),
    )
}

fn tick_versions<T: Transport>(
    runtime: &mut Runtime<T>,
    bug_id: BugId,
    names: &[String],
) -> Result<()> {
    for name in names {
        let versions = runtime
            .model()
            .bug(bug_id)
            .map(|bug| versions_to_tick(bug, name))
            .unwrap_or_default();
        if versions.is_empty() {
            return Err(coded(ErrorCode::VersionNotFound, name));
        }
        for version in versions {
            runtime.dispatch(Event::ToggleUpliftApproval {
                bug: bug_id,
                version,
                checked: true,
            });
        }
    }
    Ok(())
}

/// Groups named `name` still awaiting a decision, or every group with that
/// name when none is pending.
fn versions_to_tick(bug: &Bug, name: &str) -> Vec<UpliftVersion> {
    let pending: Vec<UpliftVersion> = bug
        .versions_named(name)
        .filter(|v| v.status == FlagStatus::Pending)
        .cloned()
        .collect();
    if pending.is_empty() {
        bug.versions_named(name).cloned().collect()
    } else {
        pending
    }
}

fn publish(
    project_root: &Path,
    analysis: AnalysisId,
    bugzilla_id: u64,
    mode: EditorMode,
    comment: Option<&str>,
    output: OutputMode,
    fill: impl FnOnce(&mut Runtime<HttpTransport>, BugId) -> Result<()>,
) -> Result<()> {
    let mut runtime = open_runtime(project_root)?;
    run_publish(&mut runtime, analysis, bugzilla_id, mode, comment, output, fill)
}

fn run_publish<T: Transport>(
    runtime: &mut Runtime<T>,
    analysis: AnalysisId,
    bugzilla_id: u64,
    mode: EditorMode,
    comment: Option<&str>,
    output: OutputMode,
    fill: impl FnOnce(&mut Runtime<T>, BugId) -> Result<()>,
) -> Result<()> {
    if runtime.model().config.credentials.is_none() {
        return Err(coded(ErrorCode::MissingCredentials, "publishing needs credentials"));
    }
    if !runtime.sign_in() {
        warn!("credential check did not succeed; the tracker may refuse the update");
    }

    fetch_analysis(runtime, analysis)?;
    let bug_id = resolve_bug(runtime.model(), bugzilla_id)?;
    runtime.dispatch(Event::StartEditingBug(bug_id, mode));
    fill(runtime, bug_id)?;
    if let Some(text) = comment {
        runtime.dispatch(Event::SetFieldEdit {
            bug: bug_id,
            key: COMMENT_KEY.to_string(),
            value: text.to_string(),
        });
    }
    runtime.dispatch(Event::PublishEdits(bug_id));

    let model = runtime.model();
    let bug = model
        .bug(bug_id)
        .ok_or_else(|| coded(ErrorCode::BugNotFound, format!("bug {bugzilla_id}")))?;
    let report = EditReport {
        bug: bugzilla_id,
        mode,
        outcome: bug.update_status.label(),
        banners: bug_detail(bug, model.can_publish).banners,
    };
    render_mode(output, &report, render_text, render_pretty)?;

    match &bug.update_status {
        RemoteData::Success(BugUpdateResult::Failed(message)) => {
            Err(coded(ErrorCode::UpdateRejected, message))
        }
        RemoteData::Failure(err) => Err(fetch_error(err)),
        RemoteData::NotAsked => Err(anyhow!("nothing to publish for bug {bugzilla_id}")),
        RemoteData::Success(_) | RemoteData::Loading => Ok(()),
    }
}

fn render_text(report: &EditReport, w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "{}\t{}\t{}", report.bug, report.mode, report.outcome)?;
    write_banners(w, &report.banners)
}

fn render_pretty(report: &EditReport, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, &format!("Bug {}", report.bug))?;
    pretty_kv(w, "Mode", report.mode.to_string())?;
    pretty_kv(w, "Outcome", report.outcome)?;
    write_banners(w, &report.banners)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_val_parses() {
        assert_eq!(
            parse_key_val("status_firefox55=fixed").unwrap(),
            ("status_firefox55".to_string(), "fixed".to_string())
        );
        assert_eq!(
            parse_key_val("tracking_firefox55=").unwrap(),
            ("tracking_firefox55".to_string(), String::new())
        );
    }

    struct Offline;

    impl Transport for Offline {
        fn send(
            &self,
            request: &uplift_core::auth::AuthorizedRequest,
            _credentials: Option<&uplift_core::auth::Credentials>,
        ) -> Result<uplift_core::auth::RawResponse, uplift_core::error::FetchError> {
            Err(uplift_core::error::FetchError::Transport(format!(
                "offline: {}",
                request.url
            )))
        }

        fn check(
            &self,
            _credentials: &uplift_core::auth::Credentials,
        ) -> Result<String, uplift_core::error::FetchError> {
            Err(uplift_core::error::FetchError::Transport("offline".into()))
        }
    }

    #[test]
    fn publishing_without_credentials_fails_early() {
        let mut runtime = Runtime::new(Offline, uplift_core::config::DashboardConfig::default());
        let err = run_publish(
            &mut runtime,
            3,
            1234,
            EditorMode::Flags,
            None,
            OutputMode::Text,
            |_, _| Ok(()),
        )
        .unwrap_err();
        assert!(err.to_string().contains("E3001"));
        assert_eq!(runtime.transitions(), 0);
    }

    #[test]
    fn unreachable_backend_reports_transport_code() {
        let config = uplift_core::config::DashboardConfig {
            credentials: Some(uplift_core::auth::Credentials {
                client_id: "reviewer".into(),
                access_token: "t".into(),
            }),
            ..uplift_core::config::DashboardConfig::default()
        };
        let mut runtime = Runtime::new(Offline, config);
        let err = run_publish(
            &mut runtime,
            3,
            1234,
            EditorMode::Approve,
            None,
            OutputMode::Text,
            |_, _| Ok(()),
        )
        .unwrap_err();
        assert!(err.to_string().contains("E4001"));
        assert!(!runtime.auth().is_verified());
    }

    fn split_beta_analysis() -> uplift_core::model::Analysis {
        serde_json::from_value(serde_json::json!({
            "id": 3,
            "name": "55",
            "bugs": [{
                "id": 9,
                "bugzilla_id": 1234,
                "versions": {
                    "beta +": {"name": "approval-mozilla-beta", "status": "+", "attachments": ["a1"]},
                    "beta ?": {"name": "approval-mozilla-beta", "status": "?", "attachments": ["a2", "a3"]}
                }
            }]
        }))
        .unwrap()
    }

    #[test]
    fn ticking_a_version_targets_pending_attachments() {
        let mut runtime = Runtime::new(Offline, uplift_core::config::DashboardConfig::default());
        runtime.dispatch(Event::AnalysisFetched(RemoteData::Success(split_beta_analysis())));
        runtime.dispatch(Event::StartEditingBug(9, EditorMode::Approve));

        tick_versions(&mut runtime, 9, &["approval-mozilla-beta".to_string()]).unwrap();

        let pending = &runtime.model().bug(9).unwrap().pending_attachment_approvals;
        let ticked: Vec<&str> = pending.keys().map(String::as_str).collect();
        assert_eq!(ticked, vec!["a2", "a3"]);
        assert_eq!(pending["a2"]["approval-mozilla-beta"], FlagStatus::Approved);
    }

    #[test]
    fn decided_versions_are_ticked_when_nothing_is_pending() {
        let analysis = split_beta_analysis();
        let mut bug = analysis.bugs[0].clone();
        bug.uplift_versions.remove("beta ?");
        let versions = versions_to_tick(&bug, "approval-mozilla-beta");
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].attachment_ids, vec!["a1"]);
        assert!(versions_to_tick(&bug, "approval-mozilla-release").is_empty());
    }

    #[test]
    fn unknown_version_reports_code() {
        let mut runtime = Runtime::new(Offline, uplift_core::config::DashboardConfig::default());
        runtime.dispatch(Event::AnalysisFetched(RemoteData::Success(split_beta_analysis())));
        runtime.dispatch(Event::StartEditingBug(9, EditorMode::Reject));
        let err = tick_versions(&mut runtime, 9, &["approval-mozilla-esr52".to_string()])
            .unwrap_err();
        assert!(err.to_string().contains("E2003"));
    }

    #[test]
    fn key_val_rejects_bad_input() {
        assert!(parse_key_val("no-equals").is_err());
        assert!(parse_key_val("=x").is_err());
        assert!(parse_key_val("comment=hi").is_err());
    }
}
