pub mod analyses;
pub mod config;
pub mod edit;
pub mod show;

use anyhow::{Result, anyhow, bail};
use std::path::Path;
use uplift_core::config::resolve_config;
use uplift_core::error::{ErrorCode, FetchError};
use uplift_core::model::{AnalysisId, BugId};
use uplift_core::runtime::{Runtime, Transport};
use uplift_core::update::Model;
use uplift_core::{Event, RemoteData};

use crate::transport::HttpTransport;

pub fn open_runtime(project_root: &Path) -> Result<Runtime<HttpTransport>> {
    let config = resolve_config(project_root)?;
    let transport = HttpTransport::new(&config);
    Ok(Runtime::new(transport, config))
}

/// Format an [`ErrorCode`] failure with its hint, the way every command
/// reports errors.
pub fn coded(code: ErrorCode, detail: impl std::fmt::Display) -> anyhow::Error {
    match code.hint() {
        Some(hint) => anyhow!("{} ({code}): {detail}\nhint: {hint}", code.message()),
        None => anyhow!("{} ({code}): {detail}", code.message()),
    }
}

pub fn fetch_error(err: &FetchError) -> anyhow::Error {
    coded(err.code(), err)
}

/// Load `id` into the runtime's model or fail with a coded error.
pub fn fetch_analysis<T: Transport>(runtime: &mut Runtime<T>, id: AnalysisId) -> Result<()> {
    runtime.dispatch(Event::StartFetchAnalysis(id));
    match &runtime.model().current_analysis {
        RemoteData::Success(_) => Ok(()),
        RemoteData::Failure(FetchError::Http { status: 404, .. }) => {
            Err(coded(ErrorCode::AnalysisNotFound, format!("analysis {id}")))
        }
        RemoteData::Failure(err) => Err(fetch_error(err)),
        RemoteData::NotAsked | RemoteData::Loading => bail!(
            "{} ({})",
            ErrorCode::InternalUnexpected.message(),
            ErrorCode::InternalUnexpected
        ),
    }
}

/// Find the dashboard id of the bug with tracker number `bugzilla_id`.
pub fn resolve_bug(model: &Model, bugzilla_id: u64) -> Result<BugId> {
    model
        .current_analysis
        .success()
        .and_then(|analysis| analysis.bugs.iter().find(|b| b.bugzilla_id == bugzilla_id))
        .map(|bug| bug.id)
        .ok_or_else(|| coded(ErrorCode::BugNotFound, format!("bug {bugzilla_id}")))
}
