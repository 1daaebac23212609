use anyhow::Result;
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;
use uplift_core::config::{DashboardConfig, resolve_config};

use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

/// Resolved settings as shown to the user; the access token never leaves
/// the process.
#[derive(Debug, Serialize)]
pub struct ConfigView {
    pub backend_url: String,
    pub bugzilla_url: String,
    pub default_comment: String,
    pub client_id: Option<String>,
}

impl From<DashboardConfig> for ConfigView {
    fn from(config: DashboardConfig) -> Self {
        Self {
            backend_url: config.backend_url,
            bugzilla_url: config.bugzilla_url,
            default_comment: config.default_comment,
            client_id: config.credentials.map(|c| c.client_id),
        }
    }
}

pub fn run_config(project_root: &Path, output: OutputMode) -> Result<()> {
    let view = ConfigView::from(resolve_config(project_root)?);
    render_mode(output, &view, render_text, render_pretty)
}

fn render_text(view: &ConfigView, w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "backend_url\t{}", view.backend_url)?;
    writeln!(w, "bugzilla_url\t{}", view.bugzilla_url)?;
    writeln!(w, "default_comment\t{}", view.default_comment)?;
    writeln!(w, "client_id\t{}", view.client_id.as_deref().unwrap_or("-"))
}

fn render_pretty(view: &ConfigView, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, "Configuration")?;
    pretty_kv(w, "Backend", &view.backend_url)?;
    pretty_kv(w, "Bugzilla", &view.bugzilla_url)?;
    pretty_kv(w, "Comment", &view.default_comment)?;
    pretty_kv(w, "Client", view.client_id.as_deref().unwrap_or("(not signed in)"))
}
