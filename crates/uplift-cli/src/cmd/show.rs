use anyhow::Result;
use clap::Args;
use std::io::{self, Write};
use std::path::Path;
use uplift_core::model::AnalysisId;
use uplift_core::view::{BugDetail, BugSummary, EditorPanel, Page, project_page};

use super::{fetch_analysis, open_runtime, resolve_bug};
use crate::output::{
    OutputMode, pretty_kv, pretty_rule, pretty_section, render_mode, tag_list, write_banners,
};

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Analysis id (see `uplift analyses`)
    pub analysis: AnalysisId,

    /// Bugzilla bug number to show in detail
    #[arg(long)]
    pub bug: Option<u64>,
}

pub fn run_show(args: &ShowArgs, project_root: &Path, output: OutputMode) -> Result<()> {
    let mut runtime = open_runtime(project_root)?;
    runtime.sign_in();
    fetch_analysis(&mut runtime, args.analysis)?;

    let selected = args
        .bug
        .map(|bugzilla_id| resolve_bug(runtime.model(), bugzilla_id))
        .transpose()?;
    let page = project_page(runtime.model(), selected);
    render_mode(output, &page, render_text, render_pretty)
}

fn render_text(page: &Page, w: &mut dyn Write) -> io::Result<()> {
    let Page::Loaded(view) = page else {
        return Ok(());
    };
    if let Some(detail) = &view.detail {
        return write_detail_text(detail, w);
    }
    for bug in &view.bugs {
        writeln!(
            w,
            "{}\t{}\t{}\t{}",
            bug.bugzilla_id,
            bug.summary,
            tag_list(&bug.versions),
            tag_list(&bug.keywords)
        )?;
    }
    Ok(())
}

fn write_detail_text(detail: &BugDetail, w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "bug\t{}\t{}", detail.summary.bugzilla_id, detail.summary.summary)?;
    for flag in &detail.status_flags {
        writeln!(w, "status\t{}\t{}", flag.name, flag.value)?;
    }
    for flag in &detail.tracking_flags {
        writeln!(w, "tracking\t{}\t{}", flag.name, flag.value)?;
    }
    for patch in &detail.patches {
        writeln!(
            w,
            "{}\t{}\t+{}\t-{}",
            patch.kind.to_lowercase(),
            patch.revision,
            patch.additions,
            patch.deletions
        )?;
    }
    for landing in &detail.landings {
        writeln!(w, "landed\t{}\t{}", landing.channel, landing.date)?;
    }
    write_banners(w, &detail.banners)
}

fn render_pretty(page: &Page, w: &mut dyn Write) -> io::Result<()> {
    match page {
        Page::NotSelected => writeln!(w, "No analysis selected."),
        Page::Loading => writeln!(w, "Loading..."),
        Page::Error { message } => writeln!(w, "Error: {message}"),
        Page::Loaded(view) => {
            pretty_section(w, &format!("Analysis {} ({} bugs)", view.name, view.count))?;
            for bug in &view.bugs {
                write_summary_pretty(bug, w)?;
            }
            if let Some(detail) = &view.detail {
                writeln!(w)?;
                write_detail_pretty(detail, w)?;
            }
            Ok(())
        }
    }
}

fn write_summary_pretty(bug: &BugSummary, w: &mut dyn Write) -> io::Result<()> {
    let marker = if bug.editing { "*" } else { " " };
    writeln!(w, "{marker}{:>8}  {}", bug.bugzilla_id, bug.summary)?;
    if !bug.versions.is_empty() || !bug.keywords.is_empty() {
        writeln!(w, "{:>10}  {} {}", "", tag_list(&bug.versions), tag_list(&bug.keywords))?;
    }
    Ok(())
}

fn write_detail_pretty(detail: &BugDetail, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(
        w,
        &format!("Bug {}: {}", detail.summary.bugzilla_id, detail.summary.summary),
    )?;
    pretty_kv(w, "URL", &detail.summary.url)?;
    if let Some(uplift) = &detail.uplift {
        pretty_kv(w, "Uplift", format!("request {}", uplift.bugzilla_id))?;
        if let Some(author) = &uplift.author {
            pretty_kv(w, "Requested", &author.name)?;
        }
        for line in uplift.comment.lines() {
            writeln!(w, "    {line}")?;
        }
    }
    for person in &detail.contributors {
        pretty_kv(
            w,
            "Contributor",
            format!("{} <{}> {}", person.name, person.email, tag_list(&person.roles)),
        )?;
    }
    for flag in &detail.status_flags {
        pretty_kv(w, "Status", format!("{} {}", flag.name, flag.value))?;
    }
    for flag in &detail.tracking_flags {
        pretty_kv(w, "Tracking", format!("{} {}", flag.name, flag.value))?;
    }
    for patch in &detail.patches {
        pretty_kv(
            w,
            patch.kind,
            format!(
                "{} ({}) +{} -{}",
                patch.revision, patch.source, patch.additions, patch.deletions
            ),
        )?;
    }
    for landing in &detail.landings {
        pretty_kv(w, "Landed", format!("{} on {}", landing.channel, landing.date))?;
    }
    match &detail.editor {
        EditorPanel::Closed => {}
        EditorPanel::Flags { fields, .. } => {
            pretty_rule(w)?;
            for field in fields {
                let pending = field.pending.as_deref().unwrap_or("");
                pretty_kv(w, "Edit", format!("{} {} -> {pending}", field.key, field.current))?;
            }
        }
        EditorPanel::Decision { versions, .. } => {
            pretty_rule(w)?;
            for version in versions {
                let tick = if version.checked { "x" } else { " " };
                writeln!(w, "[{tick}] {}", version.name)?;
            }
        }
    }
    write_banners(w, &detail.banners)
}
