use anyhow::Result;
use std::io::Write;
use std::path::Path;
use uplift_core::view::{Menu, project_menu};
use uplift_core::{Event, RemoteData};

use super::{fetch_error, open_runtime};
use crate::output::{OutputMode, pretty_section, render_mode};

pub fn run_analyses(project_root: &Path, output: OutputMode) -> Result<()> {
    let mut runtime = open_runtime(project_root)?;
    runtime.dispatch(Event::StartFetchAllAnalyses);
    if let RemoteData::Failure(err) = &runtime.model().all_analyses {
        return Err(fetch_error(err));
    }

    let menu = project_menu(runtime.model());
    render_mode(output, &menu, render_text, render_pretty)
}

fn render_text(menu: &Menu, w: &mut dyn Write) -> std::io::Result<()> {
    if let Menu::Loaded { analyses } = menu {
        for entry in analyses {
            writeln!(w, "{}\t{}\t{}", entry.id, entry.name, entry.count)?;
        }
    }
    Ok(())
}

fn render_pretty(menu: &Menu, w: &mut dyn Write) -> std::io::Result<()> {
    let Menu::Loaded { analyses } = menu else {
        return Ok(());
    };
    pretty_section(w, "Analyses")?;
    if analyses.is_empty() {
        writeln!(w, "(none)")?;
    }
    for entry in analyses {
        writeln!(w, "{:>5}  {:<24} {:>4} bugs", entry.id, entry.name, entry.count)?;
    }
    Ok(())
}
