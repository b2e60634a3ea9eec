// src/notices.rs

//! Notices file rendering
//!
//! One block per license text: the files using it, a dash rule as wide as
//! the longest file name, the text, and a blank line.

use crate::batch::BatchReport;
use crate::error::Result;
use crate::normalize::LINE_ENDING;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::info;

/// Render the notices document for `report`
pub fn render(report: &BatchReport) -> String {
    let mut out = String::new();

    for group in &report.groups {
        let mut seen = HashSet::new();
        let names: Vec<String> = group
            .files
            .iter()
            .filter(|file| seen.insert(file.source_path.as_path()))
            .map(|file| file.display_name())
            .collect();

        let longest = names.iter().map(|n| n.chars().count()).max().unwrap_or(0);
        for name in &names {
            out.push_str(name);
            out.push_str(LINE_ENDING);
        }
        out.push_str(&"-".repeat(longest));
        out.push_str(LINE_ENDING);
        out.push_str(&group.text);
        out.push_str(LINE_ENDING);
        out.push_str(LINE_ENDING);
    }

    out
}

/// Write the notices file, returning `false` when nothing resolved
pub fn write(path: &Path, report: &BatchReport) -> Result<bool> {
    if report.is_empty() {
        info!("No licenses resolved, not writing {}", path.display());
        return Ok(false);
    }

    fs::write(path, render(report))?;
    info!("Wrote {} license groups to {}", report.groups.len(), path.display());
    Ok(true)
}
