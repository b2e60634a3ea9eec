// src/batch.rs

//! Batch resolution
//!
//! Runs the pipeline over many records with bounded concurrency against one
//! shared cache, then groups the results by license text.

use crate::pipeline::{LicensePipeline, Resolution, log_outcome};
use crate::progress::ProgressTracker;
use crate::record::ResolvedFile;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use tracing::{error, info, warn};

/// Default number of records resolved at once
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Records that share one license text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseGroup {
    pub text: String,
    pub files: Vec<ResolvedFile>,
}

/// Outcome of a batch run
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Resolved records grouped by text, in first-seen input order
    pub groups: Vec<LicenseGroup>,
    pub unresolved: Vec<ResolvedFile>,
    pub canceled: Vec<ResolvedFile>,
}

impl BatchReport {
    /// Build a report from per-record outcomes in input order
    pub fn from_outcomes(outcomes: impl IntoIterator<Item = (ResolvedFile, Resolution)>) -> Self {
        let mut report = BatchReport::default();
        let mut index_of: HashMap<String, usize> = HashMap::new();

        for (record, resolution) in outcomes {
            match resolution {
                Resolution::Resolved(text) => match index_of.get(&text) {
                    Some(&i) => report.groups[i].files.push(record),
                    None => {
                        index_of.insert(text.clone(), report.groups.len());
                        report.groups.push(LicenseGroup {
                            text,
                            files: vec![record],
                        });
                    }
                },
                Resolution::Unresolved => report.unresolved.push(record),
                Resolution::Canceled => report.canceled.push(record),
            }
        }
        report
    }

    pub fn resolved_count(&self) -> usize {
        self.groups.iter().map(|g| g.files.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn was_canceled(&self) -> bool {
        !self.canceled.is_empty()
    }
}

/// Resolve `records` with at most `concurrency` in flight
pub async fn resolve_all(
    pipeline: &LicensePipeline,
    records: Vec<ResolvedFile>,
    concurrency: usize,
    progress: &dyn ProgressTracker,
) -> BatchReport {
    let total = records.len();
    info!("Resolving licenses for {} files", total);

    let mut outcomes: Vec<(usize, ResolvedFile, Resolution)> =
        stream::iter(records.into_iter().enumerate())
            .map(|(index, record)| async move {
                if record.manifest.is_none() {
                    warn!("No package manifest for {}", record.display_name());
                }
                let resolution = pipeline.resolve(&record).await;
                log_outcome(&record, &resolution);
                progress.set_message(&record.display_name());
                progress.increment(1);
                (index, record, resolution)
            })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;

    outcomes.sort_by_key(|(index, _, _)| *index);
    let report = BatchReport::from_outcomes(
        outcomes
            .into_iter()
            .map(|(_, record, resolution)| (record, resolution)),
    );

    for record in &report.unresolved {
        error!(
            "No license found for {} ({})",
            record.display_name(),
            record.source_path.display()
        );
    }

    let summary = format!(
        "{} resolved, {} unresolved, {} canceled",
        report.resolved_count(),
        report.unresolved.len(),
        report.canceled.len()
    );
    progress.finish_with_message(&summary);
    info!(
        "Resolved {} of {} files into {} license groups ({} coalesced lookups)",
        report.resolved_count(),
        total,
        report.groups.len(),
        pipeline.cache().coalesced_count()
    );
    report
}
