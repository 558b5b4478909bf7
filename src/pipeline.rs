//! Extraction pipeline: applies the parser battery per repository and merges
//! the results.
//!
//! Per repository the pipeline:
//! 1. Runs every primary-set variant whose `can_parse` holds and unions
//!    their entries (a repository may legitimately document the same
//!    commands in more than one convention)
//! 2. Only when the primary set yielded zero entries, walks the fallback
//!    tier in strict order and keeps the first non-empty result
//!
//! Parsing is sequential and single-threaded: it is CPU-light next to the
//! network-bound acquisition phase, so overlapping the two stages would buy
//! little. A failed repository is simply absent from extraction — entries
//! are never attributed to a repository that failed acquisition.

use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

use crate::model::{BofEntry, RepoHandle};
use crate::parsers::{self, BofFormat};

// ============================================================================
// Detection census
// ============================================================================

/// Which documentation conventions were detected across the fetched
/// repositories. Drives the summary statistics and `--analyze-only` mode.
#[derive(Debug, Default)]
pub struct FormatCensus {
    /// All descriptors fed to the run
    pub total_repos: usize,

    /// Descriptors with a usable local copy
    pub fetched_repos: usize,

    /// Per-format count of repositories whose `can_parse` held
    pub parseable_by_format: BTreeMap<String, usize>,

    /// Per-format repository names, for diagnostics
    pub repos_by_format: BTreeMap<String, Vec<String>>,
}

/// Runs detection for every parser variant over every fetched repository.
pub fn analyze(handles: &[RepoHandle]) -> FormatCensus {
    let formats = parsers::all_formats();
    let mut census = FormatCensus {
        total_repos: handles.len(),
        fetched_repos: handles.iter().filter(|h| h.fetched).count(),
        ..FormatCensus::default()
    };

    for handle in handles.iter().filter(|h| h.fetched) {
        for format in &formats {
            if format.can_parse(&handle.local_path) {
                *census
                    .parseable_by_format
                    .entry(format.name().to_string())
                    .or_insert(0) += 1;
                census
                    .repos_by_format
                    .entry(format.name().to_string())
                    .or_default()
                    .push(handle.descriptor.name.clone());
            }
        }
    }

    census
}

// ============================================================================
// Extraction
// ============================================================================

/// Result of extracting every fetched repository.
#[derive(Debug, Default)]
pub struct ExtractionReport {
    /// Concatenated entries across all repositories, not yet deduplicated
    pub entries: Vec<BofEntry>,

    /// Repositories that yielded at least one entry
    pub repos_with_entries: usize,
}

/// Extracts entries from every fetched repository: primary set unioned,
/// fallback tier short-circuited.
pub fn extract_all(handles: &[RepoHandle]) -> ExtractionReport {
    let primary = parsers::primary_set();
    let fallback = parsers::fallback_tier();
    let mut report = ExtractionReport::default();

    for handle in handles.iter().filter(|h| h.fetched) {
        let entries = extract_repo(handle, &primary, &fallback);
        if !entries.is_empty() {
            report.repos_with_entries += 1;
        }
        report.entries.extend(entries);
    }

    info!(
        entries = report.entries.len(),
        repos_with_entries = report.repos_with_entries,
        "extraction complete"
    );
    report
}

fn extract_repo(
    handle: &RepoHandle,
    primary: &[Box<dyn BofFormat>],
    fallback: &[Box<dyn BofFormat>],
) -> Vec<BofEntry> {
    let mut entries = Vec::new();
    let mut formats_used = Vec::new();

    for format in primary {
        if format.can_parse(&handle.local_path) {
            let found = format.parse(&handle.local_path, &handle.descriptor.url);
            if !found.is_empty() {
                formats_used.push(format.name());
                entries.extend(found);
            }
        }
    }

    // Fallback trigger: the primary set as a whole produced nothing.
    if entries.is_empty() {
        for format in fallback {
            if !format.can_parse(&handle.local_path) {
                continue;
            }
            let found = format.parse(&handle.local_path, &handle.descriptor.url);
            if !found.is_empty() {
                formats_used.push(format.name());
                entries.extend(found);
                break;
            }
        }
    }

    debug!(
        repo = %handle.descriptor.url,
        entries = entries.len(),
        formats = ?formats_used,
        "repository extracted"
    );
    entries
}

// ============================================================================
// Deduplication
// ============================================================================

/// Collapses the entry list to at most one entry per (lowercased name,
/// lowercased repository URL) pair, preserving first-seen order. The first
/// occurrence wins; descriptions are not merged.
pub fn deduplicate(entries: Vec<BofEntry>) -> Vec<BofEntry> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|entry| seen.insert((entry.name.to_lowercase(), entry.repository.to_lowercase())))
        .collect()
}
