//! Index artifact: the JSON document the run always produces.
//!
//! The artifact carries summary metadata (entry and repository counts plus
//! per-format detection counts) followed by the deduplicated entry list.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::model::BofEntry;
use crate::pipeline::{ExtractionReport, FormatCensus};

/// Errors that can occur while writing the index artifact.
#[derive(Error, Debug)]
pub enum IndexError {
    /// Serialization failed
    #[error("failed to serialize index: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Could not write the artifact
    #[error("failed to write index to {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Summary metadata at the head of the artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMetadata {
    /// Deduplicated entry count
    pub total_bofs: usize,

    /// Repositories fed to the run, fetched or not
    pub total_repos: usize,

    /// Repositories that yielded at least one entry
    pub repos_with_bofs: usize,

    /// Per-format detection counts; a `BTreeMap` keeps serialization order
    /// deterministic
    pub format_stats: BTreeMap<String, usize>,
}

/// The complete index artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BofIndex {
    pub metadata: IndexMetadata,
    pub bofs: Vec<BofEntry>,
}

impl BofIndex {
    /// Assembles the artifact from the pipeline's outputs.
    pub fn assemble(
        census: &FormatCensus,
        report: &ExtractionReport,
        entries: Vec<BofEntry>,
    ) -> Self {
        Self {
            metadata: IndexMetadata {
                total_bofs: entries.len(),
                total_repos: census.total_repos,
                repos_with_bofs: report.repos_with_entries,
                format_stats: census.parseable_by_format.clone(),
            },
            bofs: entries,
        }
    }
}

/// Writes the artifact as pretty-printed JSON.
///
/// # Errors
///
/// Returns [`IndexError`] if serialization fails or the file cannot be
/// written.
pub fn write_index(index: &BofIndex, path: &Path) -> Result<(), IndexError> {
    let json = serde_json::to_string_pretty(index)?;
    std::fs::write(path, json).map_err(|source| IndexError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    info!(
        path = %path.display(),
        total_bofs = index.metadata.total_bofs,
        "index written"
    );
    Ok(())
}
