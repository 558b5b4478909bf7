//! Catalog scanning: extracts repository descriptors from a markdown catalog.
//!
//! Only markdown table rows are consulted (lines starting and ending with a
//! pipe, at least four pipe-delimited parts). Within a qualifying row, only
//! the first data cell and only its first embedded link are considered; a
//! repository referenced in a later "see also" column is deliberately not
//! indexed. Links on unrecognized hosts are expected noise and skipped
//! without logging.

use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

use crate::model::{RepoDescriptor, RepoHost};

/// Matches the first markdown link `[text](target)` in a cell.
static MARKDOWN_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[.*?\]\(([^)]+)\)").expect("markdown link regex"));

/// Matches a GitHub repository URL, capturing owner and name.
static GITHUB_REPO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://github\.com/([\w._-]+)/([\w._-]+)").expect("github repo regex")
});

/// Matches a GitLab repository URL, capturing owner and name.
static GITLAB_REPO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://gitlab\.com/([\w._-]+)/([\w._-]+)").expect("gitlab repo regex")
});

/// Errors raised by the catalog scan.
///
/// An unreadable catalog is the one fatal error of a run: without it there is
/// no work to do.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Extracts all repository descriptors from the catalog markdown file.
///
/// Descriptors are returned in first-seen order, deduplicated by lowercased
/// canonical URL. Re-running on the same catalog yields an identical
/// sequence.
///
/// # Errors
///
/// Returns [`CatalogError::Io`] if the catalog file cannot be read.
pub fn extract_repos(catalog_path: &Path) -> Result<Vec<RepoDescriptor>, CatalogError> {
    let raw = std::fs::read(catalog_path).map_err(|source| CatalogError::Io {
        path: catalog_path.to_path_buf(),
        source,
    })?;
    let content = String::from_utf8_lossy(&raw);

    Ok(scan_catalog(&content))
}

/// Scans catalog text for repository links in table rows.
pub fn scan_catalog(content: &str) -> Vec<RepoDescriptor> {
    let mut repos = Vec::new();
    let mut seen_urls = HashSet::new();

    for line in content.lines() {
        let stripped = line.trim();

        if !stripped.starts_with('|') || !stripped.ends_with('|') {
            continue;
        }

        let parts: Vec<&str> = stripped.split('|').collect();
        if parts.len() < 4 {
            continue;
        }

        let first_cell = parts[1].trim();
        let Some(link) = MARKDOWN_LINK.captures(first_cell) else {
            continue;
        };
        let url = link[1].trim();

        let Some(repo) = classify_link(url) else {
            continue;
        };

        if seen_urls.insert(repo.normalized_url()) {
            repos.push(repo);
        }
    }

    repos
}

/// Classifies a link target by host-specific URL shape.
///
/// Trailing `.` and `/` are trimmed from the repository name. Returns `None`
/// for unrecognized hosts.
fn classify_link(url: &str) -> Option<RepoDescriptor> {
    for (pattern, host) in [
        (&*GITHUB_REPO, RepoHost::GitHub),
        (&*GITLAB_REPO, RepoHost::GitLab),
    ] {
        if let Some(caps) = pattern.captures(url) {
            let owner = &caps[1];
            let name = caps[2].trim_end_matches(['.', '/']);
            return Some(RepoDescriptor::new(host, owner, name));
        }
    }
    None
}
