//! Core data model for the indexer.
//!
//! Value records flowing through the pipeline:
//! - [`RepoDescriptor`]: a repository identified during the catalog scan
//! - [`RepoHandle`]: a descriptor annotated with its acquisition outcome
//! - [`BofEntry`]: one extracted (name, description) unit

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Hosting service a repository lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepoHost {
    GitHub,
    GitLab,
}

impl RepoHost {
    /// Domain name of the hosting service.
    pub fn domain(&self) -> &'static str {
        match self {
            RepoHost::GitHub => "github.com",
            RepoHost::GitLab => "gitlab.com",
        }
    }
}

/// One source repository identified in the catalog.
///
/// The (host, owner, name) triple is unique within a run; uniqueness is
/// checked against the lowercased canonical URL while `owner`/`name` keep
/// their original casing (clone paths are case-sensitive).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoDescriptor {
    /// Canonical URL, original casing (e.g., `https://github.com/acme/foo`)
    pub url: String,

    /// Hosting service
    pub host: RepoHost,

    /// Repository owner, original casing
    pub owner: String,

    /// Repository name, original casing
    pub name: String,
}

impl RepoDescriptor {
    pub fn new(host: RepoHost, owner: impl Into<String>, name: impl Into<String>) -> Self {
        let owner = owner.into();
        let name = name.into();
        let url = format!("https://{}/{}/{}", host.domain(), owner, name);
        Self {
            url,
            host,
            owner,
            name,
        }
    }

    /// Lowercased canonical URL, the uniqueness key for the catalog scan.
    pub fn normalized_url(&self) -> String {
        self.url.to_lowercase()
    }

    /// Subdirectory name inside the local repository store.
    pub fn local_dir_name(&self) -> String {
        format!("{}__{}", self.owner, self.name)
    }
}

/// A repository with its acquisition outcome recorded.
///
/// Produced only by the acquirer; everything downstream treats the local
/// copy as read-only.
#[derive(Debug, Clone)]
pub struct RepoHandle {
    /// The descriptor this handle was acquired for
    pub descriptor: RepoDescriptor,

    /// Expected local path (`<store>/<owner>__<name>`), present iff `fetched`
    pub local_path: PathBuf,

    /// Whether the local copy is available for parsing
    pub fetched: bool,
}

/// One extracted BOF command.
///
/// Immutable once created by a parser; the deduplicator may drop entries but
/// never rewrites them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BofEntry {
    /// Short identifier of the command
    pub name: String,

    /// Free-text description, may be empty
    pub description: String,

    /// Canonical URL of the originating repository
    pub repository: String,

    /// Basename of the file the entry was extracted from
    pub source_file: String,

    /// Tag of the parser that produced this entry (e.g., "readme_table")
    pub source_format: String,
}
