//! Format parsers — one per documentation convention.
//!
//! Documentation conventions across independent BOF repositories are
//! inconsistent and untyped, so instead of one universal parser the indexer
//! runs a fixed battery of narrow detectors sharing the [`BofFormat`] trait:
//! - **Primary set** (all applied, results unioned): [`ReadmeTableParser`],
//!   [`AggressorParser`], [`HavocParser`], [`Stage1Parser`]
//! - **Fallback tier** (tried in order only when the primary set found
//!   nothing, first non-empty result wins): [`ReadmeBulletParser`],
//!   [`DirWalkParser`]

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub mod aggressor;
pub mod dir_walk;
pub mod havoc;
pub mod readme_bullet;
pub mod readme_table;
pub mod stage1;

pub use aggressor::AggressorParser;
pub use dir_walk::DirWalkParser;
pub use havoc::HavocParser;
pub use readme_bullet::ReadmeBulletParser;
pub use readme_table::ReadmeTableParser;
pub use stage1::Stage1Parser;

use crate::model::BofEntry;

/// One documentation convention the indexer understands.
///
/// Implementations must be `Send + Sync` and stateless with respect to each
/// other; the pipeline composes them without knowing their internals.
///
/// A malformed or unreadable file inside a repository is logged and yields
/// zero entries from that file — it never aborts the repository or the run,
/// which is why [`parse`](BofFormat::parse) returns a plain `Vec` rather
/// than a `Result`.
pub trait BofFormat: Send + Sync {
    /// Unique tag for this convention, recorded on every entry it produces.
    fn name(&self) -> &'static str;

    /// Side-effect-free detection: can this parser extract anything from the
    /// repository at `repo_path`?
    fn can_parse(&self, repo_path: &Path) -> bool;

    /// Extracts all entries this convention yields for the repository.
    fn parse(&self, repo_path: &Path, repo_url: &str) -> Vec<BofEntry>;
}

/// The primary parser set, in priority order. All variants whose
/// `can_parse` holds are applied and their results unioned.
pub fn primary_set() -> Vec<Box<dyn BofFormat>> {
    vec![
        Box::new(ReadmeTableParser),
        Box::new(AggressorParser),
        Box::new(HavocParser),
        Box::new(Stage1Parser),
    ]
}

/// The fallback tier, in strict priority order. Consulted only when the
/// primary set produced zero entries for a repository.
pub fn fallback_tier() -> Vec<Box<dyn BofFormat>> {
    vec![Box::new(ReadmeBulletParser), Box::new(DirWalkParser)]
}

/// Every parser variant, primary set first. Used by the detection census.
pub fn all_formats() -> Vec<Box<dyn BofFormat>> {
    let mut formats = primary_set();
    formats.extend(fallback_tier());
    formats
}

// ============================================================================
// Shared file helpers
// ============================================================================

/// Reads a file as text, replacing invalid UTF-8 instead of failing.
/// Third-party readmes are frequently not clean UTF-8.
pub(crate) fn read_lossy(path: &Path) -> std::io::Result<String> {
    let raw = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&raw).into_owned())
}

/// Finds the top-level readme, if any. Only the first matching spelling is
/// used so a repository with both `README.md` and `readme.md` is not parsed
/// twice.
pub(crate) fn find_readme(repo_path: &Path) -> Option<PathBuf> {
    for candidate in ["README.md", "readme.md", "Readme.md", "README.MD"] {
        let path = repo_path.join(candidate);
        if path.exists() {
            return Some(path);
        }
    }
    None
}

/// All regular files under `root`, excluding version-control metadata.
/// Sorted by file name so extraction order is deterministic.
pub(crate) fn source_files(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git")
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect()
}

/// Basename of a path as a `String`, empty when the path has none.
pub(crate) fn basename(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_orders_primary_before_fallback() {
        let names: Vec<&str> = all_formats().iter().map(|f| f.name()).collect();
        assert_eq!(
            names,
            vec![
                "readme_table",
                "cna",
                "havoc_py",
                "stage1_py",
                "readme_bullet",
                "directory_structure",
            ]
        );
    }

    #[test]
    fn source_files_skips_git_metadata() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join(".git/config"), "x").unwrap();
        std::fs::write(dir.path().join("a.c"), "int main;").unwrap();

        let files = source_files(dir.path());
        assert_eq!(files.len(), 1);
        assert_eq!(basename(&files[0]), "a.c");
    }

    #[test]
    fn find_readme_prefers_first_spelling() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("README.md"), "a").unwrap();
        std::fs::write(dir.path().join("Readme.md"), "b").unwrap();

        let readme = find_readme(dir.path()).unwrap();
        assert_eq!(basename(&readme), "README.md");
    }
}
