//! Stage1 parser: single-file metadata in Outflank Stage1 `.s1.py` modules.
//!
//! Each module declares one command. The name and description come from
//! `name = "..."` / `description = "..."` style assignments; when no name is
//! declared the filename itself (minus the `.s1.py` and `_bof` suffixes)
//! serves as the name.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::warn;

use super::{basename, read_lossy, source_files, BofFormat};
use crate::model::BofEntry;

const FORMAT: &str = "stage1_py";

const FILE_SUFFIX: &str = ".s1.py";

/// `name = "..."` or `"name": "..."`.
static NAME_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["']?name["']?\s*[=:]\s*["']([^"']+)["']"#).expect("name decl regex")
});

/// `description = "..."` or `"description": "..."`.
static DESC_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["']?description["']?\s*[=:]\s*["']([^"']+)["']"#).expect("desc decl regex")
});

/// Parses Stage1 extension modules, one entry per file.
pub struct Stage1Parser;

impl Stage1Parser {
    fn stage1_files(&self, repo_path: &Path) -> Vec<PathBuf> {
        source_files(repo_path)
            .into_iter()
            .filter(|p| basename(p).ends_with(FILE_SUFFIX))
            .collect()
    }
}

impl BofFormat for Stage1Parser {
    fn name(&self) -> &'static str {
        FORMAT
    }

    fn can_parse(&self, repo_path: &Path) -> bool {
        !self.stage1_files(repo_path).is_empty()
    }

    fn parse(&self, repo_path: &Path, repo_url: &str) -> Vec<BofEntry> {
        let mut entries = Vec::new();

        for module in self.stage1_files(repo_path) {
            let content = match read_lossy(&module) {
                Ok(content) => content,
                Err(err) => {
                    warn!(file = %module.display(), error = %err, "failed to read stage1 module");
                    continue;
                }
            };
            let source_file = basename(&module);

            let name = match NAME_DECL.captures(&content) {
                Some(caps) => caps[1].trim().to_string(),
                // No declared name: derive one from the filename.
                None => source_file.replace(FILE_SUFFIX, "").replace("_bof", ""),
            };
            let description = DESC_DECL
                .captures(&content)
                .map(|caps| caps[1].trim().to_string())
                .unwrap_or_default();

            entries.push(BofEntry {
                name,
                description,
                repository: repo_url.to_string(),
                source_file,
                source_format: FORMAT.to_string(),
            });
        }

        entries
    }
}
