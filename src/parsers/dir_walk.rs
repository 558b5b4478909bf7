//! Directory-structure parser (fallback catch-all): infers BOF names from
//! source and object file naming conventions when no documentation matched.
//!
//! Always detects, so every successfully acquired repository yields some
//! signal even if uninformative. Descriptions, when available, come from the
//! first non-heading line of a readme sitting next to the matched file.

use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use super::{basename, read_lossy, source_files, BofFormat};
use crate::model::BofEntry;

const FORMAT: &str = "directory_structure";

/// Longest sibling-readme excerpt used as a description.
const DESCRIPTION_LIMIT: usize = 200;

/// File naming conventions that indicate a BOF, first match wins.
static FILE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"^(\w+)\.c$",
        r"^(\w+)_bof\.c$",
        r"^(\w+)\.x64\.o$",
        r"^(\w+)\.o$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("bof file regex"))
    .collect()
});

/// Infers BOF entries from file naming conventions across the whole tree.
pub struct DirWalkParser;

impl BofFormat for DirWalkParser {
    fn name(&self) -> &'static str {
        FORMAT
    }

    /// Always available; this is the last resort of the fallback tier.
    fn can_parse(&self, _repo_path: &Path) -> bool {
        true
    }

    fn parse(&self, repo_path: &Path, repo_url: &str) -> Vec<BofEntry> {
        let mut entries = Vec::new();
        let mut seen_names: HashSet<String> = HashSet::new();

        for file in source_files(repo_path) {
            let file_name = basename(&file);
            let Some(name) = FILE_PATTERNS
                .iter()
                .find_map(|p| p.captures(&file_name))
                .map(|caps| caps[1].to_string())
            else {
                continue;
            };

            // Two-letter names (ls.c, ps.o) are too generic to index.
            if name.chars().count() <= 2 {
                continue;
            }
            if !seen_names.insert(name.to_lowercase()) {
                continue;
            }

            let description = file
                .parent()
                .map(sibling_readme_excerpt)
                .unwrap_or_default();

            entries.push(BofEntry {
                name,
                description,
                repository: repo_url.to_string(),
                source_file: file_name,
                source_format: FORMAT.to_string(),
            });
        }

        entries
    }
}

/// First non-empty, non-heading line of a readme in `dir`, if any.
fn sibling_readme_excerpt(dir: &Path) -> String {
    for readme_name in ["README.md", "readme.md", "README.txt"] {
        let readme = dir.join(readme_name);
        if !readme.exists() {
            continue;
        }
        let Ok(content) = read_lossy(&readme) else {
            continue;
        };
        for line in content.lines() {
            let line = line.trim();
            if !line.is_empty() && !line.starts_with('#') {
                return line.chars().take(DESCRIPTION_LIMIT).collect();
            }
        }
    }
    String::new()
}
