//! Bullet-list parser (fallback): readme items of the shape
//! `- Name: Capitalized description sentence.`
//!
//! Only identifier-like names followed by a sentence-cased description
//! qualify, which keeps ordinary prose bullets ("* Note: see below") and
//! build instructions out of the index. Single-character names are rejected.

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::warn;

use super::{basename, find_readme, read_lossy, BofFormat};
use crate::model::BofEntry;

const FORMAT: &str = "readme_bullet";

/// `- Name: Description` or `- [Name](url): Description`; the name must be
/// identifier-like and the description must start with a capital letter.
static BULLET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*[-*]\s+(?:\[([A-Za-z][A-Za-z0-9_-]*)\]\([^)]+\)|([A-Za-z][A-Za-z0-9_-]*[A-Za-z0-9]))\s*:\s+([A-Z].+)$",
    )
    .expect("bullet regex")
});

/// Parses BOF bullet lists out of the repository's top-level readme.
pub struct ReadmeBulletParser;

impl BofFormat for ReadmeBulletParser {
    fn name(&self) -> &'static str {
        FORMAT
    }

    fn can_parse(&self, repo_path: &Path) -> bool {
        let Some(readme) = find_readme(repo_path) else {
            return false;
        };
        match read_lossy(&readme) {
            Ok(content) => content.lines().any(|line| BULLET.is_match(line.trim_end())),
            Err(_) => false,
        }
    }

    fn parse(&self, repo_path: &Path, repo_url: &str) -> Vec<BofEntry> {
        let Some(readme) = find_readme(repo_path) else {
            return Vec::new();
        };
        let content = match read_lossy(&readme) {
            Ok(content) => content,
            Err(err) => {
                warn!(file = %readme.display(), error = %err, "failed to read readme");
                return Vec::new();
            }
        };
        let source_file = basename(&readme);

        let mut entries = Vec::new();
        for line in content.lines() {
            let Some(caps) = BULLET.captures(line.trim_end()) else {
                continue;
            };
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();

            // Single letters are compiler/language mentions, not commands.
            if name.chars().count() <= 1 {
                continue;
            }

            entries.push(BofEntry {
                name: name.to_string(),
                description: caps[3].trim().to_string(),
                repository: repo_url.to_string(),
                source_file: source_file.clone(),
                source_format: FORMAT.to_string(),
            });
        }

        entries
    }
}
