//! Havoc-extension parser: command registrations in Python modules that
//! import the `havoc` bindings.
//!
//! Three pattern tiers, tried in order within each file:
//! 1. `RegisterCommand(func, "module", "name", "description", ...)`
//! 2. Legacy `.register("name", "description")`
//! 3. Dict-style `"command": "name"` paired with the nearest
//!    `"description": "..."` within a 500-byte window
//!
//! All matches are kept, deduplicated case-insensitively by name within the
//! file.

use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::warn;

use super::{basename, read_lossy, source_files, BofFormat};
use crate::model::BofEntry;

const FORMAT: &str = "havoc_py";

/// Bytes of each Python file inspected for the `havoc` import.
const IMPORT_PROBE_LEN: usize = 2000;

/// Maximum distance between a `command` key and its `description` key.
const DESCRIPTION_WINDOW: usize = 500;

static HAVOC_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(from\s+havoc\s+import|import\s+havoc)").expect("havoc import regex")
});

/// `RegisterCommand(func, "module", "name", "description", ...)`.
static REGISTER_COMMAND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)RegisterCommand\s*\(\s*\w+\s*,\s*["'][^"']*["']\s*,\s*["']([^"']+)["']\s*,\s*["']([^"']*)["']"#,
    )
    .expect("register command regex")
});

/// Legacy `.register("name", "description")`.
static REGISTER_LEGACY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\.register\s*\(\s*["']([^"']+)["']\s*,?\s*["']?([^"']*)["']?"#)
        .expect("legacy register regex")
});

/// Dict-style `"command": "name"`.
static COMMAND_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["']command["']\s*:\s*["']([^"']+)["']"#).expect("command key regex")
});

/// Dict-style `"description": "..."`.
static DESCRIPTION_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["']description["']\s*:\s*["']([^"']+)["']"#).expect("description key regex")
});

/// Parses Havoc C2 Python extension modules.
pub struct HavocParser;

impl HavocParser {
    fn extension_files(&self, repo_path: &Path) -> Vec<PathBuf> {
        source_files(repo_path)
            .into_iter()
            .filter(|p| p.extension().is_some_and(|ext| ext == "py"))
            .filter(|p| match read_lossy(p) {
                Ok(content) => {
                    let head: String = content.chars().take(IMPORT_PROBE_LEN).collect();
                    HAVOC_IMPORT.is_match(&head)
                }
                Err(_) => false,
            })
            .collect()
    }
}

impl BofFormat for HavocParser {
    fn name(&self) -> &'static str {
        FORMAT
    }

    fn can_parse(&self, repo_path: &Path) -> bool {
        !self.extension_files(repo_path).is_empty()
    }

    fn parse(&self, repo_path: &Path, repo_url: &str) -> Vec<BofEntry> {
        let mut entries = Vec::new();

        for module in self.extension_files(repo_path) {
            let content = match read_lossy(&module) {
                Ok(content) => content,
                Err(err) => {
                    warn!(file = %module.display(), error = %err, "failed to read havoc module");
                    continue;
                }
            };
            let source_file = basename(&module);
            let mut seen_names: HashSet<String> = HashSet::new();

            let mut push = |name: &str, description: String, seen: &mut HashSet<String>| {
                let name = name.trim();
                if seen.insert(name.to_lowercase()) {
                    entries.push(BofEntry {
                        name: name.to_string(),
                        description,
                        repository: repo_url.to_string(),
                        source_file: source_file.clone(),
                        source_format: FORMAT.to_string(),
                    });
                }
            };

            for caps in REGISTER_COMMAND.captures_iter(&content) {
                push(&caps[1], caps[2].trim().to_string(), &mut seen_names);
            }

            for caps in REGISTER_LEGACY.captures_iter(&content) {
                push(&caps[1], caps[2].trim().to_string(), &mut seen_names);
            }

            // Dict-style declarations: pair each command key with the nearest
            // description key inside the window.
            let descriptions: Vec<(usize, String)> = DESCRIPTION_KEY
                .captures_iter(&content)
                .filter_map(|c| Some((c.get(0)?.start(), c.get(1)?.as_str().trim().to_string())))
                .collect();

            for caps in COMMAND_KEY.captures_iter(&content) {
                let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                    continue;
                };
                let description = descriptions
                    .iter()
                    .find(|(pos, _)| pos.abs_diff(whole.start()) < DESCRIPTION_WINDOW)
                    .map(|(_, d)| d.clone())
                    .unwrap_or_default();
                push(name.as_str(), description, &mut seen_names);
            }
        }

        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://github.com/acme/foo";

    fn repo_with_module(content: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ext.py"), content).unwrap();
        dir
    }

    #[test]
    fn only_modules_importing_havoc_are_detected() {
        let dir = repo_with_module("import os\n");
        assert!(!HavocParser.can_parse(dir.path()));

        let dir = repo_with_module("from havoc import Demon\n");
        assert!(HavocParser.can_parse(dir.path()));
    }

    #[test]
    fn register_command_is_extracted() {
        let dir = repo_with_module(
            r#"
from havoc import RegisterCommand

RegisterCommand(run, "situational", "adcs_enum", "Enumerates certificate services", "", "")
"#,
        );
        let entries = HavocParser.parse(dir.path(), URL);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "adcs_enum");
        assert_eq!(entries[0].description, "Enumerates certificate services");
        assert_eq!(entries[0].source_format, "havoc_py");
    }

    #[test]
    fn legacy_register_call_is_extracted() {
        let dir = repo_with_module(
            r#"
import havoc

pack.register("smbinfo", "Queries remote SMB info")
"#,
        );
        let entries = HavocParser.parse(dir.path(), URL);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "smbinfo");
        assert_eq!(entries[0].description, "Queries remote SMB info");
    }

    #[test]
    fn dict_style_pairs_command_with_nearby_description() {
        let dir = repo_with_module(
            r#"
import havoc

COMMANDS = {
    "command": "kerberoast",
    "description": "Requests service tickets for roasting",
}
"#,
        );
        let entries = HavocParser.parse(dir.path(), URL);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "kerberoast");
        assert_eq!(
            entries[0].description,
            "Requests service tickets for roasting"
        );
    }

    #[test]
    fn dict_style_description_outside_window_is_dropped() {
        let filler = "# padding\n".repeat(80);
        let content = format!(
            "import havoc\n{{ \"command\": \"lonely\" }}\n{filler}{{ \"description\": \"Too far away\" }}\n"
        );
        let dir = repo_with_module(&content);
        let entries = HavocParser.parse(dir.path(), URL);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "lonely");
        assert_eq!(entries[0].description, "");
    }

    #[test]
    fn names_deduplicate_case_insensitively_within_a_file() {
        let dir = repo_with_module(
            r#"
from havoc import RegisterCommand

RegisterCommand(run, "mod", "WhoAmI", "First registration")
pack.register("whoami", "Legacy duplicate")
"#,
        );
        let entries = HavocParser.parse(dir.path(), URL);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "WhoAmI");
        assert_eq!(entries[0].description, "First registration");
    }

    #[test]
    fn import_probe_only_checks_the_file_head() {
        let filler = "# padding line\n".repeat(200);
        let content = format!("{filler}\nimport havoc\n");
        let dir = repo_with_module(&content);

        // Import sits beyond the probe window, so the file is not detected.
        assert!(!HavocParser.can_parse(dir.path()));
    }
}
