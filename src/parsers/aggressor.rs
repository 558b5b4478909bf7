//! Aggressor-script parser: command registrations in `.cna` files.
//!
//! Two extraction strategies, most reliable first:
//! 1. Explicit `beacon_command_register("name", "description", ...)` calls
//! 2. `alias name {` declarations, taking the nearest `#` comment in the
//!    three preceding lines as the description

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::warn;

use super::{basename, read_lossy, source_files, BofFormat};
use crate::model::BofEntry;

const FORMAT: &str = "cna";

/// `beacon_command_register("name", "description", ...)`.
static BEACON_REGISTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"beacon_command_register\s*\(\s*["']([^"']+)["']\s*,\s*["']([^"']+)["']"#)
        .expect("beacon register regex")
});

/// `alias name {` declaration.
static ALIAS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"alias\s+["']?(\w+)["']?\s*\{"#).expect("alias regex"));

/// `# comment` line; comments near an alias often carry its description.
static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#\s*(.*)").expect("comment regex"));

/// Parses Cobalt Strike Aggressor scripts for registered commands.
pub struct AggressorParser;

impl AggressorParser {
    fn script_files(&self, repo_path: &Path) -> Vec<PathBuf> {
        source_files(repo_path)
            .into_iter()
            .filter(|p| p.extension().is_some_and(|ext| ext == "cna"))
            .collect()
    }
}

impl BofFormat for AggressorParser {
    fn name(&self) -> &'static str {
        FORMAT
    }

    fn can_parse(&self, repo_path: &Path) -> bool {
        !self.script_files(repo_path).is_empty()
    }

    fn parse(&self, repo_path: &Path, repo_url: &str) -> Vec<BofEntry> {
        let mut entries = Vec::new();

        for script in self.script_files(repo_path) {
            let content = match read_lossy(&script) {
                Ok(content) => content,
                Err(err) => {
                    warn!(file = %script.display(), error = %err, "failed to read cna script");
                    continue;
                }
            };
            let source_file = basename(&script);

            // Explicit registrations first.
            for caps in BEACON_REGISTER.captures_iter(&content) {
                entries.push(BofEntry {
                    name: caps[1].trim().to_string(),
                    description: caps[2].trim().to_string(),
                    repository: repo_url.to_string(),
                    source_file: source_file.clone(),
                    source_format: FORMAT.to_string(),
                });
            }

            // Alias declarations with a nearby comment as description.
            let lines: Vec<&str> = content.lines().collect();
            for (i, line) in lines.iter().enumerate() {
                let Some(caps) = ALIAS.captures(line) else {
                    continue;
                };
                let name = caps[1].to_string();

                let mut description = String::new();
                for j in i.saturating_sub(3)..i {
                    if let Some(comment) = COMMENT.captures(lines[j].trim()) {
                        description = comment[1].trim().to_string();
                        break;
                    }
                }

                let already_registered = entries
                    .iter()
                    .any(|e| e.name == name && e.source_file == source_file);
                if !already_registered {
                    entries.push(BofEntry {
                        name,
                        description,
                        repository: repo_url.to_string(),
                        source_file: source_file.clone(),
                        source_format: FORMAT.to_string(),
                    });
                }
            }
        }

        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://github.com/acme/foo";

    fn repo_with_script(name: &str, content: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(name), content).unwrap();
        dir
    }

    #[test]
    fn detects_cna_files_anywhere_in_the_tree() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("scripts")).unwrap();
        std::fs::write(dir.path().join("scripts/load.cna"), "alias x { }").unwrap();

        assert!(AggressorParser.can_parse(dir.path()));
    }

    #[test]
    fn no_cna_files_means_no_detection() {
        let dir = repo_with_script("main.c", "int main() {}");
        assert!(!AggressorParser.can_parse(dir.path()));
    }

    #[test]
    fn beacon_command_register_is_extracted() {
        let dir = repo_with_script(
            "pack.cna",
            r#"beacon_command_register("whoami", "Show the current token", "usage: whoami");"#,
        );
        let entries = AggressorParser.parse(dir.path(), URL);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "whoami");
        assert_eq!(entries[0].description, "Show the current token");
        assert_eq!(entries[0].source_file, "pack.cna");
        assert_eq!(entries[0].source_format, "cna");
    }

    #[test]
    fn alias_takes_preceding_comment_as_description() {
        let dir = repo_with_script(
            "pack.cna",
            "\
# Lists running processes
alias ps_list {
    bof_exec($1);
}
",
        );
        let entries = AggressorParser.parse(dir.path(), URL);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "ps_list");
        assert_eq!(entries[0].description, "Lists running processes");
    }

    #[test]
    fn alias_without_nearby_comment_has_empty_description() {
        let dir = repo_with_script("pack.cna", "alias bare {\n}\n");
        let entries = AggressorParser.parse(dir.path(), URL);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "bare");
        assert_eq!(entries[0].description, "");
    }

    #[test]
    fn alias_duplicate_of_registration_is_dropped() {
        let dir = repo_with_script(
            "pack.cna",
            r#"
alias whoami {
    bof_exec($1);
}
beacon_command_register("whoami", "Show the current token");
"#,
        );
        let entries = AggressorParser.parse(dir.path(), URL);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].description, "Show the current token");
    }

    #[test]
    fn same_alias_in_two_files_is_kept_twice() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.cna"), "alias dup { }").unwrap();
        std::fs::write(dir.path().join("b.cna"), "alias dup { }").unwrap();

        let entries = AggressorParser.parse(dir.path(), URL);
        assert_eq!(entries.len(), 2);
    }
}
