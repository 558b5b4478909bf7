//! Table-convention parser: BOF listings in top-level readme tables.
//!
//! Recognizes the common header shapes used across BOF packs
//! (`|Command|Usage|Notes|`, `|Name|Description|`, `|**BOF**|**Use**|`, ...),
//! maps columns to roles by header synonym, and strips markdown decoration
//! from cell text.

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::warn;

use super::{basename, find_readme, read_lossy, BofFormat};
use crate::model::BofEntry;

const FORMAT: &str = "readme_table";

/// Header shapes that mark the start of a BOF table.
static HEADER_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // |Command|Usage|Notes|
        r"(?im)^\s*\|\s*commands?\s*\|\s*usage\s*\|",
        // |Command|Description| or |Commands|Description|
        r"(?im)^\s*\|\s*commands?\s*\|.*\|",
        // |Name|Description| (tolerates the "Decription" typo seen in the wild)
        r"(?im)^\s*\|\s*name\s*\|.*decr?iption.*\|",
        // |BOF|Description| or |**BOF**|**Use**|
        r"(?im)^\s*\|\s*\*?\*?bof\*?\*?\s*\|.*\|",
        // |Tool|Description|
        r"(?im)^\s*\|\s*tool\s*\|.*\|",
        // |Function|Description|
        r"(?im)^\s*\|\s*function\s*\|.*\|",
        // |Module|Description|
        r"(?im)^\s*\|\s*module\s*\|.*\|",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("table header regex"))
    .collect()
});

/// Table separator row (`|----|----|`).
static SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\|[\s\-:|]+\|").expect("separator regex"));

/// `[text](url)` link, replaced by its text.
static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\([^)]+\)").expect("link regex"));

/// Bold/italic emphasis markers.
static EMPHASIS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*+([^*]+)\*+").expect("emphasis regex"));

/// Inline code span.
static CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`([^`]+)`").expect("code regex"));

/// Leftover directory-style wrappers (`**[` ... `]**`).
static LEADING_WRAP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\*\*\[?").expect("leading wrap regex"));
static TRAILING_WRAP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\]?\*\*$").expect("trailing wrap regex"));

/// Header synonyms naming the command column.
const NAME_SYNONYMS: [&str; 7] = [
    "command", "commands", "name", "bof", "tool", "function", "module",
];

/// Parses BOF tables out of the repository's top-level readme.
pub struct ReadmeTableParser;

impl BofFormat for ReadmeTableParser {
    fn name(&self) -> &'static str {
        FORMAT
    }

    fn can_parse(&self, repo_path: &Path) -> bool {
        let Some(readme) = find_readme(repo_path) else {
            return false;
        };
        match read_lossy(&readme) {
            Ok(content) => HEADER_PATTERNS.iter().any(|p| p.is_match(&content)),
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

        parse_tables(&content, &basename(&readme), repo_url)
    }
}

/// Extracts entries from every recognized table in `content`.
fn parse_tables(content: &str, source_file: &str, repo_url: &str) -> Vec<BofEntry> {
    let lines: Vec<&str> = content.lines().collect();
    let mut entries = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i].trim();

        let Some((name_col, desc_col)) = header_columns(line) else {
            i += 1;
            continue;
        };

        i += 1;
        if i < lines.len() && SEPARATOR.is_match(lines[i]) {
            i += 1;
        }

        // Data rows run until the first non-table line.
        while i < lines.len() {
            let row = lines[i].trim();
            if !row.starts_with('|') || !row.ends_with('|') {
                break;
            }
            if SEPARATOR.is_match(row) {
                i += 1;
                continue;
            }

            let cols: Vec<&str> = row.split('|').collect();
            if cols.len() > name_col.max(desc_col) {
                let name = clean_cell(cols[name_col]);
                let description = clean_cell(cols[desc_col]);

                if !name.is_empty() && !is_header_like(&name) {
                    entries.push(BofEntry {
                        name,
                        description,
                        repository: repo_url.to_string(),
                        source_file: source_file.to_string(),
                        source_format: FORMAT.to_string(),
                    });
                }
            }
            i += 1;
        }
    }

    entries
}

/// If `line` is a recognized table header, maps its columns to
/// (name, description) indices by synonym match.
fn header_columns(line: &str) -> Option<(usize, usize)> {
    if !HEADER_PATTERNS.iter().any(|p| p.is_match(line)) {
        return None;
    }

    let mut name_col = 0;
    let mut desc_col = 1;

    for (idx, raw) in line.split('|').enumerate() {
        let col = raw.replace('*', "").trim().to_lowercase();
        if NAME_SYNONYMS.contains(&col.as_str()) {
            name_col = idx;
        } else if col.contains("description")
            || col.contains("notes")
            || col.contains("decription")
            || col == "use"
        {
            desc_col = idx;
        }
    }

    Some((name_col, desc_col))
}

/// Strips markdown decoration from a table cell.
fn clean_cell(cell: &str) -> String {
    let cell = cell.trim();
    let cell = LINK.replace_all(cell, "$1");
    let cell = EMPHASIS.replace_all(&cell, "$1");
    let cell = CODE.replace_all(&cell, "$1");
    let cell = LEADING_WRAP.replace(&cell, "");
    let cell = TRAILING_WRAP.replace(&cell, "");
    cell.trim().to_string()
}

/// Rejects cells that repeat a header word instead of naming a command.
fn is_header_like(name: &str) -> bool {
    let lowered = name.to_lowercase();
    matches!(
        lowered.as_str(),
        "command" | "commands" | "name" | "bof" | "tool" | "project" | "---" | "==="
    ) || name.starts_with('-')
}
