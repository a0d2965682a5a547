//! Manifest parsing: `replace` directives and dependency-graph merging.
//!
//! A go.mod manifest may redirect resolution of one module to a different
//! name/version via `replace` lines. The mirroring pipeline folds those
//! redirections into the raw dependency graph before deciding what to
//! process, so replacement targets are mirrored even when the raw graph only
//! mentions the replaced originals.
//!
//! Merging is set-union with first-writer-wins semantics: a replacement is
//! added only when its key is absent, and existing graph entries are never
//! removed or overwritten.

use std::collections::HashMap;

use crate::models::ModuleId;

/// One parsed `replace` directive: `replace <from> => <to-name> <to-version>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceDirective {
    /// The module path (optionally with version) being replaced.
    pub from: String,
    /// The replacement module.
    pub to: ModuleId,
}

/// Parse `replace` directives out of manifest text.
///
/// Scans line by line, inside and outside `replace (...)` blocks. A directive
/// is kept only when its replacement clause has exactly two
/// whitespace-separated tokens (name and version); path-based replacements
/// and malformed lines are skipped with a debug note, never an error.
pub fn parse_replace_directives(manifest: &str) -> Vec<ReplaceDirective> {
    let mut directives = Vec::new();
    let mut in_block = false;

    for line in manifest.lines() {
        let line = strip_comment(line).trim();
        if line.is_empty() {
            continue;
        }

        let candidate = if in_block {
            if line == ")" {
                in_block = false;
                continue;
            }
            Some(line)
        } else if let Some(rest) = line.strip_prefix("replace") {
            let rest = rest.trim();
            if rest == "(" {
                in_block = true;
                continue;
            }
            // Require "replace " (not e.g. an identifier prefix).
            if line.len() > "replace".len() && !line.as_bytes()["replace".len()].is_ascii_whitespace() {
                None
            } else {
                Some(rest)
            }
        } else {
            None
        };

        let Some(candidate) = candidate else { continue };
        match parse_directive(candidate) {
            Some(directive) => directives.push(directive),
            None => {
                tracing::debug!("skipping non-module replace directive: {candidate}");
            }
        }
    }

    directives
}

/// Parse a single `from => to` clause, without the `replace` keyword.
fn parse_directive(clause: &str) -> Option<ReplaceDirective> {
    let (from, to) = clause.split_once("=>")?;
    let from = from.trim();
    if from.is_empty() {
        return None;
    }

    // The replacement side must be exactly "name version"; anything else
    // (most commonly a local filesystem path) is not a mirrorable module.
    let to_tokens: Vec<&str> = to.split_whitespace().collect();
    if to_tokens.len() != 2 {
        return None;
    }

    Some(ReplaceDirective {
        from: from.to_string(),
        to: ModuleId::new(to_tokens[0], to_tokens[1]),
    })
}

fn strip_comment(line: &str) -> &str {
    match line.find("//") {
        Some(idx) => &line[..idx],
        None => line,
    }
}

/// Merge replace directives into a raw dependency graph.
///
/// For each directive, inserts `to.name@to.version => true` only when that
/// key is not already present. Merged-in replacements are treated as
/// available by default until probed.
pub fn merge_graph(graph: &mut HashMap<String, bool>, directives: &[ReplaceDirective]) {
    for directive in directives {
        let key = directive.to.key();
        if !graph.contains_key(&key) {
            tracing::debug!("merging replacement {} into dependency graph", key);
            graph.insert(key, true);
        }
    }
}
