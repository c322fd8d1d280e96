//! Pattern-based exclusion of source entries.
//!
//! # Pattern syntax
//!
//! - `*` matches any run of characters, including the empty run
//! - `?` matches exactly one character
//! - every other character matches itself
//!
//! Matching is case-insensitive. A pattern containing `/` is matched
//! against the full forward-slash relative path; a pattern without `/` is
//! matched against each individual path segment, and a hit in any segment
//! excludes the entry. Excluded directories are pruned from the walk.

use anyhow::{Context, Result};
use std::path::Path;

use crate::path_utils::path_to_generic_utf8;

/// Built-in exclusions, always evaluated before user patterns.
pub const DEFAULT_PATTERNS: &[&str] = &[
    ".git",
    ".svn",
    ".hg",
    "Thumbs.db",
    "desktop.ini",
    ".DS_Store",
    "*.tmp",
    "*.temp",
    "*.swp",
    "*~",
];

/// A compiled exclude pattern with metadata about its original form.
#[derive(Debug, Clone)]
pub struct ExcludePattern {
    /// original pattern string, for log output
    pub original: String,
    matcher: globset::GlobMatcher,
    /// pattern contains `/` and therefore matches the whole relative path
    full_path: bool,
}

impl ExcludePattern {
    pub fn parse(pattern: &str) -> Result<Self> {
        let glob = globset::GlobBuilder::new(&escape_glob_literals(pattern))
            // `*` and `?` cross `/`; the segment-vs-path split below is the
            // only separator awareness this matcher has
            .literal_separator(false)
            .case_insensitive(true)
            .backslash_escape(false)
            .build()
            .with_context(|| format!("invalid exclude pattern: {}", pattern))?;
        Ok(Self {
            original: pattern.to_string(),
            matcher: glob.compile_matcher(),
            full_path: pattern.contains('/'),
        })
    }

    fn matches(&self, relative: &str) -> bool {
        if self.full_path {
            return self.matcher.is_match(relative);
        }
        relative
            .split('/')
            .filter(|segment| !segment.is_empty())
            .any(|segment| self.matcher.is_match(segment))
    }
}

// only `*` and `?` are wildcards in our syntax; neutralize the glob
// metacharacters that globset would otherwise interpret
fn escape_glob_literals(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        match c {
            '[' => out.push_str("[[]"),
            ']' => out.push_str("[]]"),
            '{' => out.push_str("[{]"),
            '}' => out.push_str("[}]"),
            _ => out.push(c),
        }
    }
    out
}

/// Ordered exclude rule set: defaults first, then user patterns.
#[derive(Debug, Clone, Default)]
pub struct ExcludeRules {
    patterns: Vec<ExcludePattern>,
}

impl ExcludeRules {
    /// Rule set containing only [`DEFAULT_PATTERNS`].
    pub fn with_defaults() -> Self {
        let mut rules = Self::default();
        for pattern in DEFAULT_PATTERNS {
            rules.add(pattern).expect("default patterns must compile");
        }
        rules
    }

    /// Append a pattern after the existing ones.
    pub fn add(&mut self, pattern: &str) -> Result<()> {
        self.patterns.push(ExcludePattern::parse(pattern)?);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Whether the relative path of a source entry is excluded.
    pub fn is_excluded(&self, relative: &Path) -> bool {
        let rel = path_to_generic_utf8(relative);
        self.patterns.iter().any(|pattern| pattern.matches(&rel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(patterns: &[&str]) -> ExcludeRules {
        let mut rules = ExcludeRules::default();
        for pattern in patterns {
            rules.add(pattern).unwrap();
        }
        rules
    }

    #[test]
    fn segment_pattern_matches_any_component() {
        let rules = rules(&[".git"]);
        assert!(rules.is_excluded(Path::new(".git")));
        assert!(rules.is_excluded(Path::new("a/.git")));
        assert!(rules.is_excluded(Path::new("a/.git/config")));
        assert!(!rules.is_excluded(Path::new("a/gitlog.txt")));
    }

    #[test]
    fn wildcard_star_matches_empty_run() {
        let rules = rules(&["*~"]);
        assert!(rules.is_excluded(Path::new("~")));
        assert!(rules.is_excluded(Path::new("notes.txt~")));
        assert!(!rules.is_excluded(Path::new("notes.txt")));
    }

    #[test]
    fn question_mark_matches_exactly_one() {
        let rules = rules(&["file?.txt"]);
        assert!(rules.is_excluded(Path::new("file1.txt")));
        assert!(!rules.is_excluded(Path::new("file.txt")));
        assert!(!rules.is_excluded(Path::new("file12.txt")));
    }

    #[test]
    fn matching_is_case_insensitive() {
        let rules = rules(&["thumbs.db", "*.TMP"]);
        assert!(rules.is_excluded(Path::new("THUMBS.DB")));
        assert!(rules.is_excluded(Path::new("photos/Thumbs.db")));
        assert!(rules.is_excluded(Path::new("cache.tmp")));
    }

    #[test]
    fn path_pattern_matches_full_relative_path() {
        let rules = rules(&["build/out*"]);
        assert!(rules.is_excluded(Path::new("build/out")));
        assert!(rules.is_excluded(Path::new("build/output/x.bin")));
        assert!(!rules.is_excluded(Path::new("other/build/out")));
        assert!(!rules.is_excluded(Path::new("out")));
    }

    #[test]
    fn star_in_path_pattern_crosses_separators() {
        let rules = rules(&["docs/*.bak"]);
        assert!(rules.is_excluded(Path::new("docs/a.bak")));
        assert!(rules.is_excluded(Path::new("docs/sub/a.bak")));
    }

    #[test]
    fn bracket_and_brace_characters_are_literal() {
        let rules = rules(&["[draft]", "{tmp}"]);
        assert!(rules.is_excluded(Path::new("[draft]")));
        assert!(rules.is_excluded(Path::new("a/{tmp}")));
        assert!(!rules.is_excluded(Path::new("d")));
        assert!(!rules.is_excluded(Path::new("tmp")));
    }

    #[test]
    fn defaults_cover_the_usual_suspects() {
        let rules = ExcludeRules::with_defaults();
        for rel in [
            ".git",
            "src/.svn",
            ".hg/store",
            "photos/Thumbs.db",
            "desktop.ini",
            "music/.DS_Store",
            "a.tmp",
            "b/c.temp",
            ".main.rs.swp",
            "backup~",
        ] {
            assert!(rules.is_excluded(Path::new(rel)), "expected {:?} excluded", rel);
        }
        assert!(!rules.is_excluded(Path::new("photo.jpg")));
        assert!(!rules.is_excluded(Path::new("docs/report.txt")));
    }

    #[test]
    fn adding_patterns_never_shrinks_the_excluded_set() {
        let base = ExcludeRules::with_defaults();
        let mut extended = base.clone();
        extended.add("*.log").unwrap();
        for rel in ["a.tmp", ".git", "x/desktop.ini", "debug.log"] {
            let path = Path::new(rel);
            if base.is_excluded(path) {
                assert!(extended.is_excluded(path), "{:?} lost by extension", rel);
            }
        }
        assert!(extended.is_excluded(Path::new("debug.log")));
    }

    #[test]
    fn empty_rules_exclude_nothing() {
        let rules = ExcludeRules::default();
        assert!(rules.is_empty());
        assert!(!rules.is_excluded(Path::new(".git")));
    }
}
