//! Glob-based ignore rules.
//!
//! Pattern semantics:
//! - `*`, `?`, `[...]` match within a single path segment; `**` crosses
//!   segments.
//! - A pattern without a leading `/` floats: it matches the relative path or
//!   any trailing run of whole segments, so `ignored.txt` matches both
//!   `ignored.txt` and `sub/ignored.txt`, and `node_modules` matches a
//!   directory of that name at any depth.
//! - A leading `/` anchors the pattern at the project root.
//! - A trailing `/` restricts the pattern to directories.

use globset::{GlobBuilder, GlobMatcher};

use crate::config::ConfigError;

#[derive(Debug, Clone)]
struct Rule {
  matcher: GlobMatcher,
  anchored: bool,
  dir_only: bool,
}

/// Compiled ignore patterns.
#[derive(Debug, Clone, Default)]
pub struct IgnoreRules {
  rules: Vec<Rule>,
}

impl IgnoreRules {
  /// Compile `patterns`. Blank patterns are skipped.
  pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, ConfigError> {
    let mut rules = Vec::with_capacity(patterns.len());

    for raw in patterns {
      let raw = raw.as_ref();
      let mut pattern = raw.trim();
      if pattern.is_empty() {
        continue;
      }

      let anchored = pattern.starts_with('/');
      pattern = pattern.trim_start_matches('/');
      let dir_only = pattern.ends_with('/');
      pattern = pattern.trim_end_matches('/');
      if pattern.is_empty() {
        continue;
      }

      let matcher = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|source| ConfigError::InvalidIgnore {
          pattern: raw.to_string(),
          source,
        })?
        .compile_matcher();

      rules.push(Rule {
        matcher,
        anchored,
        dir_only,
      });
    }

    Ok(Self { rules })
  }

  pub fn is_empty(&self) -> bool {
    self.rules.is_empty()
  }

  /// Whether the `/`-separated project-relative path should be excluded.
  pub fn is_ignored(&self, relative_path: &str, is_dir: bool) -> bool {
    self.rules.iter().any(|rule| {
      if rule.dir_only && !is_dir {
        return false;
      }
      if rule.anchored {
        return rule.matcher.is_match(relative_path);
      }
      segment_suffixes(relative_path).any(|candidate| rule.matcher.is_match(candidate))
    })
  }
}

/// `a/b/c` yields `a/b/c`, `b/c`, `c`.
fn segment_suffixes(path: &str) -> impl Iterator<Item = &str> {
  std::iter::once(path).chain(path.match_indices('/').map(move |(idx, _)| &path[idx + 1..]))
}
