//! Glob-based path-spec matching for `add`/`reset`/`walk` and `.ntignore` (§4.6).
//!
//! Path-spec semantics:
//! - `dir/` matches everything under `dir`.
//! - `*.ext` matches one segment; `**/*.ext` matches any depth.
//! - A leading `/` anchors the pattern to the repository root; otherwise it
//!   matches at any depth.
//! - A pattern prefixed with `!` negates an earlier match (ignore files only).

use globset::{Glob, GlobMatcher};

/// One compiled path-spec pattern, with its negation flag.
struct CompiledSpec {
    matcher: GlobMatcher,
    negated: bool,
}

/// An ordered list of path-spec patterns.
///
/// Used two ways: as a plain OR-match set for CLI path specs (`add`, `reset`,
/// `walk`), and as an ordered include/exclude chain for `.ntignore` files,
/// where later negations can un-exclude an earlier match.
pub struct PathSpecSet {
    specs: Vec<CompiledSpec>,
}

impl PathSpecSet {
    /// Compiles a list of raw pattern strings (one per line of a path-spec
    /// argument list or an ignore file, comments/blank lines already removed).
    pub fn compile<S: AsRef<str>>(patterns: &[S]) -> Self {
        let specs = patterns
            .iter()
            .filter_map(|raw| compile_one(raw.as_ref()))
            .collect();
        Self { specs }
    }

    /// True if this set has no patterns — the "no path spec given" default.
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// True if `relative_path` matches any pattern in the set (negation
    /// ignored) — the semantics `add`/`reset`/`walk` path specs use.
    pub fn matches_any(&self, relative_path: &str) -> bool {
        self.specs.iter().any(|s| s.matcher.is_match(relative_path))
    }

    /// True if an ignore file excludes `relative_path`: any non-negated rule
    /// matches AND no later negation rule matches (§4.6).
    pub fn is_excluded(&self, relative_path: &str) -> bool {
        let mut excluded = false;
        for spec in &self.specs {
            if spec.matcher.is_match(relative_path) {
                excluded = !spec.negated;
            }
        }
        excluded
    }
}

fn compile_one(raw: &str) -> Option<CompiledSpec> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with('#') {
        return None;
    }

    let (negated, rest) = match raw.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, raw),
    };

    let anchored = rest.starts_with('/');
    let rest = rest.trim_start_matches('/');

    let glob_str = if let Some(dir) = rest.strip_suffix('/') {
        format!("{dir}/**")
    } else if anchored || rest.contains('/') {
        rest.to_string()
    } else {
        // Unanchored, single-segment pattern: matches at any depth.
        format!("**/{rest}")
    };

    let matcher = Glob::new(&glob_str).ok()?.compile_matcher();
    Some(CompiledSpec { matcher, negated })
}
