//! `.nt/lint`: YAML document declaring lint rules and the attribute coercion
//! schema (§6, §9). Kept external to the binary so new attributes or rules
//! never require a rebuild.

use crate::attribute::AttributeSchema;
use crate::error::{NtError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One lint rule, identified by name. Rule *evaluation* is a collaborator
/// concern (§1 Non-goals); this struct only carries the declared rule and
/// whatever free-form configuration it needs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LintRule {
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

/// The `.nt/lint` document: `rules[]` plus the attribute coercion `schemas[]`
/// referenced from [`crate::attribute::AttributeSchema`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LintConfig {
    #[serde(default)]
    pub rules: Vec<LintRule>,
    #[serde(default)]
    pub schema: AttributeSchema,
}

impl LintConfig {
    /// Loads `.nt/lint`, or an empty configuration (no rules, default-typed
    /// attributes) if the file does not exist yet.
    pub fn load(nt_dir: &Path) -> Result<Self> {
        let path = nt_dir.join("lint");
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path).map_err(|e| NtError::io(&path, e))?;
        serde_yaml::from_str(&content).map_err(|e| NtError::ParseError {
            path: path.clone(),
            reason: format!("parsing lint config: {e}"),
        })
    }

    /// Writes `.nt/lint` as YAML.
    pub fn save(&self, nt_dir: &Path) -> Result<()> {
        let path = nt_dir.join("lint");
        let yaml = serde_yaml::to_string(self).map_err(|e| NtError::ParseError {
            path: path.clone(),
            reason: format!("serializing lint config: {e}"),
        })?;
        fs::write(&path, yaml).map_err(|e| NtError::io(&path, e))
    }

    /// True if the named rule is present and enabled.
    pub fn rule_enabled(&self, name: &str) -> bool {
        self.rules.iter().any(|r| r.name == name && r.enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn load_missing_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        let lint = LintConfig::load(tmp.path()).unwrap();
        assert!(lint.rules.is_empty());
    }

    #[test]
    fn save_then_load_roundtrips_rules() {
        let tmp = TempDir::new().unwrap();
        let lint = LintConfig {
            rules: vec![LintRule {
                name: "no-empty-flashcard".to_string(),
                enabled: true,
            }],
            schema: AttributeSchema::default(),
        };
        lint.save(tmp.path()).unwrap();

        let loaded = LintConfig::load(tmp.path()).unwrap();
        assert!(loaded.rule_enabled("no-empty-flashcard"));
        assert!(!loaded.rule_enabled("unknown-rule"));
    }
}
