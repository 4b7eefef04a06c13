//! `.nt/config`: TOML repository configuration (§6, §10.1).
//!
//! Sections are additive and forward-compatible: every sub-section carries
//! `#[serde(default)]` plus a `Default` impl so older config files keep
//! loading as new sections are introduced.

use crate::error::{NtError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// The `.nt/config` document.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub core: CoreConfig,
    /// Per-alias go-link URL templates, keyed by alias (`[reference.<alias>]`).
    #[serde(default)]
    pub reference: BTreeMap<String, ReferenceConfig>,
    /// Per-deck study parameters, keyed by deck name (`[deck.<name>]`).
    #[serde(default)]
    pub deck: BTreeMap<String, DeckConfig>,
}

impl Config {
    /// Loads `.nt/config`, or a default configuration if it does not exist.
    pub fn load(nt_dir: &Path) -> Result<Self> {
        let path = nt_dir.join("config");
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path).map_err(|e| NtError::io(&path, e))?;
        toml::from_str(&content).map_err(|e| NtError::ConfigError(format!("parsing {}: {e}", path.display())))
    }

    /// Writes `.nt/config` as pretty-printed TOML.
    pub fn save(&self, nt_dir: &Path) -> Result<()> {
        let path = nt_dir.join("config");
        let content = toml::to_string_pretty(self).map_err(|e| NtError::ConfigError(format!("serializing config: {e}")))?;
        fs::write(&path, content).map_err(|e| NtError::io(&path, e))
    }
}

/// Repository-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// On-disk format version, bumped only on a breaking index/pack change.
    pub format_version: u32,
    /// Editor invoked by any future interactive command.
    pub editor: Option<String>,
    /// Pager used for long `status`/`diff` output.
    pub pager: Option<String>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            format_version: 1,
            editor: None,
            pager: None,
        }
    }
}

/// One `[reference.<alias>]` go-link URL template, e.g. `alias = "rfc"` with
/// `url_template = "https://rfc-editor.org/rfc/{slug}"`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReferenceConfig {
    pub url_template: String,
}

/// One `[deck.<name>]` flashcard study configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeckConfig {
    pub new_cards_per_day: u32,
    pub max_reviews_per_day: u32,
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            new_cards_per_day: 20,
            max_reviews_per_day: 200,
        }
    }
}
