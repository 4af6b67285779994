//! Composer configuration, loaded from the `[context_references]` table of a
//! TOML document.
//!
//! `ComposerConfigToml` mirrors the on-disk shape (every field optional);
//! [`ComposerConfig`] is the validated, fully-defaulted form the composer runs
//! with.

use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::anchor::AnchorPolicy;
use crate::anchor::FallbackAnchor;
use crate::search::SearchPolicy;

pub const DEFAULT_TRIGGER: char = '@';
pub const DEFAULT_DEBOUNCE_MS: u64 = 50;
pub const DEFAULT_RECENT_LIMIT: usize = 20;
pub const DEFAULT_MATCH_LIMIT: usize = 50;
pub const DEFAULT_POPUP_SPACING: u16 = 1;
pub const DEFAULT_MAX_VISIBLE_ROWS: usize = 8;

const TABLE_NAME: &str = "context_references";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse composer config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("trigger must be a visible character, got {0:?}")]
    InvalidTrigger(char),

    #[error("`{0}` must be greater than zero")]
    ZeroLimit(&'static str),
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ComposerConfigToml {
    pub trigger: Option<char>,
    pub debounce_ms: Option<u64>,
    pub recent_limit: Option<usize>,
    pub match_limit: Option<usize>,
    pub popup_spacing: Option<u16>,
    pub fallback_anchor: Option<FallbackAnchor>,
    pub max_visible_rows: Option<usize>,
}

#[derive(Deserialize)]
struct ConfigDocument {
    context_references: Option<ComposerConfigToml>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposerConfig {
    /// Character that opens the reference popup when typed at a word start.
    pub trigger: char,
    pub search: SearchPolicy,
    pub anchor: AnchorPolicy,
    pub max_visible_rows: usize,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            trigger: DEFAULT_TRIGGER,
            search: SearchPolicy::default(),
            anchor: AnchorPolicy::default(),
            max_visible_rows: DEFAULT_MAX_VISIBLE_ROWS,
        }
    }
}

impl ComposerConfig {
    /// Parse either a bare table or a document containing a
    /// `[context_references]` table. Missing fields keep their defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let value: toml::Table = toml::from_str(contents)?;
        let raw = if value.contains_key(TABLE_NAME) {
            let document: ConfigDocument = toml::from_str(contents)?;
            document.context_references.unwrap_or_default()
        } else {
            toml::from_str(contents)?
        };
        Self::try_from(raw)
    }
}

impl TryFrom<ComposerConfigToml> for ComposerConfig {
    type Error = ConfigError;

    fn try_from(raw: ComposerConfigToml) -> Result<Self, Self::Error> {
        let defaults = ComposerConfig::default();

        let trigger = raw.trigger.unwrap_or(defaults.trigger);
        if trigger.is_whitespace() || trigger.is_control() {
            return Err(ConfigError::InvalidTrigger(trigger));
        }
        let recent_limit = non_zero("recent_limit", raw.recent_limit)?
            .unwrap_or(defaults.search.recent_limit);
        let match_limit =
            non_zero("match_limit", raw.match_limit)?.unwrap_or(defaults.search.match_limit);
        let max_visible_rows = non_zero("max_visible_rows", raw.max_visible_rows)?
            .unwrap_or(defaults.max_visible_rows);

        Ok(Self {
            trigger,
            search: SearchPolicy {
                debounce: raw
                    .debounce_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.search.debounce),
                recent_limit,
                match_limit,
            },
            anchor: AnchorPolicy {
                spacing: raw.popup_spacing.unwrap_or(defaults.anchor.spacing),
                fallback: raw.fallback_anchor.unwrap_or(defaults.anchor.fallback),
            },
            max_visible_rows,
        })
    }
}

fn non_zero(field: &'static str, value: Option<usize>) -> Result<Option<usize>, ConfigError> {
    match value {
        Some(0) => Err(ConfigError::ZeroLimit(field)),
        other => Ok(other),
    }
}
