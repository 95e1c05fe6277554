/*
 * config.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Renderer configuration.
//!
//! A [`RenderConfig`] is validated when it is built (or deserialized) and is
//! shared, unchanged, by a renderer and every partial it includes.

use serde::Deserialize;

use crate::block::{INVERTED, SECTION};
use crate::delim::Delimiter;
use crate::error::ConfigError;
use crate::escape::Escaper;

pub const DEFAULT_OPEN: &str = "{{";
pub const DEFAULT_CLOSE: &str = "}}";

/// Marker of an unescaped variable; always accepted.
pub const RAW: char = '&';

/// Marker of a partial inclusion.
pub const PARTIAL: char = '>';

/// Marker of a section close.
pub const CLOSE: char = '/';

pub const DEFAULT_MAX_PARTIAL_DEPTH: usize = 64;

/// Delimiters, escaping and limits for a render.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "ConfigFile")]
pub struct RenderConfig {
    open: Delimiter,
    close: Delimiter,
    raw_marker: char,
    escaper: Escaper,
    max_partial_depth: usize,
}

impl RenderConfig {
    /// Use `open` and `close` as tag delimiters.
    pub fn with_delimiters(
        mut self,
        open: impl AsRef<[u8]>,
        close: impl AsRef<[u8]>,
    ) -> Result<Self, ConfigError> {
        self.open = Delimiter::new(open)?;
        self.close = Delimiter::new(close)?;
        Ok(self)
    }

    /// Accept `marker` in addition to `&` as the unescaped-variable marker.
    pub fn with_raw_marker(mut self, marker: char) -> Result<Self, ConfigError> {
        if [SECTION, INVERTED, CLOSE, PARTIAL].contains(&marker) {
            return Err(ConfigError::ReservedRawMarker(marker));
        }
        self.raw_marker = marker;
        Ok(self)
    }

    pub fn with_escaper(mut self, escaper: Escaper) -> Self {
        self.escaper = escaper;
        self
    }

    pub fn with_max_partial_depth(mut self, depth: usize) -> Self {
        self.max_partial_depth = depth;
        self
    }

    pub fn open(&self) -> &Delimiter {
        &self.open
    }

    pub fn close(&self) -> &Delimiter {
        &self.close
    }

    pub fn escaper(&self) -> &Escaper {
        &self.escaper
    }

    pub fn max_partial_depth(&self) -> usize {
        self.max_partial_depth
    }

    /// Whether `marker` starts an unescaped variable.
    pub fn is_raw_marker(&self, marker: char) -> bool {
        marker == RAW || marker == self.raw_marker
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            open: Delimiter::from_static(DEFAULT_OPEN),
            close: Delimiter::from_static(DEFAULT_CLOSE),
            raw_marker: RAW,
            escaper: Escaper::html(),
            max_partial_depth: DEFAULT_MAX_PARTIAL_DEPTH,
        }
    }
}

/// Serialized form of [`RenderConfig`]; every field is optional.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    open: String,
    close: String,
    raw_marker: char,
    escape: Option<Escaper>,
    max_partial_depth: usize,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            open: DEFAULT_OPEN.to_string(),
            close: DEFAULT_CLOSE.to_string(),
            raw_marker: RAW,
            escape: None,
            max_partial_depth: DEFAULT_MAX_PARTIAL_DEPTH,
        }
    }
}

impl TryFrom<ConfigFile> for RenderConfig {
    type Error = ConfigError;

    fn try_from(file: ConfigFile) -> Result<Self, Self::Error> {
        let config = RenderConfig::default()
            .with_delimiters(file.open, file.close)?
            .with_raw_marker(file.raw_marker)?
            .with_max_partial_depth(file.max_partial_depth);
        Ok(match file.escape {
            Some(escaper) => config.with_escaper(escaper),
            None => config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = RenderConfig::default();
        assert_eq!(config.open().as_bytes(), b"{{");
        assert_eq!(config.close().as_bytes(), b"}}");
        assert!(config.is_raw_marker('&'));
        assert!(!config.is_raw_marker('='));
        assert_eq!(config.max_partial_depth(), 64);
        assert_eq!(config.escaper(), &Escaper::html());
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: RenderConfig = serde_json::from_value(json!({
            "open": "<%",
            "close": "%>",
            "raw_marker": "=",
        }))
        .unwrap();

        assert_eq!(config.open().as_bytes(), b"<%");
        assert_eq!(config.close().as_bytes(), b"%>");
        assert!(config.is_raw_marker('='));
        assert!(config.is_raw_marker('&'));
        assert_eq!(config.escaper(), &Escaper::html());
    }

    #[test]
    fn test_deserialize_escape_table() {
        let config: RenderConfig = serde_json::from_value(json!({"escape": {}})).unwrap();
        assert_eq!(config.escaper(), &Escaper::none());
    }

    #[test]
    fn test_deserialize_rejects_invalid_values() {
        let empty = serde_json::from_value::<RenderConfig>(json!({"open": ""}));
        assert!(empty.unwrap_err().to_string().contains("delimiters must not be empty"));

        let reserved = serde_json::from_value::<RenderConfig>(json!({"raw_marker": "#"}));
        assert!(reserved.is_err());

        let unknown = serde_json::from_value::<RenderConfig>(json!({"delims": "x"}));
        assert!(unknown.is_err());
    }

    #[test]
    fn test_reserved_raw_markers() {
        for marker in ['#', '^', '/', '>'] {
            assert_eq!(
                RenderConfig::default().with_raw_marker(marker),
                Err(ConfigError::ReservedRawMarker(marker))
            );
        }
    }
}
