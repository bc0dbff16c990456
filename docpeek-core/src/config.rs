use std::path::Path;

use anyhow::{Context, Result};
use docpeek_codecs::XmlFallback;
use serde::{Deserialize, Serialize};

use crate::classify::{DEFAULT_IMAGE_EXTENSIONS, DEFAULT_TEXT_EXTENSIONS, DEFAULT_XML_EXTENSIONS};

/// 1 GiB cap on decompressed tar bodies.
pub const DEFAULT_MAX_CONTAINER_BYTES: u64 = 1 << 30;

/// Which entries an open turns into preview items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryFilter {
    #[default]
    All,
    ImagesOnly,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XmlFallbackSetting {
    #[default]
    RawText,
    Fail,
}

impl From<XmlFallbackSetting> for XmlFallback {
    fn from(value: XmlFallbackSetting) -> Self {
        match value {
            XmlFallbackSetting::RawText => XmlFallback::RawText,
            XmlFallbackSetting::Fail => XmlFallback::Fail,
        }
    }
}

/// Free-form extension lists, one per previewable kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionConfig {
    pub text: String,
    pub xml: String,
    pub image: String,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            text: DEFAULT_TEXT_EXTENSIONS.to_string(),
            xml: DEFAULT_XML_EXTENSIONS.to_string(),
            image: DEFAULT_IMAGE_EXTENSIONS.to_string(),
        }
    }
}

/// docpeek configuration file. Every field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocpeekConfig {
    pub extensions: ExtensionConfig,
    pub xml_fallback: XmlFallbackSetting,
    pub filter: EntryFilter,
    /// Render every preview while enumerating instead of on first access
    pub eager_render: bool,
    /// Entries larger than this are skipped with a warning
    pub max_entry_bytes: Option<u64>,
    pub max_container_bytes: u64,
}

impl Default for DocpeekConfig {
    fn default() -> Self {
        Self {
            extensions: ExtensionConfig::default(),
            xml_fallback: XmlFallbackSetting::default(),
            filter: EntryFilter::default(),
            eager_render: false,
            max_entry_bytes: None,
            max_container_bytes: DEFAULT_MAX_CONTAINER_BYTES,
        }
    }
}

impl DocpeekConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        serde_json::from_str(s).context("Invalid docpeek configuration")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    /// Load `path` when given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let cfg = DocpeekConfig::from_json_str("{}").unwrap();
        assert_eq!(cfg, DocpeekConfig::default());
        assert_eq!(cfg.max_container_bytes, 1 << 30);
    }

    #[test]
    fn partial_config_keeps_other_defaults() {
        let cfg = DocpeekConfig::from_json_str(
            r#"{"extensions": {"image": "png gif"}, "xml_fallback": "fail", "filter": "images_only"}"#,
        )
        .unwrap();
        assert_eq!(cfg.extensions.image, "png gif");
        assert_eq!(cfg.extensions.text, DEFAULT_TEXT_EXTENSIONS);
        assert_eq!(cfg.xml_fallback, XmlFallbackSetting::Fail);
        assert_eq!(cfg.filter, EntryFilter::ImagesOnly);
        assert!(!cfg.eager_render);
        assert_eq!(XmlFallback::from(cfg.xml_fallback), XmlFallback::Fail);
    }

    #[test]
    fn unknown_policy_is_rejected() {
        assert!(DocpeekConfig::from_json_str(r#"{"xml_fallback": "maybe"}"#).is_err());
    }

    #[test]
    fn load_reports_missing_file() {
        let err = DocpeekConfig::load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to read config"));
    }
}
