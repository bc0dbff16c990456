//! Extension-based content classification.

use log::warn;
use serde::Serialize;

use crate::config::ExtensionConfig;

pub const DEFAULT_TEXT_EXTENSIONS: &str = "txt csv log json md ini html htm css js";
pub const DEFAULT_XML_EXTENSIONS: &str = "xml rels vml xsd xsl xslt svg plist";
pub const DEFAULT_IMAGE_EXTENSIONS: &str = "jpg jpeg png bmp gif tif tiff emf wmf wdp";

const SEPARATORS: &[char] = &[',', ';', ' ', '.', '/', '\\', '|'];

/// Preview strategy for an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Image,
    Xml,
    Text,
    Other,
}

impl ContentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Image => "image",
            ContentKind::Xml => "xml",
            ContentKind::Text => "text",
            ContentKind::Other => "other",
        }
    }
}

/// The three extension sets, lower-cased and deduplicated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionSets {
    text: Vec<String>,
    xml: Vec<String>,
    image: Vec<String>,
}

impl Default for ExtensionSets {
    fn default() -> Self {
        Self::defaults()
    }
}

impl ExtensionSets {
    pub fn defaults() -> Self {
        // The default lists always parse.
        Self {
            text: parse_list(DEFAULT_TEXT_EXTENSIONS).unwrap_or_default(),
            xml: parse_list(DEFAULT_XML_EXTENSIONS).unwrap_or_default(),
            image: parse_list(DEFAULT_IMAGE_EXTENSIONS).unwrap_or_default(),
        }
    }

    /// All three lists or nothing.
    pub fn try_parse(text: &str, xml: &str, image: &str) -> Option<Self> {
        Some(Self {
            text: parse_list(text)?,
            xml: parse_list(xml)?,
            image: parse_list(image)?,
        })
    }

    /// Parse the three lists; if any one is unusable all three revert to the defaults.
    pub fn parse(text: &str, xml: &str, image: &str) -> Self {
        match Self::try_parse(text, xml, image) {
            Some(sets) => sets,
            None => {
                warn!(
                    "extension_config_invalid text={:?} xml={:?} image={:?} action=use_defaults",
                    text, xml, image
                );
                Self::defaults()
            }
        }
    }

    pub fn from_config(cfg: &ExtensionConfig) -> Self {
        Self::parse(&cfg.text, &cfg.xml, &cfg.image)
    }

    pub fn text(&self) -> &[String] {
        &self.text
    }

    pub fn xml(&self) -> &[String] {
        &self.xml
    }

    pub fn image(&self) -> &[String] {
        &self.image
    }
}

fn parse_list(s: &str) -> Option<Vec<String>> {
    let mut out: Vec<String> = Vec::new();
    for token in s.split(SEPARATORS).filter(|t| !t.is_empty()) {
        let token = token.to_lowercase();
        if !out.contains(&token) {
            out.push(token);
        }
    }
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

/// Lower-cased text after the last '.', if the name has one.
pub fn extension_of(file_name: &str) -> Option<String> {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryClassifier {
    sets: ExtensionSets,
}

impl EntryClassifier {
    pub fn new(sets: ExtensionSets) -> Self {
        Self { sets }
    }

    pub fn sets(&self) -> &ExtensionSets {
        &self.sets
    }

    /// Text wins over XML, XML over image.
    pub fn classify(&self, file_name: &str) -> ContentKind {
        let Some(ext) = extension_of(file_name) else {
            return ContentKind::Other;
        };
        if self.sets.text.contains(&ext) {
            ContentKind::Text
        } else if self.sets.xml.contains(&ext) {
            ContentKind::Xml
        } else if self.sets.image.contains(&ext) {
            ContentKind::Image
        } else {
            ContentKind::Other
        }
    }
}
