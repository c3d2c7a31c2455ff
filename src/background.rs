//! Background choices: presets, solid colours, and user uploads.

use crate::error::BgSwapError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Built-in backgrounds, fetched on demand at generation time.
pub const PRESET_BACKGROUNDS: [&str; 6] = [
    "https://picsum.photos/id/1018/1024/768",
    "https://picsum.photos/id/1015/1024/768",
    "https://picsum.photos/id/1043/1024/768",
    "https://picsum.photos/id/129/1024/768",
    "https://picsum.photos/id/21/1024/768",
    "https://picsum.photos/id/3/1024/768",
];

/// Colour offered when the user first switches to the colour tab.
pub const DEFAULT_COLOR: &str = "#ffffff";

static HEX_COLOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").unwrap());

/// A validated `#rgb` / `#rrggbb` colour, stored lower-case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor(String);

impl HexColor {
    pub fn parse(value: &str) -> Result<Self, BgSwapError> {
        let trimmed = value.trim();
        if HEX_COLOR.is_match(trimmed) {
            Ok(Self(trimmed.to_ascii_lowercase()))
        } else {
            Err(BgSwapError::InvalidColor {
                value: value.to_string(),
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for HexColor {
    fn default() -> Self {
        Self(DEFAULT_COLOR.to_string())
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for HexColor {
    type Err = BgSwapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for HexColor {
    type Error = BgSwapError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<HexColor> for String {
    fn from(c: HexColor) -> Self {
        c.0
    }
}

/// Which background the subject is composited onto.
///
/// `Upload` carries no payload: the uploaded image lives beside the selection
/// in the session, so flipping to another variant and back keeps it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum BackgroundSelection {
    /// Remote image URL, normally one of [`PRESET_BACKGROUNDS`].
    Preset(String),
    /// Solid colour.
    Color(HexColor),
    /// The custom background uploaded into the session.
    Upload,
}

impl BackgroundSelection {
    /// 1-indexed preset, as shown to users.
    pub fn preset(n: usize) -> Option<Self> {
        n.checked_sub(1)
            .and_then(|i| PRESET_BACKGROUNDS.get(i))
            .map(|url| Self::Preset((*url).to_string()))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Preset(_) => "preset",
            Self::Color(_) => "color",
            Self::Upload => "upload",
        }
    }
}

impl Default for BackgroundSelection {
    fn default() -> Self {
        Self::Preset(PRESET_BACKGROUNDS[0].to_string())
    }
}

/// A background as written on the command line.
///
/// * `preset:N`: the N-th built-in preset (1-indexed)
/// * `color:#rrggbb` or a bare `#rrggbb`
/// * anything else: a local image path or an http(s) URL to upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackgroundSpec {
    Selection(BackgroundSelection),
    Image(String),
}

impl FromStr for BackgroundSpec {
    type Err = BgSwapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(BgSwapError::InvalidInput { input: s.to_string() });
        }

        if let Some(n) = s.strip_prefix("preset:") {
            let n: usize = n.trim().parse().map_err(|_| BgSwapError::InvalidInput {
                input: s.to_string(),
            })?;
            return BackgroundSelection::preset(n)
                .map(Self::Selection)
                .ok_or_else(|| {
                    BgSwapError::InvalidConfig(format!(
                        "preset must be 1–{}, got {}",
                        PRESET_BACKGROUNDS.len(),
                        n
                    ))
                });
        }

        if let Some(c) = s.strip_prefix("color:") {
            return Ok(Self::Selection(BackgroundSelection::Color(HexColor::parse(c)?)));
        }

        if s.starts_with('#') {
            return Ok(Self::Selection(BackgroundSelection::Color(HexColor::parse(s)?)));
        }

        Ok(Self::Image(s.to_string()))
    }
}
