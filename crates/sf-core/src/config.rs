//! Dialect configuration: placeholder strings and the swimlane palette.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::SWIMLANE_PALETTE;

/// UI language of the placeholder strings written into and read from markdown.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Ja,
}

impl Locale {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ja => "ja",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown locale '{0}' (expected en or ja)")]
pub struct UnknownLocale(pub String);

impl FromStr for Locale {
    type Err = UnknownLocale;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Ok(Self::En),
            "ja" | "japanese" => Ok(Self::Ja),
            other => Err(UnknownLocale(other.to_string())),
        }
    }
}

/// Strings and colors the parser and serializer substitute when the graph
/// does not supply them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialectConfig {
    /// Title used when the document never sets one.
    pub untitled_title: String,
    /// Department written for nodes whose swimlane cannot be found.
    pub unassigned_lane: String,
    /// Row list written for a report or system with no resolvable rows.
    pub empty_rows: String,
    /// Swimlane colors, cycled by creation index. Empty falls back to the built-in palette.
    pub palette: Vec<String>,
}

impl Default for DialectConfig {
    fn default() -> Self {
        Self {
            untitled_title: "New business process".to_string(),
            unassigned_lane: "unassigned".to_string(),
            empty_rows: "none".to_string(),
            palette: SWIMLANE_PALETTE.iter().map(|c| (*c).to_string()).collect(),
        }
    }
}

impl DialectConfig {
    /// Placeholders used by the Japanese designer UI.
    #[must_use]
    pub fn japanese() -> Self {
        Self {
            untitled_title: "新規業務プロセス".to_string(),
            unassigned_lane: "未割当".to_string(),
            empty_rows: "なし".to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn for_locale(locale: Locale) -> Self {
        match locale {
            Locale::En => Self::default(),
            Locale::Ja => Self::japanese(),
        }
    }

    #[must_use]
    pub fn swimlane_color(&self, index: usize) -> String {
        if self.palette.is_empty() {
            return crate::swimlane_color(index).to_string();
        }
        self.palette[index % self.palette.len()].clone()
    }
}
