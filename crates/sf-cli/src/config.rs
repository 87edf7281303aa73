//! `--config` file handling.
//!
//! ```toml
//! locale = "ja"
//!
//! [dialect]
//! empty_rows = "-"
//! palette = ["#FFFFFF", "#EEEEEE"]
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use sf_core::{DialectConfig, Locale};
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    pub locale: Option<Locale>,
    pub dialect: DialectOverrides,
}

/// Placeholder and palette overrides applied on top of the locale preset.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DialectOverrides {
    pub untitled_title: Option<String>,
    pub unassigned_lane: Option<String>,
    pub empty_rows: Option<String>,
    pub palette: Option<Vec<String>>,
}

impl DialectOverrides {
    fn apply(self, config: &mut DialectConfig) {
        if let Some(title) = self.untitled_title {
            config.untitled_title = title;
        }
        if let Some(lane) = self.unassigned_lane {
            config.unassigned_lane = lane;
        }
        if let Some(rows) = self.empty_rows {
            config.empty_rows = rows;
        }
        if let Some(palette) = self.palette {
            config.palette = palette;
        }
    }
}

pub fn load_config_file(path: &Path) -> Result<CliConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("Invalid config file: {}", path.display()))
}

/// Resolves the dialect: `--locale` beats the file's `locale`, which beats English.
pub fn resolve_dialect(config_path: Option<&Path>, locale: Option<Locale>) -> Result<DialectConfig> {
    let file = match config_path {
        Some(path) => load_config_file(path)?,
        None => CliConfig::default(),
    };
    let locale = locale.or(file.locale).unwrap_or_default();
    let mut dialect = DialectConfig::for_locale(locale);
    file.dialect.apply(&mut dialect);
    debug!("Using dialect for locale {}", locale.as_str());
    Ok(dialect)
}

#[cfg(test)]
mod tests {
    use super::{load_config_file, resolve_dialect};
    use sf_core::{DialectConfig, Locale};
    use std::io::Write;

    fn write_config(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("create temp config");
        file.write_all(text.as_bytes()).expect("write temp config");
        file
    }

    #[test]
    fn no_config_means_english_defaults() {
        let dialect = resolve_dialect(None, None).expect("resolve");
        assert_eq!(dialect, DialectConfig::default());
    }

    #[test]
    fn file_locale_and_overrides_apply() {
        let file = write_config("locale = \"ja\"\n\n[dialect]\nempty_rows = \"-\"\n");
        let dialect = resolve_dialect(Some(file.path()), None).expect("resolve");
        assert_eq!(dialect.unassigned_lane, "未割当");
        assert_eq!(dialect.empty_rows, "-");
    }

    #[test]
    fn flag_locale_wins_over_file() {
        let file = write_config("locale = \"ja\"\n");
        let dialect = resolve_dialect(Some(file.path()), Some(Locale::En)).expect("resolve");
        assert_eq!(dialect.unassigned_lane, "unassigned");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let file = write_config("colour = \"red\"\n");
        assert!(load_config_file(file.path()).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let error = resolve_dialect(Some(&dir.path().join("absent.toml")), None)
            .expect_err("missing config");
        assert!(error.to_string().contains("Failed to read config"));
    }
}
