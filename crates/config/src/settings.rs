// Application settings
// Loaded from ~/.config/tabsplit/settings.json

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tabsplit_receipt::{DiscountPlacement, ParseOptions};
use tabsplit_split::TipBase;

#[derive(Debug)]
pub enum SettingsError {
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::Io(e) => write!(f, "IO error: {}", e),
            SettingsError::Json(e) => write!(f, "invalid JSON: {}", e),
        }
    }
}

impl std::error::Error for SettingsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SettingsError::Io(e) => Some(e),
            SettingsError::Json(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for SettingsError {
    fn from(e: std::io::Error) -> Self {
        SettingsError::Io(e)
    }
}

impl From<serde_json::Error> for SettingsError {
    fn from(e: serde_json::Error) -> Self {
        SettingsError::Json(e)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Split defaults, used when `assign` is given no rates
    #[serde(rename = "split.defaultTaxRate")]
    pub default_tax_rate: Decimal,

    #[serde(rename = "split.defaultTipRate")]
    pub default_tip_rate: Decimal,

    #[serde(rename = "split.tipBase")]
    pub tip_base: TipBase,

    // Parser
    #[serde(rename = "parser.includesQuantity")]
    pub includes_quantity: bool,

    #[serde(rename = "parser.allowIntegerPrices")]
    pub allow_integer_prices: bool,

    #[serde(rename = "parser.allowOneDecimalPrices")]
    pub allow_one_decimal_prices: bool,

    #[serde(rename = "parser.fallbackLineBased")]
    pub fallback_line_based: bool,

    #[serde(rename = "parser.discountPlacement")]
    pub discount_placement: DiscountPlacement,

    #[serde(rename = "parser.rowMergeThreshold")]
    pub row_merge_threshold: i32,

    #[serde(rename = "parser.extraSkipKeywords")]
    pub extra_skip_keywords: Vec<String>,

    #[serde(rename = "parser.extraDiscountKeywords")]
    pub extra_discount_keywords: Vec<String>,

    // OCR
    #[serde(rename = "ocr.command")]
    pub ocr_command: String,

    #[serde(rename = "ocr.language")]
    pub ocr_language: String,
}

impl Default for Settings {
    fn default() -> Self {
        let parser = ParseOptions::default();
        Self {
            // Split
            default_tax_rate: Decimal::from(8),
            default_tip_rate: Decimal::from(18),
            tip_base: TipBase::default(),
            // Parser
            includes_quantity: parser.includes_quantity,
            allow_integer_prices: parser.allow_integer_prices,
            allow_one_decimal_prices: parser.allow_one_decimal_prices,
            fallback_line_based: parser.fallback_line_based,
            discount_placement: parser.discount_placement,
            row_merge_threshold: parser.row_merge_threshold,
            extra_skip_keywords: Vec::new(),
            extra_discount_keywords: Vec::new(),
            // OCR
            ocr_command: "tesseract".to_string(),
            ocr_language: "eng".to_string(),
        }
    }
}

const DEFAULT_FILE: &str = r#"{
    // Split defaults (percent)
    // Tip base options: "taxInclusive", "preTax"
    "split.defaultTaxRate": 8,
    "split.defaultTipRate": 18,
    "split.tipBase": "taxInclusive",

    // Receipt parsing
    // Discount placement options: "followsItem", "precedesItem"
    "parser.includesQuantity": false,
    "parser.allowIntegerPrices": false,
    "parser.allowOneDecimalPrices": false,
    "parser.fallbackLineBased": true,
    "parser.discountPlacement": "followsItem",
    "parser.rowMergeThreshold": 15,
    "parser.extraSkipKeywords": [],
    "parser.extraDiscountKeywords": [],

    // OCR engine (must accept `<image> stdout -l <language>`)
    "ocr.command": "tesseract",
    "ocr.language": "eng"
}
"#;

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        crate::config_dir().join("settings.json")
    }

    /// Load settings from disk, falling back to defaults. A missing file is
    /// created with the commented defaults.
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            if let Err(e) = Self::write_default_file(&path) {
                log::warn!("could not write default settings to {}: {}", path.display(), e);
            }
            return Self::default();
        }
        Self::load_from(&path)
    }

    /// Load settings from `path`. Missing or malformed files give defaults.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    log::warn!("error parsing {}: {}; using default settings", path.display(), e);
                    Self::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                log::warn!("error reading {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Parse settings JSON. Lines starting with `//` are comments.
    pub fn parse(contents: &str) -> Result<Self, SettingsError> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");
        Ok(serde_json::from_str(&cleaned)?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    fn write_default_file(path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, DEFAULT_FILE)?;
        Ok(())
    }

    /// Parser options as configured; CLI flags layer on top.
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            includes_quantity: self.includes_quantity,
            fallback_line_based: self.fallback_line_based,
            allow_integer_prices: self.allow_integer_prices,
            allow_one_decimal_prices: self.allow_one_decimal_prices,
            discount_placement: self.discount_placement,
            row_merge_threshold: self.row_merge_threshold,
            extra_skip_keywords: self.extra_skip_keywords.clone(),
            extra_discount_keywords: self.extra_discount_keywords.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_file_matches_defaults() {
        assert_eq!(Settings::parse(DEFAULT_FILE).unwrap(), Settings::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let s = Settings::parse(r#"{ "split.defaultTipRate": 20, "split.tipBase": "preTax" }"#).unwrap();
        assert_eq!(s.default_tip_rate, Decimal::from(20));
        assert_eq!(s.tip_base, TipBase::PreTax);
        assert_eq!(s.default_tax_rate, Decimal::from(8));
        assert!(s.fallback_line_based);
    }

    #[test]
    fn fractional_rates_accepted() {
        let s = Settings::parse(r#"{ "split.defaultTaxRate": "8.875" }"#).unwrap();
        assert_eq!(s.default_tax_rate.to_string(), "8.875");
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let s = Settings::load_from(&dir.path().join("nope.json"));
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn malformed_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(Settings::load_from(&path), Settings::default());
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let s = Settings {
            includes_quantity: true,
            discount_placement: DiscountPlacement::PrecedesItem,
            extra_skip_keywords: vec!["service charge".into()],
            ..Settings::default()
        };
        s.save_to(&path).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"parser.discountPlacement\": \"precedesItem\""));
        assert_eq!(Settings::load_from(&path), s);
    }

    #[test]
    fn parse_options_carry_settings() {
        let s = Settings {
            allow_integer_prices: true,
            allow_one_decimal_prices: true,
            row_merge_threshold: 20,
            extra_discount_keywords: vec!["loyalty".into()],
            ..Settings::default()
        };
        let opts = s.parse_options();
        assert!(opts.allow_integer_prices);
        assert!(opts.allow_one_decimal_prices);
        assert_eq!(opts.row_merge_threshold, 20);
        assert!(opts.is_discount_line("Loyalty reward"));
    }
}
