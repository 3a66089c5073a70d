use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use station_core::{NormalizeOptions, DEFAULT_TOLERANCE};
use station_domain::{NumericPolicy, SubcategoryPolicy};

use crate::ConfigError;

/// User-configurable preferences for the CLI and the normalization policies it applies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub locale: String,
    pub currency: String,
    #[serde(default)]
    pub numeric_policy: NumericPolicy,
    #[serde(default)]
    pub subcategory_policy: SubcategoryPolicy,
    #[serde(default)]
    pub derive_net_sale: bool,
    #[serde(default = "Config::default_tolerance")]
    pub reconciliation_tolerance: f64,
    #[serde(default = "Config::default_ui_color_enabled")]
    pub ui_color_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_opened_dataset: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    /// Optional custom root directory for datasets. Defaults to `~/Documents/StationLedger`.
    pub default_data_root: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            locale: "en-PK".into(),
            currency: "PKR".into(),
            numeric_policy: NumericPolicy::default(),
            subcategory_policy: SubcategoryPolicy::default(),
            derive_net_sale: false,
            reconciliation_tolerance: Self::default_tolerance(),
            ui_color_enabled: Self::default_ui_color_enabled(),
            last_opened_dataset: None,
            default_data_root: None,
        }
    }
}

impl Config {
    pub const KEYS: [&'static str; 7] = [
        "locale",
        "currency",
        "numeric_policy",
        "subcategory_policy",
        "derive_net_sale",
        "reconciliation_tolerance",
        "ui_color_enabled",
    ];

    pub fn default_tolerance() -> f64 {
        DEFAULT_TOLERANCE
    }

    pub fn default_ui_color_enabled() -> bool {
        true
    }

    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            numeric_policy: self.numeric_policy,
            subcategory_policy: self.subcategory_policy,
            derive_net_sale: self.derive_net_sale,
        }
    }

    pub fn resolve_default_data_root(&self) -> PathBuf {
        if let Some(path) = &self.default_data_root {
            return path.clone();
        }

        dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("StationLedger")
    }

    /// Updates one setting from its textual form.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        let invalid = |reason: &str| ConfigError::InvalidSetting {
            key: key.to_string(),
            reason: reason.to_string(),
        };
        match key {
            "locale" => self.locale = value.to_string(),
            "currency" => self.currency = value.to_ascii_uppercase(),
            "numeric_policy" => {
                self.numeric_policy = match value.to_ascii_lowercase().as_str() {
                    "lenient" => NumericPolicy::Lenient,
                    "strict" => NumericPolicy::Strict,
                    _ => return Err(invalid("expected lenient or strict")),
                }
            }
            "subcategory_policy" => {
                self.subcategory_policy = match value.to_ascii_lowercase().as_str() {
                    "clear" => SubcategoryPolicy::Clear,
                    "reject" => SubcategoryPolicy::Reject,
                    "accept" => SubcategoryPolicy::Accept,
                    _ => return Err(invalid("expected clear, reject, or accept")),
                }
            }
            "reconciliation_tolerance" => {
                let parsed: f64 = value
                    .parse()
                    .map_err(|_| invalid("expected a number"))?;
                if !parsed.is_finite() || parsed < 0.0 {
                    return Err(invalid("must be a non-negative number"));
                }
                self.reconciliation_tolerance = parsed;
            }
            "derive_net_sale" => {
                self.derive_net_sale = parse_flag(value).ok_or_else(|| invalid("expected true or false"))?
            }
            "ui_color_enabled" => {
                self.ui_color_enabled = parse_flag(value).ok_or_else(|| invalid("expected true or false"))?
            }
            _ => return Err(invalid("unknown setting")),
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let value = match key {
            "locale" => self.locale.clone(),
            "currency" => self.currency.clone(),
            "numeric_policy" => self.numeric_policy.to_string(),
            "subcategory_policy" => self.subcategory_policy.to_string(),
            "derive_net_sale" => self.derive_net_sale.to_string(),
            "reconciliation_tolerance" => self.reconciliation_tolerance.to_string(),
            "ui_color_enabled" => self.ui_color_enabled.to_string(),
            _ => return None,
        };
        Some(value)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" => Some(true),
        "false" | "off" | "no" => Some(false),
        _ => None,
    }
}
