//! # Pricing Configuration
//!
//! Limits and output options for the pricing pipeline.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     CHECKOUT_MAX_LINE_ITEMS=200                                        │
//! │     CHECKOUT_STRIP_SNAPSHOTS=false                                     │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/checkout-pricing/pricing.toml (Linux)                    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [limits]
//! max_line_items = 100
//! max_item_quantity = 999
//! max_discounts = 50
//! max_unit_price = 100000000   # cents
//!
//! [output]
//! strip_product_snapshots = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::error::ConfigError;
use crate::money::Money;
use crate::{MAX_CART_ITEMS, MAX_DISCOUNTS, MAX_ITEM_QUANTITY, MAX_UNIT_PRICE_CENTS};

// =============================================================================
// Limits
// =============================================================================

/// Request size limits. Requests beyond them are rejected outright.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitSettings {
    /// Maximum number of line items in one request.
    #[serde(default = "default_max_line_items")]
    pub max_line_items: usize,

    /// Maximum quantity on a single line item.
    #[serde(default = "default_max_item_quantity")]
    pub max_item_quantity: i64,

    /// Maximum number of discounts + coupons supplied in one request.
    #[serde(default = "default_max_discounts")]
    pub max_discounts: usize,

    /// Highest unit price (cents) a line item may carry.
    #[serde(default = "default_max_unit_price")]
    pub max_unit_price: Money,
}

fn default_max_line_items() -> usize {
    MAX_CART_ITEMS
}

fn default_max_item_quantity() -> i64 {
    MAX_ITEM_QUANTITY
}

fn default_max_discounts() -> usize {
    MAX_DISCOUNTS
}

fn default_max_unit_price() -> Money {
    Money::from_cents(MAX_UNIT_PRICE_CENTS)
}

impl Default for LimitSettings {
    fn default() -> Self {
        LimitSettings {
            max_line_items: default_max_line_items(),
            max_item_quantity: default_max_item_quantity(),
            max_discounts: default_max_discounts(),
            max_unit_price: default_max_unit_price(),
        }
    }
}

// =============================================================================
// Output
// =============================================================================

/// Shape of the returned [`crate::types::PricingResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSettings {
    /// Drop product snapshots from every evolution entry, keeping the
    /// resolved unit price only.
    #[serde(default = "default_true")]
    pub strip_product_snapshots: bool,
}

fn default_true() -> bool {
    true
}

impl Default for OutputSettings {
    fn default() -> Self {
        OutputSettings {
            strip_product_snapshots: true,
        }
    }
}

// =============================================================================
// Main Pricing Configuration
// =============================================================================

/// Complete pricing configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingConfig {
    #[serde(default)]
    pub limits: LimitSettings,

    #[serde(default)]
    pub output: OutputSettings,
}

impl PricingConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (pricing.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading pricing config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load pricing config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Parses a TOML document; missing keys take their defaults.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Validates the configuration.
    ///
    /// The limits must keep the largest possible cart value
    /// (`max_unit_price × max_item_quantity × max_line_items`) inside the
    /// `i64` cent range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_line_items == 0 {
            return Err(ConfigError::Invalid(
                "max_line_items must be greater than 0".into(),
            ));
        }
        if self.limits.max_item_quantity <= 0 {
            return Err(ConfigError::Invalid(
                "max_item_quantity must be greater than 0".into(),
            ));
        }
        if self.limits.max_unit_price.is_negative() {
            return Err(ConfigError::Invalid(
                "max_unit_price must not be negative".into(),
            ));
        }

        let max_cart_value = i64::try_from(self.limits.max_line_items)
            .ok()
            .and_then(|items| items.checked_mul(self.limits.max_item_quantity))
            .and_then(|units| units.checked_mul(self.limits.max_unit_price.cents()));
        if max_cart_value.is_none() {
            return Err(ConfigError::Invalid(
                "max_unit_price × max_item_quantity × max_line_items overflows".into(),
            ));
        }
        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var("CHECKOUT_MAX_LINE_ITEMS") {
            match value.parse::<usize>() {
                Ok(max) => {
                    debug!(max, "Overriding max_line_items from environment");
                    self.limits.max_line_items = max;
                }
                Err(_) => warn!(value = %value, "Ignoring invalid CHECKOUT_MAX_LINE_ITEMS"),
            }
        }

        if let Ok(value) = std::env::var("CHECKOUT_MAX_ITEM_QUANTITY") {
            match value.parse::<i64>() {
                Ok(max) => self.limits.max_item_quantity = max,
                Err(_) => warn!(value = %value, "Ignoring invalid CHECKOUT_MAX_ITEM_QUANTITY"),
            }
        }

        if let Ok(value) = std::env::var("CHECKOUT_MAX_DISCOUNTS") {
            match value.parse::<usize>() {
                Ok(max) => self.limits.max_discounts = max,
                Err(_) => warn!(value = %value, "Ignoring invalid CHECKOUT_MAX_DISCOUNTS"),
            }
        }

        if let Ok(value) = std::env::var("CHECKOUT_MAX_UNIT_PRICE") {
            match value.parse::<i64>() {
                Ok(cents) => self.limits.max_unit_price = Money::from_cents(cents),
                Err(_) => warn!(value = %value, "Ignoring invalid CHECKOUT_MAX_UNIT_PRICE"),
            }
        }

        if let Ok(value) = std::env::var("CHECKOUT_STRIP_SNAPSHOTS") {
            match value.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.output.strip_product_snapshots = true,
                "0" | "false" | "no" => self.output.strip_product_snapshots = false,
                _ => warn!(value = %value, "Ignoring invalid CHECKOUT_STRIP_SNAPSHOTS"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "checkout", "pricing")
            .map(|dirs| dirs.config_dir().join("pricing.toml"))
    }
}
