//! Store-wide settings persisted as key/value rows.

use common::Money;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{ValidationError, check_amount_limit};

/// Errors raised while reading stored settings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("Invalid value {value:?} for setting {key}")]
    Invalid { key: String, value: String },
}

pub const STORE_NAME: &str = "store_name";
pub const TAX_RATE_BP: &str = "tax_rate_bp";
pub const SHIPPING_FEE: &str = "shipping_fee";
pub const FREE_SHIPPING_THRESHOLD: &str = "free_shipping_threshold";
pub const MIN_ORDER_AMOUNT: &str = "min_order_amount";
pub const LOW_STOCK_THRESHOLD: &str = "low_stock_threshold";

/// Store configuration used by checkout and the admin dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub store_name: String,
    /// Tax rate in basis points (1800 = 18%).
    pub tax_rate_bp: u32,
    pub shipping_fee: Money,
    /// Orders at or above this amount ship free.
    pub free_shipping_threshold: Option<Money>,
    pub min_order_amount: Money,
    pub low_stock_threshold: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_name: "Storefront".to_string(),
            tax_rate_bp: 0,
            shipping_fee: Money::zero(),
            free_shipping_threshold: None,
            min_order_amount: Money::zero(),
            low_stock_threshold: 10,
        }
    }
}

impl Settings {
    /// Builds settings from stored rows. Missing keys keep their defaults and
    /// unknown keys are ignored.
    pub fn from_entries<I, K, V>(entries: I) -> Result<Self, SettingsError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut settings = Settings::default();

        for (key, value) in entries {
            let (key, value) = (key.as_ref(), value.as_ref().trim());
            let invalid = || SettingsError::Invalid {
                key: key.to_string(),
                value: value.to_string(),
            };

            match key {
                STORE_NAME => settings.store_name = value.to_string(),
                TAX_RATE_BP => settings.tax_rate_bp = value.parse().map_err(|_| invalid())?,
                SHIPPING_FEE => settings.shipping_fee = parse_money(value).ok_or_else(invalid)?,
                FREE_SHIPPING_THRESHOLD => {
                    settings.free_shipping_threshold = if value.is_empty() {
                        None
                    } else {
                        Some(parse_money(value).ok_or_else(invalid)?)
                    }
                }
                MIN_ORDER_AMOUNT => {
                    settings.min_order_amount = parse_money(value).ok_or_else(invalid)?
                }
                LOW_STOCK_THRESHOLD => {
                    settings.low_stock_threshold = value.parse().map_err(|_| invalid())?
                }
                _ => {}
            }
        }

        Ok(settings)
    }

    /// Serialises settings into key/value rows.
    pub fn to_entries(&self) -> Vec<(&'static str, String)> {
        vec![
            (STORE_NAME, self.store_name.clone()),
            (TAX_RATE_BP, self.tax_rate_bp.to_string()),
            (SHIPPING_FEE, self.shipping_fee.paise().to_string()),
            (
                FREE_SHIPPING_THRESHOLD,
                self.free_shipping_threshold
                    .map(|m| m.paise().to_string())
                    .unwrap_or_default(),
            ),
            (MIN_ORDER_AMOUNT, self.min_order_amount.paise().to_string()),
            (LOW_STOCK_THRESHOLD, self.low_stock_threshold.to_string()),
        ]
    }

    /// Shipping charged on an order whose discounted amount is `amount`.
    pub fn shipping_for(&self, amount: Money) -> Money {
        match self.free_shipping_threshold {
            Some(threshold) if amount >= threshold => Money::zero(),
            _ => self.shipping_fee,
        }
    }

    /// Applies a partial update, validating the result.
    pub fn apply(&self, patch: SettingsPatch) -> Result<Settings, ValidationError> {
        let mut next = self.clone();

        if let Some(name) = patch.store_name {
            let name = name.trim();
            if name.is_empty() {
                return Err(ValidationError::new("store_name", "must not be empty"));
            }
            next.store_name = name.to_string();
        }
        if let Some(bp) = patch.tax_rate_bp {
            if bp > 10_000 {
                return Err(ValidationError::new("tax_rate_bp", "must be at most 10000"));
            }
            next.tax_rate_bp = bp;
        }
        if let Some(fee) = patch.shipping_fee {
            if fee.is_negative() {
                return Err(ValidationError::new("shipping_fee", "must not be negative"));
            }
            check_amount_limit("shipping_fee", fee)?;
            next.shipping_fee = fee;
        }
        // Zero switches free shipping off.
        if let Some(threshold) = patch.free_shipping_threshold {
            if threshold.is_negative() {
                return Err(ValidationError::new(
                    "free_shipping_threshold",
                    "must not be negative",
                ));
            }
            check_amount_limit("free_shipping_threshold", threshold)?;
            next.free_shipping_threshold = threshold.is_positive().then_some(threshold);
        }
        if let Some(min) = patch.min_order_amount {
            if min.is_negative() {
                return Err(ValidationError::new(
                    "min_order_amount",
                    "must not be negative",
                ));
            }
            check_amount_limit("min_order_amount", min)?;
            next.min_order_amount = min;
        }
        if let Some(threshold) = patch.low_stock_threshold {
            next.low_stock_threshold = threshold;
        }

        Ok(next)
    }
}

fn parse_money(value: &str) -> Option<Money> {
    value.parse::<i64>().ok().map(Money::from_paise)
}

/// A partial settings update from the admin dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsPatch {
    #[serde(default)]
    pub store_name: Option<String>,
    #[serde(default)]
    pub tax_rate_bp: Option<u32>,
    #[serde(default)]
    pub shipping_fee: Option<Money>,
    #[serde(default)]
    pub free_shipping_threshold: Option<Money>,
    #[serde(default)]
    pub min_order_amount: Option<Money>,
    #[serde(default)]
    pub low_stock_threshold: Option<u32>,
}
