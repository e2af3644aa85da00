//! Store-wide settings.

use common::Money;
use domain::{Settings, SettingsPatch};
use serde::Serialize;
use store::Store;

use crate::error::Result;

/// The subset of settings shown to shoppers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicSettings {
    pub store_name: String,
    pub tax_rate_bp: u32,
    pub shipping_fee: Money,
    pub free_shipping_threshold: Option<Money>,
    pub min_order_amount: Money,
}

impl From<Settings> for PublicSettings {
    fn from(s: Settings) -> Self {
        Self {
            store_name: s.store_name,
            tax_rate_bp: s.tax_rate_bp,
            shipping_fee: s.shipping_fee,
            free_shipping_threshold: s.free_shipping_threshold,
            min_order_amount: s.min_order_amount,
        }
    }
}

#[derive(Clone)]
pub struct SettingsService<S: Store> {
    store: S,
}

impl<S: Store> SettingsService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn get(&self) -> Result<Settings> {
        Ok(self.store.load_settings().await?)
    }

    pub async fn public(&self) -> Result<PublicSettings> {
        Ok(self.get().await?.into())
    }

    /// Applies `patch` on top of the stored settings and saves the result.
    #[tracing::instrument(skip(self, patch))]
    pub async fn update(&self, patch: SettingsPatch) -> Result<Settings> {
        let next = self.get().await?.apply(patch)?;
        self.store.save_settings(&next).await?;
        tracing::info!(
            tax_rate_bp = next.tax_rate_bp,
            shipping_fee = %next.shipping_fee,
            "settings updated"
        );
        Ok(next)
    }
}
