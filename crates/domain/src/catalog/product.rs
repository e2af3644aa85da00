use chrono::{DateTime, Utc};
use common::{CategoryId, Money, ProductId};
use serde::{Deserialize, Serialize};

use super::{optional_text, required_text, resolve_slug};
use crate::error::{ValidationError, check_amount_limit};

/// A catalog product as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub sku: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub category_id: Option<CategoryId>,
    pub price: Money,
    pub sale_price: Option<Money>,
    pub stock_quantity: u32,
    pub sales_count: u32,
    pub is_active: bool,
    pub is_featured: bool,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// The price a customer pays per unit right now.
    pub fn effective_price(&self) -> Money {
        match self.sale_price {
            Some(sale) if sale < self.price => sale,
            _ => self.price,
        }
    }

    /// Returns true if `quantity` units can be sold.
    pub fn is_purchasable(&self, quantity: u32) -> bool {
        self.is_active && self.stock_quantity >= quantity
    }

    pub fn is_low_stock(&self, threshold: u32) -> bool {
        self.stock_quantity <= threshold
    }
}

/// Input for creating or replacing a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDraft {
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    pub price: Money,
    #[serde(default)]
    pub sale_price: Option<Money>,
    #[serde(default)]
    pub stock_quantity: u32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub image_url: Option<String>,
}

fn default_true() -> bool {
    true
}

impl ProductDraft {
    pub fn new(sku: impl Into<String>, name: impl Into<String>, price: Money) -> Self {
        Self {
            sku: sku.into(),
            name: name.into(),
            slug: None,
            description: None,
            category_id: None,
            price,
            sale_price: None,
            stock_quantity: 0,
            is_active: true,
            is_featured: false,
            image_url: None,
        }
    }

    pub fn with_category(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn with_stock(mut self, stock_quantity: u32) -> Self {
        self.stock_quantity = stock_quantity;
        self
    }

    pub fn with_sale_price(mut self, sale_price: Money) -> Self {
        self.sale_price = Some(sale_price);
        self
    }

    /// Validates the draft, uppercases the SKU and fills in the slug.
    pub fn validate(self) -> Result<Self, ValidationError> {
        let sku = required_text("sku", &self.sku, 64)?.to_uppercase();
        if sku.chars().any(char::is_whitespace) {
            return Err(ValidationError::new("sku", "must not contain whitespace"));
        }
        let name = required_text("name", &self.name, 200)?;
        let slug = resolve_slug(self.slug.as_deref(), &name)?;

        if !self.price.is_positive() {
            return Err(ValidationError::new("price", "must be greater than zero"));
        }
        check_amount_limit("price", self.price)?;
        if let Some(sale) = self.sale_price {
            if !sale.is_positive() {
                return Err(ValidationError::new(
                    "sale_price",
                    "must be greater than zero",
                ));
            }
            if sale > self.price {
                return Err(ValidationError::new(
                    "sale_price",
                    "must not exceed the regular price",
                ));
            }
        }

        Ok(Self {
            sku,
            name,
            slug: Some(slug),
            description: optional_text(self.description),
            category_id: self.category_id,
            price: self.price,
            sale_price: self.sale_price,
            stock_quantity: self.stock_quantity,
            is_active: self.is_active,
            is_featured: self.is_featured,
            image_url: optional_text(self.image_url),
        })
    }

    /// Returns the slug of a validated draft.
    pub fn slug(&self) -> &str {
        self.slug.as_deref().unwrap_or_default()
    }
}
