use common::{CategoryId, PageRequest};
use domain::OrderStatus;

/// Builder for filtering the product catalog.
#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    /// Only products in this category.
    pub category_id: Option<CategoryId>,

    /// Case-insensitive substring match on name or SKU.
    pub search: Option<String>,

    /// Hide products switched off by the admin.
    pub active_only: bool,

    /// Only products flagged as featured.
    pub featured_only: bool,

    pub page: PageRequest,
}

impl ProductQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// A query as seen by storefront visitors: active products only.
    pub fn storefront() -> Self {
        Self {
            active_only: true,
            ..Default::default()
        }
    }

    pub fn category(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }

    /// Filters by search text. Blank text is ignored.
    pub fn search(mut self, text: impl Into<String>) -> Self {
        let text = text.into().trim().to_string();
        self.search = (!text.is_empty()).then_some(text);
        self
    }

    pub fn featured(mut self) -> Self {
        self.featured_only = true;
        self
    }

    pub fn page(mut self, page: PageRequest) -> Self {
        self.page = page;
        self
    }
}

/// Builder for filtering orders in the admin dashboard.
#[derive(Debug, Clone, Default)]
pub struct OrderQuery {
    pub status: Option<OrderStatus>,

    /// Substring match on order number or customer phone.
    pub search: Option<String>,

    pub page: PageRequest,
}

impl OrderQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Filters by search text. Blank text is ignored.
    pub fn search(mut self, text: impl Into<String>) -> Self {
        let text = text.into().trim().to_string();
        self.search = (!text.is_empty()).then_some(text);
        self
    }

    pub fn page(mut self, page: PageRequest) -> Self {
        self.page = page;
        self
    }
}

/// Escapes `%`, `_` and `\` so user text matches literally inside `LIKE`.
pub(crate) fn like_pattern(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 2);
    escaped.push('%');
    for ch in text.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}
