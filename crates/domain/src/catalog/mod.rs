//! Catalog entities: categories and products.

mod category;
mod product;

pub use category::{Category, CategoryDraft};
pub use product::{Product, ProductDraft};

use crate::error::ValidationError;

/// Turns a display name into a URL slug.
///
/// Lowercases ASCII alphanumerics; every run of other characters becomes a
/// single `-`, and leading/trailing dashes are dropped.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;

    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

pub(crate) fn required_text(
    field: &'static str,
    value: &str,
    max_len: usize,
) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }
    if trimmed.chars().count() > max_len {
        return Err(ValidationError::new(
            field,
            format!("must be at most {max_len} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Resolves the slug for a draft: an explicit slug is normalised, otherwise
/// one is derived from the name.
pub(crate) fn resolve_slug(explicit: Option<&str>, name: &str) -> Result<String, ValidationError> {
    let slug = match explicit.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => slugify(s),
        None => slugify(name),
    };
    if slug.is_empty() {
        return Err(ValidationError::new(
            "slug",
            "must contain at least one letter or digit",
        ));
    }
    Ok(slug)
}
