use serde::{Deserialize, Serialize};

use crate::catalog::required_text;
use crate::error::ValidationError;

/// Delivery and contact details captured at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    pub address: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
}

impl CustomerInfo {
    /// Validates and normalises the details.
    ///
    /// Phone numbers are stored as digits only, with a leading `+` kept when
    /// the customer supplied one.
    pub fn validate(self) -> Result<Self, ValidationError> {
        let name = required_text("name", &self.name, 100)?;
        let phone = normalize_phone(&self.phone)?;

        let email = match self.email.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(email) => {
                if !is_plausible_email(email) {
                    return Err(ValidationError::new("email", "is not a valid address"));
                }
                Some(email.to_lowercase())
            }
        };

        let address = required_text("address", &self.address, 500)?;
        let city = required_text("city", &self.city, 100)?;
        let state = required_text("state", &self.state, 100)?;

        let pincode = self.pincode.trim().to_string();
        if pincode.len() != 6 || !pincode.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::new("pincode", "must be exactly 6 digits"));
        }

        Ok(Self {
            name,
            phone,
            email,
            address,
            city,
            state,
            pincode,
        })
    }
}

fn is_plausible_email(email: &str) -> bool {
    email
        .split_once('@')
        .is_some_and(|(user, host)| !user.is_empty() && !host.is_empty())
}

fn normalize_phone(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    let (plus, rest) = match trimmed.strip_prefix('+') {
        Some(rest) => ("+", rest),
        None => ("", trimmed),
    };

    let mut digits = String::with_capacity(rest.len());
    for ch in rest.chars() {
        match ch {
            '0'..='9' => digits.push(ch),
            ' ' | '-' => {}
            _ => return Err(ValidationError::new("phone", "may only contain digits")),
        }
    }

    if !(10..=15).contains(&digits.len()) {
        return Err(ValidationError::new("phone", "must have 10 to 15 digits"));
    }
    Ok(format!("{plus}{digits}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer() -> CustomerInfo {
        CustomerInfo {
            name: "Priya".to_string(),
            phone: "98765 43210".to_string(),
            email: Some("Priya@Example.com".to_string()),
            address: "12 Gandhi Road".to_string(),
            city: "Sivakasi".to_string(),
            state: "Tamil Nadu".to_string(),
            pincode: "626123".to_string(),
        }
    }

    #[test]
    fn validate_normalizes_phone_and_email() {
        let info = customer().validate().unwrap();
        assert_eq!(info.phone, "9876543210");
        assert_eq!(info.email.as_deref(), Some("priya@example.com"));
    }

    #[test]
    fn validate_keeps_international_prefix() {
        let mut c = customer();
        c.phone = "+91-98765-43210".to_string();
        assert_eq!(c.validate().unwrap().phone, "+919876543210");
    }

    #[test]
    fn validate_rejects_short_phone() {
        let mut c = customer();
        c.phone = "12345".to_string();
        assert_eq!(c.validate().unwrap_err().field, "phone");
    }

    #[test]
    fn validate_rejects_letters_in_phone() {
        let mut c = customer();
        c.phone = "98765abc10".to_string();
        assert_eq!(c.validate().unwrap_err().field, "phone");
    }

    #[test]
    fn blank_email_is_dropped() {
        let mut c = customer();
        c.email = Some("  ".to_string());
        assert_eq!(c.validate().unwrap().email, None);
    }

    #[test]
    fn validate_rejects_malformed_email() {
        for bad in ["priya", "@example.com", "priya@", "@"] {
            let mut c = customer();
            c.email = Some(bad.to_string());
            assert_eq!(c.validate().unwrap_err().field, "email", "{bad}");
        }
    }

    #[test]
    fn validate_accepts_any_host_after_at() {
        let mut c = customer();
        c.email = Some("Priya@Localhost".to_string());
        assert_eq!(c.validate().unwrap().email.as_deref(), Some("priya@localhost"));
    }

    #[test]
    fn validate_rejects_bad_pincode() {
        let mut c = customer();
        c.pincode = "62612".to_string();
        assert_eq!(c.validate().unwrap_err().field, "pincode");

        let mut c = customer();
        c.pincode = "62612a".to_string();
        assert_eq!(c.validate().unwrap_err().field, "pincode");
    }

    #[test]
    fn validate_requires_address_fields() {
        let mut c = customer();
        c.city = String::new();
        assert_eq!(c.validate().unwrap_err().field, "city");
    }
}
