//! Contact details shared by schools and students.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::id::ContactId;
use crate::value_object::ValueObject;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub email: String,
    pub phone: String,
    pub address: String,
}

impl Contact {
    /// Validates and builds a contact.
    ///
    /// Email must contain a single `@` with non-empty sides, phone follows
    /// E.164 (`+` optional, 2 to 15 digits, no leading zero) and the address is
    /// 5 to 255 characters.
    pub fn new(
        id: ContactId,
        email: impl Into<String>,
        phone: impl Into<String>,
        address: impl Into<String>,
    ) -> DomainResult<Self> {
        let email = email.into().trim().to_string();
        let phone = phone.into().trim().to_string();
        let address = address.into().trim().to_string();

        validate_email(&email)?;
        validate_phone(&phone)?;

        let len = address.chars().count();
        if !(5..=255).contains(&len) {
            return Err(DomainError::validation(
                "address must be between 5 and 255 characters",
            ));
        }

        Ok(Self {
            id,
            email,
            phone,
            address,
        })
    }
}

impl ValueObject for Contact {}

fn validate_email(email: &str) -> DomainResult<()> {
    match email.split_once('@') {
        Some((local, domain))
            if !local.is_empty() && domain.contains('.') && !domain.contains('@') =>
        {
            Ok(())
        }
        _ => Err(DomainError::validation(format!("invalid email: {email}"))),
    }
}

fn validate_phone(phone: &str) -> DomainResult<()> {
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    let valid = (2..=15).contains(&digits.len())
        && digits.chars().all(|c| c.is_ascii_digit())
        && !digits.starts_with('0');
    if valid {
        Ok(())
    } else {
        Err(DomainError::validation(format!("invalid phone: {phone}")))
    }
}
