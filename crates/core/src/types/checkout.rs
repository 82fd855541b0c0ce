//! Checkout form data and field-level validation.
//!
//! Validation runs before any network call; violations are returned per
//! field so the UI can attach messages to inputs.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const NAME_MIN: usize = 2;
const NAME_MAX: usize = 100;
const ADDRESS_MIN: usize = 5;
const ADDRESS_MAX: usize = 300;
const COMMENT_MAX: usize = 500;

fn phone_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // Optional leading +, then at least ten digits/spaces/dashes/parens.
        Regex::new(r"^\+?[0-9\s\-()]{10,}$").expect("phone pattern is valid")
    })
}

/// A single invalid field with a user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: &'static str,
    pub message: String,
}

/// Checkout input rejected before submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid checkout data: {}", .violations.iter().map(|v| v.field).collect::<Vec<_>>().join(", "))]
pub struct ValidationError {
    pub violations: Vec<FieldViolation>,
}

/// Checkout form payload for `POST /orders/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutData {
    pub customer_name: String,
    pub phone: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promo_code: Option<String>,
}

impl CheckoutData {
    /// Validate all fields, collecting every violation.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] listing each failing field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut violations = Vec::new();

        let name_len = self.customer_name.chars().count();
        if name_len < NAME_MIN {
            violations.push(FieldViolation {
                field: "customer_name",
                message: format!("must be at least {NAME_MIN} characters"),
            });
        } else if name_len > NAME_MAX {
            violations.push(FieldViolation {
                field: "customer_name",
                message: format!("must be at most {NAME_MAX} characters"),
            });
        }

        if !phone_pattern().is_match(&self.phone) {
            violations.push(FieldViolation {
                field: "phone",
                message: "enter a valid phone number".to_string(),
            });
        }

        let address_len = self.address.chars().count();
        if address_len < ADDRESS_MIN {
            violations.push(FieldViolation {
                field: "address",
                message: format!("must be at least {ADDRESS_MIN} characters"),
            });
        } else if address_len > ADDRESS_MAX {
            violations.push(FieldViolation {
                field: "address",
                message: format!("must be at most {ADDRESS_MAX} characters"),
            });
        }

        if let Some(comment) = &self.comment
            && comment.chars().count() > COMMENT_MAX
        {
            violations.push(FieldViolation {
                field: "comment",
                message: format!("must be at most {COMMENT_MAX} characters"),
            });
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { violations })
        }
    }
}
