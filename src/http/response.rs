//! Response envelope.
//!
//! # Responsibilities
//! - One shape for every response the gateway authors itself
//! - `details` populated only outside production
//!
//! # Design Decisions
//! - Forwarded backend responses pass through verbatim; the envelope
//!   covers health, rejections, and errors originating here
//! - No internal identifiers, addresses, or secrets in any field

use serde::{Deserialize, Serialize};

/// The uniform client-facing envelope: `{ success, error?, details? }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl Envelope {
    pub fn failure(error: impl Into<String>, details: Option<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_fields_are_omitted() {
        let envelope = Envelope::failure("endpoint not found", None);
        let json = serde_json::to_string(&envelope).unwrap();
        assert_eq!(json, r#"{"success":false,"error":"endpoint not found"}"#);
    }

    #[test]
    fn test_details_serialized_when_present() {
        let envelope = Envelope::failure("too many requests", Some("window resets in 400ms".into()));
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["details"], "window resets in 400ms");
    }
}
