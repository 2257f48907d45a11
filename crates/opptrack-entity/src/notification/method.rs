//! Delivery method enumeration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Per-subscription delivery method preference.
///
/// Distinct from a notification *channel* (a named broadcast list): a
/// channel's subscribers each choose one of these methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "delivery_method", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMethod {
    /// Long-form email with subject and HTML body.
    Email,
    /// Short text via SMS gateway.
    Sms,
    /// Short text via WhatsApp Business API.
    Whatsapp,
}

impl DeliveryMethod {
    /// All methods, in dispatch order.
    pub const ALL: [DeliveryMethod; 3] = [Self::Email, Self::Sms, Self::Whatsapp];

    /// Return the method as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Sms => "sms",
            Self::Whatsapp => "whatsapp",
        }
    }

    /// Whether this method delivers the long-form body with a subject.
    pub fn is_long_form(&self) -> bool {
        matches!(self, Self::Email)
    }
}

impl fmt::Display for DeliveryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DeliveryMethod {
    type Err = opptrack_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "email" => Ok(Self::Email),
            "sms" => Ok(Self::Sms),
            "whatsapp" => Ok(Self::Whatsapp),
            _ => Err(opptrack_core::AppError::validation(format!(
                "Invalid delivery method: '{s}'. Expected one of: email, sms, whatsapp"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str() {
        assert_eq!("email".parse::<DeliveryMethod>().unwrap(), DeliveryMethod::Email);
        assert_eq!("WhatsApp".parse::<DeliveryMethod>().unwrap(), DeliveryMethod::Whatsapp);
        assert!("pigeon".parse::<DeliveryMethod>().is_err());
    }

    #[test]
    fn test_long_form() {
        assert!(DeliveryMethod::Email.is_long_form());
        assert!(!DeliveryMethod::Sms.is_long_form());
        assert!(!DeliveryMethod::Whatsapp.is_long_form());
    }
}
