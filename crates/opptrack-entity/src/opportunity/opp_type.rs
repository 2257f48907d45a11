//! Opportunity type enumeration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Sub-type of a tracked opportunity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "opp_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OppType {
    /// Expression of Interest.
    Eoi,
    /// Request for Proposal.
    Rfp,
    /// Forecast of an upcoming bid.
    Forecast,
}

impl OppType {
    /// Return the type as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eoi => "eoi",
            Self::Rfp => "rfp",
            Self::Forecast => "forecast",
        }
    }
}

impl Default for OppType {
    fn default() -> Self {
        Self::Eoi
    }
}

impl fmt::Display for OppType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OppType {
    type Err = opptrack_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "eoi" => Ok(Self::Eoi),
            "rfp" => Ok(Self::Rfp),
            "forecast" | "fc" => Ok(Self::Forecast),
            _ => Err(opptrack_core::AppError::validation(format!(
                "Invalid opportunity type: '{s}'. Expected one of: eoi, rfp, forecast"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str() {
        assert_eq!("EOI".parse::<OppType>().unwrap(), OppType::Eoi);
        assert_eq!("fc".parse::<OppType>().unwrap(), OppType::Forecast);
        assert!("tender".parse::<OppType>().is_err());
    }
}
