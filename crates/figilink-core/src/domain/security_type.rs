use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Internal security classification written to the `securities` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SecurityType {
    Equity,
    Bond,
    Derivative,
    Fund,
    Index,
    Currency,
    Commodity,
    Unknown,
}

impl SecurityType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Equity => "EQUITY",
            Self::Bond => "BOND",
            Self::Derivative => "DERIVATIVE",
            Self::Fund => "FUND",
            Self::Index => "INDEX",
            Self::Currency => "CURRENCY",
            Self::Commodity => "COMMODITY",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl Display for SecurityType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_stored_value() {
        assert_eq!(SecurityType::Commodity.to_string(), "COMMODITY");
        assert_eq!(SecurityType::Unknown.as_str(), "UNKNOWN");
    }

    #[test]
    fn serializes_as_screaming_case() {
        let json = serde_json::to_string(&SecurityType::Derivative).expect("serialize");
        assert_eq!(json, "\"DERIVATIVE\"");
    }
}
