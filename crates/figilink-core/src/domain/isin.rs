use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::validation::is_valid_isin;
use crate::ValidationError;

/// A validated International Securities Identification Number.
///
/// Input is taken verbatim: no trimming or case folding, so `"us0378331005"`
/// is rejected rather than normalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Isin(String);

impl Isin {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        if !is_valid_isin(input) {
            return Err(ValidationError::InvalidIsin {
                value: input.to_string(),
            });
        }

        Ok(Self(input.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Two-letter country prefix.
    pub fn country_code(&self) -> &str {
        &self.0[..2]
    }
}

impl Display for Isin {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Isin {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for Isin {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Isin> for String {
    fn from(value: Isin) -> Self {
        value.0
    }
}
