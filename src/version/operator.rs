//! Version constraint operators used by rule targets

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Operator applied between a current version and a target version
///
/// Serialized by name (`GREATER_EQUAL`); the sign (`>=`) is accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VersionOperator {
    #[serde(alias = "=")]
    Equal,
    #[serde(alias = ">")]
    Greater,
    #[serde(alias = ">=")]
    GreaterEqual,
    #[serde(alias = "<")]
    Less,
    #[serde(alias = "<=")]
    LessEqual,
    /// `~1.2.3`: same major and minor, at least the target
    #[serde(alias = "~")]
    Tilde,
    /// `^1.2.3`: same left-most non-zero segment, at least the target
    #[serde(alias = "^")]
    Caret,
}

impl VersionOperator {
    pub fn sign(&self) -> &'static str {
        match self {
            VersionOperator::Equal => "=",
            VersionOperator::Greater => ">",
            VersionOperator::GreaterEqual => ">=",
            VersionOperator::Less => "<",
            VersionOperator::LessEqual => "<=",
            VersionOperator::Tilde => "~",
            VersionOperator::Caret => "^",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VersionOperator::Equal => "EQUAL",
            VersionOperator::Greater => "GREATER",
            VersionOperator::GreaterEqual => "GREATER_EQUAL",
            VersionOperator::Less => "LESS",
            VersionOperator::LessEqual => "LESS_EQUAL",
            VersionOperator::Tilde => "TILDE",
            VersionOperator::Caret => "CARET",
        }
    }

    pub fn from_sign(sign: &str) -> Option<Self> {
        match sign {
            "=" => Some(VersionOperator::Equal),
            ">" => Some(VersionOperator::Greater),
            ">=" => Some(VersionOperator::GreaterEqual),
            "<" => Some(VersionOperator::Less),
            "<=" => Some(VersionOperator::LessEqual),
            "~" => Some(VersionOperator::Tilde),
            "^" => Some(VersionOperator::Caret),
            _ => None,
        }
    }
}

impl fmt::Display for VersionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sign())
    }
}

impl FromStr for VersionOperator {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(operator) = Self::from_sign(s) {
            return Ok(operator);
        }
        match s {
            "EQUAL" => Ok(VersionOperator::Equal),
            "GREATER" => Ok(VersionOperator::Greater),
            "GREATER_EQUAL" => Ok(VersionOperator::GreaterEqual),
            "LESS" => Ok(VersionOperator::Less),
            "LESS_EQUAL" => Ok(VersionOperator::LessEqual),
            "TILDE" => Ok(VersionOperator::Tilde),
            "CARET" => Ok(VersionOperator::Caret),
            _ => Err(ModelError::Validation(format!(
                "invalid version operator: {s}"
            ))),
        }
    }
}
