//! Value objects shared across the storefront domain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Raised when a stored text column does not match a closed enum.
#[derive(Debug, Clone, Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Product category. The catalog is closed over these five departments.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Fertilizer,
    Seeds,
    Tools,
    Pesticides,
    Organic,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fertilizer => "fertilizer",
            Self::Seeds => "seeds",
            Self::Tools => "tools",
            Self::Pesticides => "pesticides",
            Self::Organic => "organic",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fertilizer" => Ok(Self::Fertilizer),
            "seeds" => Ok(Self::Seeds),
            "tools" => Ok(Self::Tools),
            "pesticides" => Ok(Self::Pesticides),
            "organic" => Ok(Self::Organic),
            other => Err(ParseEnumError { kind: "category", value: other.to_string() }),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

impl UserRole {
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

impl FromStr for UserRole {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(ParseEnumError { kind: "role", value: other.to_string() }),
        }
    }
}

/// Authenticated caller identity, supplied by the auth collaborator.
/// Trusted as-is; this core performs no re-verification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub role: UserRole,
}

impl Identity {
    pub fn user(id: Uuid) -> Self {
        Self { id, role: UserRole::User }
    }

    pub fn admin(id: Uuid) -> Self {
        Self { id, role: UserRole::Admin }
    }
}

/// Human-readable order number: `ORD-<ms epoch>-<3-digit random>`.
///
/// Uniqueness is probabilistic; the store's unique index catches the
/// theoretical same-millisecond collision.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    pub fn generate(now: DateTime<Utc>) -> Self {
        let suffix = rand::random::<u32>() % 1000;
        Self(format!("ORD-{}-{:03}", now.timestamp_millis(), suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for OrderNumber {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trip() {
        for c in [Category::Fertilizer, Category::Seeds, Category::Tools, Category::Pesticides, Category::Organic] {
            assert_eq!(c.as_str().parse::<Category>().unwrap(), c);
        }
        assert!("furniture".parse::<Category>().is_err());
    }

    #[test]
    fn test_order_number_format() {
        let now = Utc::now();
        let number = OrderNumber::generate(now);
        let parts: Vec<&str> = number.as_str().split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ORD");
        assert_eq!(parts[1], now.timestamp_millis().to_string());
        assert_eq!(parts[2].len(), 3);
        assert!(parts[2].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_role_parse() {
        assert!("admin".parse::<UserRole>().unwrap().is_admin());
        assert!(!"user".parse::<UserRole>().unwrap().is_admin());
    }
}
