// Core auction domain types: money, roles, player identity.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Money
// ---------------------------------------------------------------------------

/// A currency amount stored as integer cents.
///
/// All arithmetic is exact at two decimal places; the only rounding happens
/// when converting from a floating-point wire value, and only to the nearest
/// cent. Serialized as a JSON decimal number (e.g. `40.5`), matching the
/// valuation service's payloads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Construct from an exact number of cents.
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Construct from whole currency units (e.g. `from_units(40)` == 40.00).
    pub const fn from_units(units: i64) -> Self {
        Money(units * 100)
    }

    /// Construct from a floating-point amount, rounding to the nearest cent.
    pub fn from_f64(value: f64) -> Self {
        Money((value * 100.0).round() as i64)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Subtraction that floors at zero. Used when recomputing a remaining
    /// budget from server-reported rosters that may momentarily overspend.
    pub fn saturating_sub(self, other: Money) -> Money {
        Money((self.0 - other.0).max(0))
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyParseError {
    #[error("invalid money amount: {0:?}")]
    Invalid(String),
    #[error("money amount {0:?} has more than two decimal places")]
    TooPrecise(String),
}

impl FromStr for Money {
    type Err = MoneyParseError;

    /// Parse a decimal string such as `"40"`, `"40.5"`, or `"40.55"`.
    ///
    /// More than two decimal places is an error rather than a silent
    /// rounding: user input beyond the currency's precision is a typo.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (sign, body) = match trimmed.strip_prefix('-') {
            Some(rest) => (-1i64, rest),
            None => (1i64, trimmed),
        };
        let invalid = || MoneyParseError::Invalid(s.to_string());

        let (units_str, frac_str) = match body.split_once('.') {
            Some((u, f)) => (u, f),
            None => (body, ""),
        };
        if units_str.is_empty() && frac_str.is_empty() {
            return Err(invalid());
        }
        if frac_str.len() > 2 {
            return Err(MoneyParseError::TooPrecise(s.to_string()));
        }

        let units: i64 = if units_str.is_empty() {
            0
        } else {
            units_str.parse().map_err(|_| invalid())?
        };
        let frac: i64 = if frac_str.is_empty() {
            0
        } else {
            let parsed: i64 = frac_str.parse().map_err(|_| invalid())?;
            if frac_str.len() == 1 {
                parsed * 10
            } else {
                parsed
            }
        };

        Ok(Money(sign * (units * 100 + frac)))
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Ok(Money::from_f64(value))
    }
}

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// Fantasy-basketball roles as reported by the valuation service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "P")]
    Playmaker,
    #[serde(rename = "A")]
    Ala,
    #[serde(rename = "C")]
    Centro,
}

impl Role {
    /// Parse a role string. Accepts the single-letter wire form ("P", "A",
    /// "C") as well as the long names, case-insensitively.
    pub fn from_str_role(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "P" | "PLAYMAKER" => Some(Role::Playmaker),
            "A" | "ALA" => Some(Role::Ala),
            "C" | "CENTRO" => Some(Role::Centro),
            _ => None,
        }
    }

    pub fn display_str(&self) -> &'static str {
        match self {
            Role::Playmaker => "P",
            Role::Ala => "A",
            Role::Centro => "C",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

// ---------------------------------------------------------------------------
// PlayerName
// ---------------------------------------------------------------------------

/// Player identity: a `(first, last)` name pair.
///
/// Comparison is case-insensitive; the auction has no stable player ids, so
/// the name pair is the identity (two distinct real players sharing a full
/// name cannot be told apart).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerName {
    pub first: String,
    pub last: String,
}

impl PlayerName {
    pub fn new(first: impl Into<String>, last: impl Into<String>) -> Self {
        PlayerName {
            first: first.into(),
            last: last.into(),
        }
    }

    /// Split a full name on the first whitespace: the first token becomes the
    /// first name, the remainder the last name. Returns `None` for an
    /// empty/blank input. A single token yields an empty last name.
    pub fn parse(full: &str) -> Option<Self> {
        let trimmed = full.trim();
        if trimmed.is_empty() {
            return None;
        }
        match trimmed.split_once(char::is_whitespace) {
            Some((first, rest)) => Some(PlayerName::new(first, rest.trim())),
            None => Some(PlayerName::new(trimmed, "")),
        }
    }

    /// The displayable full name.
    pub fn full(&self) -> String {
        if self.last.is_empty() {
            self.first.clone()
        } else {
            format!("{} {}", self.first, self.last)
        }
    }

    /// Case-insensitive identity comparison.
    pub fn matches(&self, other: &PlayerName) -> bool {
        self.first.eq_ignore_ascii_case(&other.first)
            && self.last.eq_ignore_ascii_case(&other.last)
    }
}

impl fmt::Display for PlayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full())
    }
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// A purchased player. Append-only: once on a roster, never edited in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub name: PlayerName,
    pub role: Role,
    pub cost: Money,
    /// Server-computed valuation score ("punti" prediction); opaque here.
    pub predicted_pdk: f64,
}

// ---------------------------------------------------------------------------
// TeamId
// ---------------------------------------------------------------------------

/// Normalized opponent team identifier (trimmed, lower-cased).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TeamId(String);

impl TeamId {
    /// Normalize a raw opponent name. Returns `None` when nothing is left
    /// after trimming.
    pub fn normalized(raw: &str) -> Option<Self> {
        let cleaned = raw.trim().to_lowercase();
        if cleaned.is_empty() {
            None
        } else {
            Some(TeamId(cleaned))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
