//! Fixed-point money amounts.
//!
//! Amounts are held as integer cents so that summing material lines never
//! drifts. On the wire they are plain JSON numbers in major units (`12.5`),
//! which is what the browser forms send; numeric strings (`"12.50"`) are
//! accepted too.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// A non-negative amount of money in the business currency, stored in cents.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Whole units, e.g. `Money::from_major(50)` is 50.00.
    pub const fn from_major(units: i64) -> Self {
        Self(units * 100)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Line total: `self × quantity`, saturating instead of wrapping.
    pub fn times(self, quantity: i64) -> Money {
        Money(self.0.saturating_mul(quantity))
    }

    /// Parse an amount from a loosely-typed JSON value.
    ///
    /// Accepts numbers and numeric strings. Returns `None` for anything
    /// negative, non-finite, non-numeric or out of range.
    pub fn from_json(value: &Value) -> Option<Money> {
        let major = match value {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        Self::from_major_f64(major)
    }

    fn from_major_f64(major: f64) -> Option<Money> {
        if !major.is_finite() || major < 0.0 {
            return None;
        }
        let cents = (major * 100.0).round();
        if cents > i64::MAX as f64 {
            return None;
        }
        Some(Money(cents as i64))
    }

    /// Amount in major units, for JSON output and display.
    pub fn as_major(self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
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
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_major())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Money::from_json(&value).ok_or_else(|| {
            serde::de::Error::custom(format!("expected a non-negative amount, got {value}"))
        })
    }
}

/// Field deserializer that never fails: anything unusable becomes zero.
///
/// Use with `#[serde(default, deserialize_with = "fieldops_core::money::lenient")]`
/// on price snapshots, where a missing or malformed price counts as free.
pub fn lenient<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Money, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(Money::from_json)
        .unwrap_or(Money::ZERO))
}
