//! Fixed-scale decimal price value object.
//!
//! Prices are always constructed from a string or an already-parsed
//! [`Decimal`]; construction from `f64` is intentionally not provided so a
//! caller cannot introduce binary floating-point rounding at the boundary.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::error::ValidationError;

/// A decimal price, fixed at scale 4, positive unless constructed via
/// [`Price::new_nonnegative`] for aggregation contexts that admit zero
/// (e.g. a bucket whose volume happens to be zero).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Price(Decimal);

pub const PRICE_SCALE: u32 = 4;

impl Price {
    /// Parse and validate a strictly positive price (`> 0`).
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let d = parse_decimal(raw)?;
        Self::from_decimal(d)
    }

    /// Validate an already-parsed positive [`Decimal`].
    pub fn from_decimal(mut d: Decimal) -> Result<Self, ValidationError> {
        if d <= Decimal::ZERO {
            return Err(ValidationError::new(
                "price",
                "price_positive",
                format!("price must be > 0, got {d}"),
            ));
        }
        d.rescale(PRICE_SCALE);
        Ok(Self(d))
    }

    /// Parse and validate a price that may be zero, for aggregation
    /// contexts that admit it (e.g. a derived bucket with no trades).
    pub fn parse_nonnegative(raw: &str) -> Result<Self, ValidationError> {
        let d = parse_decimal(raw)?;
        Self::from_decimal_nonnegative(d)
    }

    pub fn from_decimal_nonnegative(mut d: Decimal) -> Result<Self, ValidationError> {
        if d < Decimal::ZERO {
            return Err(ValidationError::new(
                "price",
                "price_nonneg",
                format!("price must be >= 0, got {d}"),
            ));
        }
        d.rescale(PRICE_SCALE);
        Ok(Self(d))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

fn parse_decimal(raw: &str) -> Result<Decimal, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new("price", "non_empty", "price string is empty"));
    }
    Decimal::from_str(trimmed).map_err(|e| {
        ValidationError::new(
            "price",
            "decimal_parse",
            format!("could not parse '{trimmed}' as decimal: {e}"),
        )
    })
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
