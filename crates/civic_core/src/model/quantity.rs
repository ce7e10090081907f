//! Free-text resource quantities such as `12 gal` or `3.5`.
//!
//! # Invariants
//! - The unit suffix is kept byte-for-byte, including leading whitespace.
//! - Arithmetic rounds to two decimals so float noise never reaches display.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::{Display, Formatter};

static QUANTITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9.]+)(\s*.*)$").expect("valid quantity regex"));

/// Liters per gallon used when totalling water.
pub const LITERS_PER_GALLON: f64 = 3.78;

/// A parsed quantity: leading number plus untouched unit suffix.
#[derive(Debug, Clone, PartialEq)]
pub struct Quantity {
    pub value: f64,
    pub suffix: String,
}

impl Quantity {
    /// Parses `<number><optional suffix>`.
    ///
    /// The number run may contain several dots (`1.2.3 kg`); like a lenient
    /// float parser, the longest valid prefix is used. Returns `None` when no
    /// digits lead the text or the number overflows to infinity.
    pub fn parse(text: &str) -> Option<Self> {
        let caps = QUANTITY_RE.captures(text)?;
        let number = caps.get(1)?.as_str();
        let suffix = caps.get(2).map_or("", |m| m.as_str());
        let value = parse_leading_float(number)?;
        Some(Self {
            value,
            suffix: suffix.to_string(),
        })
    }

    /// Returns a copy moved by `delta`, rounded to two decimals.
    pub fn offset(&self, delta: f64) -> Self {
        Self {
            value: round_two_decimals(self.value + delta),
            suffix: self.suffix.clone(),
        }
    }

    /// Returns a copy with the numeric part set to zero.
    pub fn zeroed(&self) -> Self {
        Self {
            value: 0.0,
            suffix: self.suffix.clone(),
        }
    }

    /// Converts to liters: suffixes mentioning `gal` are gallons, anything
    /// else is already liters.
    pub fn liters(&self) -> f64 {
        if self.suffix.to_ascii_lowercase().contains("gal") {
            self.value * LITERS_PER_GALLON
        } else {
            self.value
        }
    }
}

impl Display for Quantity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // f64 Display prints `3` for 3.0 and `2.5` for 2.5, never exponent form
        // for the magnitudes a household inventory holds.
        write!(f, "{}{}", self.value, self.suffix)
    }
}

/// Rounds to two decimal places, half away from zero.
pub fn round_two_decimals(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn parse_leading_float(number: &str) -> Option<f64> {
    let mut end = number.len();
    while end > 0 {
        if let Ok(value) = number[..end].parse::<f64>() {
            return value.is_finite().then_some(value);
        }
        end -= 1;
    }
    None
}
