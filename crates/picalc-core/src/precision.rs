//! Precision descriptors: significant digit count and rounding policy.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::calculator::SeriesError;
use crate::constants::DEFAULT_PRECISION_DIGITS;

/// Rule applied when a value has more significant digits than requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoundingPolicy {
    /// Truncate toward zero.
    #[default]
    Down,
    /// Round to nearest, ties away from zero.
    HalfUp,
    /// Round to nearest, ties to the even neighbour.
    HalfEven,
}

impl RoundingPolicy {
    /// All policies, in declaration order.
    pub const ALL: [RoundingPolicy; 3] = [Self::Down, Self::HalfUp, Self::HalfEven];

    /// Canonical command-line name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Down => "down",
            Self::HalfUp => "half-up",
            Self::HalfEven => "half-even",
        }
    }
}

impl fmt::Display for RoundingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoundingPolicy {
    type Err = SeriesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "down" | "truncate" => Ok(Self::Down),
            "half-up" | "half_up" => Ok(Self::HalfUp),
            "half-even" | "half_even" => Ok(Self::HalfEven),
            other => Err(SeriesError::Config(format!("unknown rounding policy: {other}"))),
        }
    }
}

/// Number of significant decimal digits and the rounding rule used to reach it.
///
/// # Example
/// ```
/// use picalc_core::precision::{Precision, RoundingPolicy};
///
/// let p = Precision::new(50, RoundingPolicy::HalfEven).unwrap();
/// assert_eq!(p.digits(), 50);
/// assert!(Precision::new(0, RoundingPolicy::Down).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Precision {
    digits: u32,
    rounding: RoundingPolicy,
}

impl Precision {
    /// Create a precision of `digits` significant digits. Zero digits is rejected.
    pub fn new(digits: u32, rounding: RoundingPolicy) -> Result<Self, SeriesError> {
        if digits == 0 {
            return Err(SeriesError::InvalidArgument(
                "precision must have at least one digit".into(),
            ));
        }
        Ok(Self { digits, rounding })
    }

    /// Significant digit count.
    #[must_use]
    pub fn digits(&self) -> u32 {
        self.digits
    }

    /// Rounding policy.
    #[must_use]
    pub fn rounding(&self) -> RoundingPolicy {
        self.rounding
    }

    /// Same rounding policy with a different digit count.
    pub fn with_digits(self, digits: u32) -> Result<Self, SeriesError> {
        Self::new(digits, self.rounding)
    }
}

impl Default for Precision {
    fn default() -> Self {
        Self {
            digits: DEFAULT_PRECISION_DIGITS,
            rounding: RoundingPolicy::Down,
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} digits ({})", self.digits, self.rounding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_precision() {
        let p = Precision::default();
        assert_eq!(p.digits(), 20);
        assert_eq!(p.rounding(), RoundingPolicy::Down);
    }

    #[test]
    fn zero_digits_rejected() {
        assert!(matches!(
            Precision::new(0, RoundingPolicy::HalfUp),
            Err(SeriesError::InvalidArgument(_))
        ));
    }

    #[test]
    fn with_digits_keeps_rounding() {
        let p = Precision::new(10, RoundingPolicy::HalfEven).unwrap();
        let q = p.with_digits(40).unwrap();
        assert_eq!(q.digits(), 40);
        assert_eq!(q.rounding(), RoundingPolicy::HalfEven);
        assert!(p.with_digits(0).is_err());
    }

    #[test]
    fn rounding_policy_parse() {
        assert_eq!("down".parse::<RoundingPolicy>().unwrap(), RoundingPolicy::Down);
        assert_eq!("truncate".parse::<RoundingPolicy>().unwrap(), RoundingPolicy::Down);
        assert_eq!("HALF-UP".parse::<RoundingPolicy>().unwrap(), RoundingPolicy::HalfUp);
        assert_eq!("half_even".parse::<RoundingPolicy>().unwrap(), RoundingPolicy::HalfEven);
        assert!("ceiling".parse::<RoundingPolicy>().is_err());
    }

    #[test]
    fn rounding_policy_display_roundtrip() {
        for policy in RoundingPolicy::ALL {
            assert_eq!(policy.to_string().parse::<RoundingPolicy>().unwrap(), policy);
        }
    }

    #[test]
    fn precision_display() {
        let p = Precision::new(30, RoundingPolicy::HalfUp).unwrap();
        assert_eq!(p.to_string(), "30 digits (half-up)");
    }
}
