//! Arbitrary-precision decimal values.
//!
//! A [`Decimal`] is an unscaled `BigInt` mantissa paired with a base-10
//! scale; the represented value is `mantissa × 10^-scale`. Addition,
//! subtraction and multiplication are exact. Division and square roots
//! produce exactly the number of significant digits requested by a
//! [`Precision`], rounded with its [`RoundingPolicy`].

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};
use std::str::FromStr;

use num_bigint::{BigInt, BigUint, Sign};
use num_integer::Integer;
use num_traits::{Pow, Signed, Zero};
use serde::{Serialize, Serializer};

use crate::calculator::SeriesError;
use crate::precision::{Precision, RoundingPolicy};

/// Arbitrary-precision decimal number.
///
/// # Example
/// ```
/// use picalc_core::decimal::Decimal;
/// use picalc_core::precision::{Precision, RoundingPolicy};
///
/// let third = Decimal::from(1u32)
///     .div(&Decimal::from(3u32), Precision::new(5, RoundingPolicy::Down).unwrap())
///     .unwrap();
/// assert_eq!(third.to_string(), "0.33333");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Decimal {
    mantissa: BigInt,
    scale: i64,
}

/// `10^exp` as an unsigned big integer.
fn pow10(exp: u64) -> BigUint {
    Pow::pow(BigUint::from(10u32), exp)
}

/// Number of decimal digits of `value` (zero has one digit).
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub(crate) fn digit_count(value: &BigUint) -> u64 {
    if value.is_zero() {
        return 1;
    }
    let bits = value.bits();
    let mut digits = ((bits - 1) as f64 * std::f64::consts::LOG10_2) as u64 + 1;
    // The float estimate can be off by one near powers of ten.
    while digits > 1 && *value < pow10(digits - 1) {
        digits -= 1;
    }
    while *value >= pow10(digits) {
        digits += 1;
    }
    digits
}

#[allow(clippy::cast_possible_wrap)]
fn as_scale(digits: u64) -> i64 {
    digits as i64
}

/// Round `sign × magnitude × 10^-scale` to the digit count of `precision`.
///
/// `sticky` records that nonzero digits were already discarded below
/// `magnitude`; callers producing inexact magnitudes keep at least one
/// digit beyond the target so the tie test stays exact.
fn round_magnitude(
    sign: Sign,
    magnitude: BigUint,
    scale: i64,
    sticky: bool,
    precision: Precision,
) -> Decimal {
    let target = u64::from(precision.digits());
    let digits = digit_count(&magnitude);
    if digits <= target {
        return Decimal {
            mantissa: BigInt::from_biguint(sign, magnitude),
            scale,
        };
    }

    let dropped = digits - target;
    let divisor = pow10(dropped);
    let (mut kept, rest) = magnitude.div_rem(&divisor);
    let half = &divisor >> 1u32;
    let position = match rest.cmp(&half) {
        Ordering::Equal if sticky => Ordering::Greater,
        other => other,
    };
    let round_up = match precision.rounding() {
        RoundingPolicy::Down => false,
        RoundingPolicy::HalfUp => position != Ordering::Less,
        RoundingPolicy::HalfEven => {
            position == Ordering::Greater || (position == Ordering::Equal && kept.is_odd())
        }
    };

    let mut scale = scale - as_scale(dropped);
    if round_up {
        kept += 1u32;
        // 999 -> 1000 gains a digit; the new last digit is always zero.
        if digit_count(&kept) > target {
            kept /= 10u32;
            scale -= 1;
        }
    }
    Decimal {
        mantissa: BigInt::from_biguint(sign, kept),
        scale,
    }
}

impl Decimal {
    /// Build a decimal from its unscaled mantissa and scale.
    #[must_use]
    pub fn new(mantissa: BigInt, scale: i64) -> Self {
        Self { mantissa, scale }
    }

    /// Additive identity.
    #[must_use]
    pub fn zero() -> Self {
        Self::default()
    }

    /// Multiplicative identity.
    #[must_use]
    pub fn one() -> Self {
        Self::from(1u32)
    }

    /// Unscaled mantissa.
    #[must_use]
    pub fn mantissa(&self) -> &BigInt {
        &self.mantissa
    }

    /// Base-10 scale: the value is `mantissa × 10^-scale`.
    #[must_use]
    pub fn scale(&self) -> i64 {
        self.scale
    }

    /// Whether the value is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.mantissa.is_zero()
    }

    /// Whether the value is strictly negative.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.mantissa.is_negative()
    }

    /// Absolute value.
    #[must_use]
    pub fn abs(&self) -> Self {
        Self {
            mantissa: self.mantissa.abs(),
            scale: self.scale,
        }
    }

    /// Number of significant digits in the mantissa.
    #[must_use]
    pub fn significant_digits(&self) -> u64 {
        digit_count(self.mantissa.magnitude())
    }

    /// Mantissas of `self` and `other` rescaled to their common (larger) scale.
    fn aligned(&self, other: &Self) -> (BigInt, BigInt, i64) {
        match self.scale.cmp(&other.scale) {
            Ordering::Equal => (self.mantissa.clone(), other.mantissa.clone(), self.scale),
            Ordering::Greater => {
                let shift = pow10(self.scale.abs_diff(other.scale));
                (
                    self.mantissa.clone(),
                    &other.mantissa * BigInt::from(shift),
                    self.scale,
                )
            }
            Ordering::Less => {
                let shift = pow10(self.scale.abs_diff(other.scale));
                (
                    &self.mantissa * BigInt::from(shift),
                    other.mantissa.clone(),
                    other.scale,
                )
            }
        }
    }

    /// Exact integer power.
    #[must_use]
    pub fn pow(&self, exponent: u32) -> Self {
        Self {
            mantissa: Pow::pow(&self.mantissa, exponent),
            scale: self.scale * i64::from(exponent),
        }
    }

    /// Round to the digit count of `precision`.
    #[must_use]
    pub fn round(&self, precision: Precision) -> Self {
        round_magnitude(
            self.mantissa.sign(),
            self.mantissa.magnitude().clone(),
            self.scale,
            false,
            precision,
        )
    }

    /// Quotient `self / divisor` with `precision` significant digits.
    ///
    /// Fails with [`SeriesError::ComputationFailed`] on division by zero.
    pub fn div(&self, divisor: &Decimal, precision: Precision) -> Result<Self, SeriesError> {
        if divisor.is_zero() {
            return Err(SeriesError::ComputationFailed("division by zero".into()));
        }
        if self.is_zero() {
            return Ok(Self::zero());
        }

        let sign = if self.mantissa.sign() == divisor.mantissa.sign() {
            Sign::Plus
        } else {
            Sign::Minus
        };
        let numerator = self.mantissa.magnitude();
        let denominator = divisor.mantissa.magnitude();

        // Shift so the integer quotient carries at least digits + 1 digits.
        let target = u64::from(precision.digits()) + 1;
        let shift = as_scale(target + digit_count(denominator)) - as_scale(digit_count(numerator));
        let (quotient, remainder) = if shift >= 0 {
            (numerator * pow10(shift.unsigned_abs())).div_rem(denominator)
        } else {
            numerator.div_rem(&(denominator * pow10(shift.unsigned_abs())))
        };

        Ok(round_magnitude(
            sign,
            quotient,
            self.scale - divisor.scale + shift,
            !remainder.is_zero(),
            precision,
        ))
    }

    /// Square root with `precision` significant digits.
    ///
    /// Fails with [`SeriesError::ComputationFailed`] for negative input.
    pub fn sqrt(&self, precision: Precision) -> Result<Self, SeriesError> {
        if self.is_negative() {
            return Err(SeriesError::ComputationFailed(format!(
                "square root of negative value {self}"
            )));
        }
        if self.is_zero() {
            return Ok(Self::zero());
        }

        let mut radicand = self.mantissa.magnitude().clone();
        let mut scale = self.scale;
        if scale.rem_euclid(2) == 1 {
            radicand *= 10u32;
            scale += 1;
        }

        // An integer root of digits + 1 digits needs a radicand of 2 * (digits + 1).
        let needed = 2 * (u64::from(precision.digits()) + 1);
        let have = digit_count(&radicand);
        if have < needed {
            let pad = (needed - have).div_ceil(2);
            radicand *= pow10(2 * pad);
            scale += 2 * as_scale(pad);
        }

        let root = radicand.sqrt();
        let sticky = &root * &root != radicand;
        Ok(round_magnitude(Sign::Plus, root, scale / 2, sticky, precision))
    }

    /// Same value with trailing zeros removed from the mantissa.
    #[must_use]
    pub fn strip_trailing_zeros(&self) -> Self {
        if self.is_zero() {
            return Self::zero();
        }
        let ten = BigInt::from(10u32);
        let mut mantissa = self.mantissa.clone();
        let mut scale = self.scale;
        loop {
            let (quotient, remainder) = mantissa.div_rem(&ten);
            if !remainder.is_zero() {
                break;
            }
            mantissa = quotient;
            scale -= 1;
        }
        Self { mantissa, scale }
    }
}

impl From<BigInt> for Decimal {
    fn from(mantissa: BigInt) -> Self {
        Self { mantissa, scale: 0 }
    }
}

impl From<BigUint> for Decimal {
    fn from(value: BigUint) -> Self {
        Self::from(BigInt::from(value))
    }
}

impl From<i64> for Decimal {
    fn from(value: i64) -> Self {
        Self::from(BigInt::from(value))
    }
}

impl From<u64> for Decimal {
    fn from(value: u64) -> Self {
        Self::from(BigInt::from(value))
    }
}

impl From<u32> for Decimal {
    fn from(value: u32) -> Self {
        Self::from(BigInt::from(value))
    }
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Decimal {}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.scale == other.scale {
            return self.mantissa.cmp(&other.mantissa);
        }
        let (lhs, rhs, _) = self.aligned(other);
        lhs.cmp(&rhs)
    }
}

impl Add<&Decimal> for &Decimal {
    type Output = Decimal;

    fn add(self, rhs: &Decimal) -> Decimal {
        let (lhs, rhs, scale) = self.aligned(rhs);
        Decimal {
            mantissa: lhs + rhs,
            scale,
        }
    }
}

impl Add for Decimal {
    type Output = Decimal;

    fn add(self, rhs: Decimal) -> Decimal {
        &self + &rhs
    }
}

impl Sub<&Decimal> for &Decimal {
    type Output = Decimal;

    fn sub(self, rhs: &Decimal) -> Decimal {
        let (lhs, rhs, scale) = self.aligned(rhs);
        Decimal {
            mantissa: lhs - rhs,
            scale,
        }
    }
}

impl Sub for Decimal {
    type Output = Decimal;

    fn sub(self, rhs: Decimal) -> Decimal {
        &self - &rhs
    }
}

impl Mul<&Decimal> for &Decimal {
    type Output = Decimal;

    fn mul(self, rhs: &Decimal) -> Decimal {
        Decimal {
            mantissa: &self.mantissa * &rhs.mantissa,
            scale: self.scale + rhs.scale,
        }
    }
}

impl Mul for Decimal {
    type Output = Decimal;

    fn mul(self, rhs: Decimal) -> Decimal {
        &self * &rhs
    }
}

impl Neg for Decimal {
    type Output = Decimal;

    fn neg(self) -> Decimal {
        Decimal {
            mantissa: -self.mantissa,
            scale: self.scale,
        }
    }
}

impl fmt::Display for Decimal {
    #[allow(clippy::cast_possible_truncation)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.mantissa.magnitude().to_string();
        if self.is_negative() {
            f.write_str("-")?;
        }
        if self.scale <= 0 {
            f.write_str(&digits)?;
            if !self.is_zero() {
                for _ in 0..self.scale.unsigned_abs() {
                    f.write_str("0")?;
                }
            }
            return Ok(());
        }

        let scale = self.scale.unsigned_abs() as usize;
        if digits.len() > scale {
            let (int_part, frac_part) = digits.split_at(digits.len() - scale);
            write!(f, "{int_part}.{frac_part}")
        } else {
            write!(f, "0.{}{digits}", "0".repeat(scale - digits.len()))
        }
    }
}

impl FromStr for Decimal {
    type Err = SeriesError;

    /// Parse plain decimal notation such as `-3.1415` or `42`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SeriesError::InvalidArgument(format!("invalid decimal literal: {s:?}"));
        let trimmed = s.trim();
        let (negative, body) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };
        let (int_part, frac_part) = body.split_once('.').unwrap_or((body, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        if !int_part.chars().chain(frac_part.chars()).all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let digits = format!("{int_part}{frac_part}");
        let magnitude = BigUint::parse_bytes(digits.as_bytes(), 10).ok_or_else(invalid)?;
        let sign = if negative { Sign::Minus } else { Sign::Plus };
        let scale = i64::try_from(frac_part.len()).map_err(|_| invalid())?;
        Ok(Self {
            mantissa: BigInt::from_biguint(sign, magnitude),
            scale,
        })
    }
}

impl Serialize for Decimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
