//! Shared fixtures for the workspace integration tests.

/// Pi to 200 decimal places.
pub const PI_DIGITS: &str = "3.14159265358979323846264338327950288419716939937510582097494459230781640628620899862803482534211706798214808651328230664709384460955058223172535940812848111745028410270193852110555964462294895493038196";

/// [`PI_DIGITS`] truncated to `digits` significant digits.
///
/// # Panics
/// When `digits` is zero or exceeds the reference.
#[must_use]
pub fn pi_truncated(digits: usize) -> &'static str {
    assert!(digits > 0 && digits < PI_DIGITS.len(), "no reference for {digits} digits");
    if digits == 1 {
        "3"
    } else {
        &PI_DIGITS[..=digits]
    }
}
