//! Series constants and engine defaults.

/// Significant digits used when the caller does not pass a precision.
pub const DEFAULT_PRECISION_DIGITS: u32 = 20;

/// Extra digits carried by [`crate::pi`] before the final rounding.
pub const GUARD_DIGITS: u32 = 10;

/// Linear coefficient of the Chudnovsky nominator: `545140134k + 13591409`.
pub const CHUDNOVSKY_LINEAR: u64 = 545_140_134;

/// Constant offset of the Chudnovsky nominator.
pub const CHUDNOVSKY_OFFSET: u64 = 13_591_409;

/// Base of the alternating power in the Chudnovsky denominator (`-640320^3`).
pub const CHUDNOVSKY_POWER_BASE: i64 = -262_537_412_640_768_000;

/// Argument of the square root in the Chudnovsky constant.
pub const CHUDNOVSKY_SQRT_ARGUMENT: u32 = 10_005;

/// Multiplier of the square root in the Chudnovsky constant.
pub const CHUDNOVSKY_MULTIPLIER: u32 = 426_880;

/// Ratio of successive Chudnovsky terms; `log10` of it is the digit gain.
pub const CHUDNOVSKY_TERM_RATIO: f64 = 151_931_373_056_000.0;

/// Base of the BBP power term `1/16^k`.
pub const BBP_BASE: u32 = 16;

/// Minimum interval between two log lines of the logging listener.
pub const DEFAULT_LOG_INTERVAL_MS: u64 = 250;

/// Process exit codes used by the `picalc` binary.
pub mod exit_codes {
    /// Successful execution.
    pub const SUCCESS: i32 = 0;
    /// Generic or numeric failure.
    pub const ERROR_GENERIC: i32 = 1;
    /// Computation timed out.
    pub const ERROR_TIMEOUT: i32 = 2;
    /// Formulas disagreed during cross-validation.
    pub const ERROR_MISMATCH: i32 = 3;
    /// Invalid configuration or argument.
    pub const ERROR_CONFIG: i32 = 4;
    /// Computation cancelled by user (Ctrl+C).
    pub const ERROR_CANCELED: i32 = 130;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chudnovsky_power_base_is_negative_cube() {
        assert_eq!(CHUDNOVSKY_POWER_BASE, -(640_320i64.pow(3)));
    }

    #[test]
    fn chudnovsky_multiplier_matches_constant() {
        // 426880 * sqrt(10005) == 640320^1.5 / 12
        let lhs = f64::from(CHUDNOVSKY_MULTIPLIER) * f64::from(CHUDNOVSKY_SQRT_ARGUMENT).sqrt();
        let rhs = 640_320f64.powf(1.5) / 12.0;
        assert!((lhs - rhs).abs() / rhs < 1e-12);
    }

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [
            exit_codes::SUCCESS,
            exit_codes::ERROR_GENERIC,
            exit_codes::ERROR_TIMEOUT,
            exit_codes::ERROR_MISMATCH,
            exit_codes::ERROR_CONFIG,
            exit_codes::ERROR_CANCELED,
        ];
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
