//! Command-line flags with `PICALC_*` environment fallbacks.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use picalc_core::calculator::SeriesError;
use picalc_core::precision::RoundingPolicy;
use picalc_orchestration::orchestrator::CalculationRequest;

/// Concurrent arbitrary-precision calculator for pi.
#[derive(Parser, Debug)]
#[command(name = "picalc", version, about)]
pub struct AppConfig {
    /// Series to evaluate: chudnovsky, bbp, or all.
    #[arg(long, default_value = "chudnovsky", env = "PICALC_FORMULA")]
    pub formula: String,

    /// Highest term index to sum (derived from --digits when absent).
    #[arg(
        short = 'n',
        long,
        env = "PICALC_ITERATIONS",
        allow_negative_numbers = true
    )]
    pub iterations: Option<i64>,

    /// Significant digits to report (derived from --iterations when absent).
    #[arg(short = 'D', long, env = "PICALC_DIGITS")]
    pub digits: Option<u32>,

    /// Rounding policy: down, half-up, or half-even.
    #[arg(long, default_value = "down", env = "PICALC_ROUNDING")]
    pub rounding: String,

    /// Worker threads (0 uses one per core).
    #[arg(long, default_value = "0", env = "PICALC_THREADS")]
    pub threads: usize,

    /// Timeout for the whole run (e.g. "30s", "5m", "none").
    #[arg(long, default_value = "5m", env = "PICALC_TIMEOUT")]
    pub timeout: String,

    /// Show a progress bar per formula.
    #[arg(long)]
    pub progress: bool,

    /// Verbose output and info-level logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Show detailed information.
    #[arg(short, long)]
    pub details: bool,

    /// Quiet mode (only output the value).
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print a JSON report instead of text.
    #[arg(long)]
    pub json: bool,

    /// Also write the value to this file.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Generate shell completion.
    #[arg(long, value_enum)]
    pub completion: Option<clap_complete::Shell>,
}

impl AppConfig {
    /// Rounding policy named by `--rounding`.
    pub fn rounding_policy(&self) -> Result<RoundingPolicy, SeriesError> {
        self.rounding.parse()
    }

    /// Timeout named by `--timeout`; `None` when disabled.
    pub fn timeout_duration(&self) -> Result<Option<Duration>, SeriesError> {
        let raw = self.timeout.trim();
        if raw.eq_ignore_ascii_case("none") {
            return Ok(None);
        }
        match parse_duration(raw) {
            Some(d) if d.is_zero() => Ok(None),
            Some(d) => Ok(Some(d)),
            None => Err(SeriesError::Config(format!("invalid timeout: {raw}"))),
        }
    }

    /// The calculation request these flags describe.
    pub fn request(&self) -> Result<CalculationRequest, SeriesError> {
        Ok(CalculationRequest {
            iterations: self.iterations,
            digits: self.digits,
            rounding: self.rounding_policy()?,
            timeout: self.timeout_duration()?,
        })
    }
}

/// Parse a duration like "250ms", "30s", "5m" or "1h". A bare number is seconds.
fn parse_duration(s: &str) -> Option<Duration> {
    let (number, unit) = match s.find(|c: char| !c.is_ascii_digit()) {
        Some(at) => s.split_at(at),
        None => (s, "s"),
    };
    let n: u64 = number.parse().ok()?;
    match unit {
        "ms" => Some(Duration::from_millis(n)),
        "s" => Some(Duration::from_secs(n)),
        "m" => n.checked_mul(60).map(Duration::from_secs),
        "h" => n.checked_mul(3600).map(Duration::from_secs),
        _ => None,
    }
}
