//! picalc: concurrent arbitrary-precision calculator for pi.

use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use picalc_cli::ui;
use picalc_core::constants::exit_codes;
use picalc_lib::{app, config::AppConfig, errors};

fn main() {
    let config = match AppConfig::try_parse() {
        Ok(config) => config,
        Err(e) => {
            let code = if e.use_stderr() {
                exit_codes::ERROR_CONFIG
            } else {
                exit_codes::SUCCESS
            };
            let _ = e.print();
            process::exit(code);
        }
    };

    // RUST_LOG wins over -v.
    let default_level = if config.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let code = match app::run(&config) {
        Ok(code) => code,
        Err(err) => {
            ui::print_error(&format!("{err:#}"));
            errors::exit_code(&err)
        }
    };
    process::exit(code);
}
