//! Application entry point and dispatch.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use picalc_cli::output::{write_to_file, RunReport};
use picalc_cli::{ui, CLIProgressReporter, CLIResultPresenter};
use picalc_core::calculator::SeriesError;
use picalc_core::constants::exit_codes;
use picalc_core::observers::LoggingListener;
use picalc_core::progress::CancellationToken;
use picalc_core::registry::DefaultFactory;
use picalc_core::task::Executor;
use picalc_orchestration::calculator_selection::get_calculators_to_run;
use picalc_orchestration::interfaces::{
    CalculationResult, NullProgressReporter, ProgressReporter, ResultPresenter,
};
use picalc_orchestration::orchestrator::{analyze_comparison_results, execute_calculations};

use crate::config::AppConfig;
use crate::errors::run_exit_code;

/// Run the application and return the process exit code.
pub fn run(config: &AppConfig) -> Result<i32> {
    if let Some(shell) = config.completion {
        let mut cmd = <AppConfig as clap::CommandFactory>::command();
        picalc_cli::completion::generate_completion(&mut cmd, shell, &mut std::io::stdout());
        return Ok(exit_codes::SUCCESS);
    }

    let cancel = CancellationToken::new();
    install_ctrlc_handler(cancel.clone());
    run_with_token(config, &cancel)
}

/// Run the calculations `config` asks for under `cancel`.
pub fn run_with_token(config: &AppConfig, cancel: &CancellationToken) -> Result<i32> {
    let request = config.request()?;
    let factory = DefaultFactory::new(Executor::new(config.threads)?);
    let calculators = get_calculators_to_run(&config.formula, &factory)?;

    if config.verbose {
        let logger: Arc<LoggingListener> = Arc::new(LoggingListener::default());
        for calc in &calculators {
            calc.add_listener(Arc::clone(&logger) as _);
        }
    }

    let reporter: Box<dyn ProgressReporter> = if config.progress && !config.quiet && !config.json
    {
        Box::new(CLIProgressReporter::new())
    } else {
        Box::new(NullProgressReporter)
    };

    info!(
        formula = %config.formula,
        threads = factory.executor().num_threads(),
        "starting run"
    );
    let results = execute_calculations(&calculators, &request, cancel, reporter.as_ref());
    let comparison = (results.len() > 1).then(|| analyze_comparison_results(&results));

    if config.json {
        let report = RunReport::new(&results, comparison.as_ref().map(Result::is_ok));
        println!("{}", report.to_json()?);
    } else {
        present(config, &results, comparison.as_ref());
    }

    if let Some(path) = &config.output {
        if let Some(value) = results.iter().find_map(|r| r.outcome.as_ref().ok()) {
            write_to_file(path, value)
                .with_context(|| format!("writing result to {}", path.display()))?;
        }
    }

    Ok(run_exit_code(&results, comparison.as_ref()))
}

fn present(
    config: &AppConfig,
    results: &[CalculationResult],
    comparison: Option<&Result<(), SeriesError>>,
) {
    let presenter = CLIResultPresenter::new(config.verbose, config.quiet);
    for result in results {
        presenter.present_result(result, config.details);
    }

    if results.len() > 1 {
        presenter.present_comparison(results);
    }

    match comparison {
        Some(Ok(())) if !config.quiet => ui::print_success("all formulas agree"),
        Some(Err(e)) => presenter.present_error(&e.to_string()),
        _ => {}
    }
}

fn install_ctrlc_handler(cancel: CancellationToken) {
    if let Err(e) = ctrlc::set_handler(move || cancel.cancel()) {
        warn!(error = %e, "Ctrl+C handler not installed");
    }
}
