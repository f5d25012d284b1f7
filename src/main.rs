use anyhow::Result;
use clap::Parser;
use permtest::builder::FailurePolicy;
use permtest::cli::{Cli, OutputFormat, RegType};
use permtest::error::PermTestError;
use permtest::runner::{self, PermTestConfig};
use permtest::spec::{RegressionKind, RegressionSpec};
use permtest::table::DataTable;
use permtest::{report, winsor};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Print the result as a formatted text block
fn print_text_result(result: &permtest::PermutationTestResult) {
    println!("=== Permutation Test ===");
    println!("Variable:          {}", result.variable);
    println!("Observed coef:     {:.6}", result.observed_coefficient);
    println!("Observed t:        {:.6}", result.observed_t);
    println!("Permutations:      {}", result.n_perms);
    println!("p-value:           {:.6}", result.p_value);
    println!("p-value floor:     {:.6}", result.p_value_floor);
    if result.p_value == 0.0 {
        println!(
            "Note: no null statistic reached |t| = {:.4}; the true p-value \
             is below the floor, not zero",
            result.observed_t.abs()
        );
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    // The library takes an unsigned worker count; reject negatives here
    if cli.workers < 0 {
        return Err(PermTestError::InvalidArgument(format!(
            "n_workers must be non-negative, got {}",
            cli.workers
        ))
        .into());
    }
    let workers = cli.workers as usize;

    let mut table = DataTable::from_csv(&cli.data)?;

    if cli.winsorize {
        let outliers = winsor::detect_outliers(&table, cli.mad_threshold)?;
        eprintln!(
            "Winsorized {} value(s) beyond {} MADs from the median",
            outliers.n_outliers, cli.mad_threshold
        );
        table = outliers.winsorized;
    }

    let spec = RegressionSpec::from_formula(&cli.formula, &cli.variable)?;

    let kind = match cli.reg_type {
        RegType::Ols => RegressionKind::Ols,
        RegType::Robust => RegressionKind::Robust,
    };
    let policy = if cli.lenient {
        FailurePolicy::Lenient
    } else {
        FailurePolicy::FailFast
    };

    let mut config = PermTestConfig::new(spec)
        .with_n_perms(cli.n_perms)
        .with_kind(kind)
        .with_workers(workers)
        .with_policy(policy);
    if let Some(seed) = cli.seed {
        config = config.with_seed(seed);
    }

    let result = runner::run(&config, &table)?;

    if cli.histogram {
        report::report_best_effort(&result.null_statistics, result.observed_t);
    }

    match cli.format {
        OutputFormat::Text => print_text_result(&result),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
    }

    Ok(())
}
