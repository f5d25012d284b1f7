//! CLI argument parsing for permtest

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Regression backend used for the observed fit and every refit
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RegType {
    /// Ordinary least squares (default)
    Ols,
    /// Huber M-estimation (robust to heavy-tailed residuals)
    Robust,
}

/// Output format for the test result
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "permtest")]
#[command(version)]
#[command(
    about = "Permutation significance test for a partial regression coefficient",
    long_about = None
)]
pub struct Cli {
    /// CSV file with a header row; every cell must be numeric
    #[arg(short, long, value_name = "FILE")]
    pub data: PathBuf,

    /// Model formula, e.g. "y ~ x1 + x2 + x3"
    #[arg(short, long, value_name = "FORMULA")]
    pub formula: String,

    /// Predictor whose coefficient is under test
    #[arg(short, long = "var", value_name = "NAME")]
    pub variable: String,

    /// Number of permutations for the null distribution
    #[arg(short, long = "n-perms", value_name = "N", default_value = "5000")]
    pub n_perms: usize,

    /// Regression backend
    #[arg(long = "reg-type", value_enum, default_value = "ols")]
    pub reg_type: RegType,

    /// Worker threads for the refit loop (0 = serial)
    #[arg(
        short,
        long,
        value_name = "N",
        default_value = "0",
        allow_hyphen_values = true
    )]
    pub workers: i64,

    /// RNG seed for reproducible permutations
    #[arg(short, long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Drop failed refits instead of failing the whole run
    #[arg(long)]
    pub lenient: bool,

    /// Draw a text histogram of the null distribution to stderr
    #[arg(long)]
    pub histogram: bool,

    /// Winsorize the data (MAD criterion) before testing
    #[arg(long)]
    pub winsorize: bool,

    /// Rejection threshold for --winsorize, in MADs from the median
    #[arg(long = "mad-threshold", value_name = "T", default_value = "2.5")]
    pub mad_threshold: f64,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Enable debug logging to stderr
    #[arg(long)]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_required_args() {
        let cli = Cli::parse_from([
            "permtest",
            "--data",
            "table.csv",
            "--formula",
            "y ~ x1 + x2",
            "--var",
            "x1",
        ]);
        assert_eq!(cli.data, PathBuf::from("table.csv"));
        assert_eq!(cli.formula, "y ~ x1 + x2");
        assert_eq!(cli.variable, "x1");
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from([
            "permtest", "--data", "t.csv", "--formula", "y ~ x1", "--var", "x1",
        ]);
        assert_eq!(cli.n_perms, 5000);
        assert_eq!(cli.workers, 0);
        assert!(matches!(cli.reg_type, RegType::Ols));
        assert!(matches!(cli.format, OutputFormat::Text));
        assert!(cli.seed.is_none());
        assert!(!cli.lenient);
        assert!(!cli.winsorize);
        assert_eq!(cli.mad_threshold, 2.5);
    }

    #[test]
    fn test_cli_accepts_negative_workers_for_later_validation() {
        let cli = Cli::parse_from([
            "permtest",
            "--data",
            "t.csv",
            "--formula",
            "y ~ x1",
            "--var",
            "x1",
            "--workers",
            "-1",
        ]);
        assert_eq!(cli.workers, -1);
    }

    #[test]
    fn test_cli_robust_and_json() {
        let cli = Cli::parse_from([
            "permtest",
            "--data",
            "t.csv",
            "--formula",
            "y ~ x1",
            "--var",
            "x1",
            "--reg-type",
            "robust",
            "--format",
            "json",
            "--seed",
            "42",
        ]);
        assert!(matches!(cli.reg_type, RegType::Robust));
        assert!(matches!(cli.format, OutputFormat::Json));
        assert_eq!(cli.seed, Some(42));
    }
}
