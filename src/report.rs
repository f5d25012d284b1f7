//! Diagnostic rendering of the null distribution
//!
//! Draws a text histogram of the null t-statistics with a marker on the bin
//! holding the observed statistic. This is a side channel for human eyes:
//! it is never load-bearing, and a render failure is logged and swallowed
//! so the statistical result still comes back.

use std::io::{self, Write};
use tracing::warn;

const DEFAULT_BINS: usize = 20;
const BAR_WIDTH: usize = 50;

/// Render a histogram of the null ensemble to any writer
pub fn render_histogram(
    out: &mut dyn Write,
    null_statistics: &[f64],
    observed: f64,
) -> io::Result<()> {
    if null_statistics.is_empty() {
        writeln!(out, "(empty null ensemble; nothing to draw)")?;
        return Ok(());
    }

    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for &t in null_statistics {
        lo = lo.min(t);
        hi = hi.max(t);
    }
    // Widen the range so the observed marker always lands in a bin
    lo = lo.min(observed);
    hi = hi.max(observed);
    if (hi - lo).abs() < f64::EPSILON {
        lo -= 0.5;
        hi += 0.5;
    }

    let n_bins = DEFAULT_BINS.min(null_statistics.len()).max(1);
    let bin_width = (hi - lo) / n_bins as f64;
    let mut counts = vec![0usize; n_bins];
    for &t in null_statistics {
        let mut bin = ((t - lo) / bin_width) as usize;
        if bin >= n_bins {
            bin = n_bins - 1;
        }
        counts[bin] += 1;
    }
    let observed_bin = (((observed - lo) / bin_width) as usize).min(n_bins - 1);
    let max_count = counts.iter().copied().max().unwrap_or(1).max(1);

    writeln!(out, "\n=== Null Distribution ({} fits) ===\n", null_statistics.len())?;
    for (i, &count) in counts.iter().enumerate() {
        let bin_lo = lo + i as f64 * bin_width;
        let bin_hi = bin_lo + bin_width;
        let bar_len = count * BAR_WIDTH / max_count;
        let marker = if i == observed_bin { "  <-- observed" } else { "" };
        writeln!(
            out,
            "[{:>8.3}, {:>8.3}) {:>5} |{:<width$}|{}",
            bin_lo,
            bin_hi,
            count,
            "#".repeat(bar_len),
            marker,
            width = BAR_WIDTH
        )?;
    }
    writeln!(out, "\nobserved t = {:.4}", observed)?;
    Ok(())
}

/// Render to stderr; failures are logged, never propagated
pub fn report_best_effort(null_statistics: &[f64], observed: f64) {
    let mut stderr = io::stderr();
    if let Err(err) = render_histogram(&mut stderr, null_statistics, observed) {
        warn!(error = %err, "diagnostic histogram could not be rendered");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_histogram_marks_observed_bin() {
        let null: Vec<f64> = (0..200).map(|i| (i as f64 - 100.0) / 25.0).collect();
        let mut buf = Vec::new();
        render_histogram(&mut buf, &null, 3.2).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("<-- observed"));
        assert!(text.contains("200 fits"));
        assert!(text.contains("observed t = 3.2000"));
    }

    #[test]
    fn test_histogram_counts_every_value() {
        let null = vec![-1.0, -0.5, 0.0, 0.5, 1.0, 1.0, 1.0];
        let mut buf = Vec::new();
        render_histogram(&mut buf, &null, 0.0).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let total: usize = text
            .lines()
            .filter(|l| l.starts_with('['))
            .map(|l| {
                l.split('|')
                    .next()
                    .unwrap()
                    .split_whitespace()
                    .last()
                    .unwrap()
                    .parse::<usize>()
                    .unwrap()
            })
            .sum();
        assert_eq!(total, 7);
    }

    #[test]
    fn test_empty_ensemble_renders_placeholder() {
        let mut buf = Vec::new();
        render_histogram(&mut buf, &[], 1.0).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("empty null ensemble"));
    }

    #[test]
    fn test_degenerate_range_does_not_panic() {
        let null = vec![2.0; 10];
        let mut buf = Vec::new();
        render_histogram(&mut buf, &null, 2.0).unwrap();
    }

    #[test]
    fn test_observed_outside_null_range() {
        let null = vec![-0.5, 0.0, 0.5];
        let mut buf = Vec::new();
        render_histogram(&mut buf, &null, 12.0).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("<-- observed"));
    }
}
