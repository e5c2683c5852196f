//! Contingency tables, Fisher's exact test, and ranking scores.
//!
//! The significance test is the one-sided (greater) Fisher's exact test:
//! the hypergeometric tail probability of drawing at least the observed
//! co-occurrence count. It is evaluated in log space with log-factorials —
//! an exact prefix table for small arguments and a Stirling series beyond
//! it — so corpus sizes in the tens of millions neither overflow nor lose
//! the far tail to underflow.

use once_cell::sync::Lazy;

use litmine_core::defaults;

/// 2x2 contingency table for one term pair over a corpus snapshot.
///
/// Laid out as `[[ab, a_only], [b_only, neither]]`: documents with both
/// terms, with a only, with b only, and with neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContingencyTable {
    pub ab: u64,
    pub a_only: u64,
    pub b_only: u64,
    pub neither: u64,
}

impl ContingencyTable {
    /// Build the table from marginal counts.
    ///
    /// Saturating arithmetic keeps the table defined for degenerate inputs
    /// (`ab > a_count` cannot arise from real posting sets).
    pub fn from_counts(ab: u64, a_count: u64, b_count: u64, total: u64) -> Self {
        Self {
            ab,
            a_only: a_count.saturating_sub(ab),
            b_only: b_count.saturating_sub(ab),
            neither: (total + ab).saturating_sub(a_count + b_count),
        }
    }

    /// Documents containing the a-term.
    pub fn a_count(&self) -> u64 {
        self.ab + self.a_only
    }

    /// Documents containing the b-term.
    pub fn b_count(&self) -> u64 {
        self.ab + self.b_only
    }

    /// Corpus size behind the table.
    pub fn total(&self) -> u64 {
        self.ab + self.a_only + self.b_only + self.neither
    }
}

/// Exact log-factorials below this bound, Stirling series above it.
const EXACT_LN_FACTORIALS: usize = 1024;

static LN_FACTORIAL_TABLE: Lazy<Vec<f64>> = Lazy::new(|| {
    let mut table = Vec::with_capacity(EXACT_LN_FACTORIALS);
    let mut acc = 0.0f64;
    table.push(0.0);
    for n in 1..EXACT_LN_FACTORIALS {
        acc += (n as f64).ln();
        table.push(acc);
    }
    table
});

fn ln_factorial(n: u64) -> f64 {
    if (n as usize) < EXACT_LN_FACTORIALS {
        return LN_FACTORIAL_TABLE[n as usize];
    }
    // Stirling series; the truncation error at n >= 1024 is far below f64
    // rounding of the leading term.
    let x = n as f64;
    x * x.ln() - x + 0.5 * (2.0 * std::f64::consts::PI * x).ln() + 1.0 / (12.0 * x)
        - 1.0 / (360.0 * x.powi(3))
        + 1.0 / (1260.0 * x.powi(5))
}

/// log of the binomial coefficient C(n, k); negative infinity when the
/// coefficient is zero.
fn ln_choose(n: u64, k: u64) -> f64 {
    if k > n {
        return f64::NEG_INFINITY;
    }
    ln_factorial(n) - ln_factorial(k) - ln_factorial(n - k)
}

/// One-sided (greater) Fisher's exact test: the probability of observing at
/// least `ab` co-occurrences under the hypergeometric null.
///
/// Degenerate tables with an empty margin (`a_count == 0` or
/// `b_count == 0`) carry no evidence and are defined as p = 1.0, not an
/// error. The result is clamped into [0, 1].
pub fn fisher_exact_greater(table: &ContingencyTable) -> f64 {
    let a = table.a_count();
    let b = table.b_count();
    let n = table.total();
    if a == 0 || b == 0 {
        return 1.0;
    }

    let upper = a.min(b);
    let ln_denom = ln_choose(n, b);
    let mut p = 0.0f64;
    for k in table.ab..=upper {
        // infeasible terms contribute ln C = -inf, exp = 0
        let ln_term = ln_choose(a, k) + ln_choose(n - a, b - k) - ln_denom;
        p += ln_term.exp();
    }
    p.clamp(0.0, 1.0)
}

/// Fraction of b's documents that also mention a: `ab / b_count`, or 0 for
/// an empty b margin. Orders results when many pairs tie near p = 0.
pub fn sort_ratio(table: &ContingencyTable) -> f64 {
    let denom = table.b_count();
    if denom == 0 {
        return 0.0;
    }
    table.ab as f64 / denom as f64
}

/// Blend of significance and sort ratio into one comparable score.
///
/// Both components are capped at 323 (where f64 p-values underflow to
/// zero): `min(323, -log10 p)` plus `min(323, 2500 * -log10(1 - ratio))`,
/// normalized by 323. Monotonic in lower p-value and higher sort ratio.
pub fn prediction_score(pvalue: f64, sort_ratio: f64) -> f64 {
    let cap = defaults::FET_SCORE_CAP;

    let log_fet = if pvalue == 0.0 {
        cap
    } else {
        (-pvalue.log10()).min(cap)
    };

    let log_ratio = if sort_ratio >= 1.0 {
        cap
    } else {
        (-(1.0 - sort_ratio).log10() * defaults::SORT_RATIO_MULTIPLIER).min(cap)
    };

    let score = log_fet + log_ratio;
    if score == 0.0 {
        // normalize -0.0 for display
        return 0.0;
    }
    score / cap
}
