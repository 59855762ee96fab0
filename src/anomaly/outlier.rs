use crate::config::LargeOutlierConfig;
use crate::ingest::Transaction;

use super::group::currency;
use super::types::{AnomalyKind, Finding, Severity};

/// Order statistics over a set of amounts, taken at floor(n * p).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quartiles {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
}

impl Quartiles {
    pub fn from_amounts(amounts: &[f64]) -> Option<Self> {
        if amounts.is_empty() {
            return None;
        }
        let mut sorted = amounts.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let n = sorted.len();
        let at = |p: f64| sorted[((n as f64 * p).floor() as usize).min(n - 1)];
        Some(Self {
            q1: at(0.25),
            median: sorted[n / 2],
            q3: at(0.75),
        })
    }

    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }

    pub fn upper_fence(&self, multiplier: f64) -> f64 {
        self.q3 + multiplier * self.iqr()
    }
}

/// Individual payments far above the IQR fence. The largest come first.
pub fn check_large_outliers(
    transactions: &[Transaction],
    config: &LargeOutlierConfig,
) -> Vec<Finding> {
    let amounts: Vec<f64> = transactions.iter().map(|t| t.amount).collect();
    let Some(quartiles) = Quartiles::from_amounts(&amounts) else {
        return Vec::new();
    };
    let fence = quartiles.upper_fence(config.fence_multiplier);

    let mut outliers: Vec<&Transaction> = transactions
        .iter()
        .filter(|t| t.amount > fence && t.amount > config.min_amount)
        .collect();
    outliers.sort_by(|a, b| b.amount.total_cmp(&a.amount));
    outliers.truncate(config.max_results);

    outliers
        .into_iter()
        .map(|t| {
            let severity = if t.amount > config.critical_amount {
                Severity::Critical
            } else {
                Severity::High
            };
            let versus_median = if quartiles.median > 0.0 {
                format!(
                    "{:.0}x the median payment of {}",
                    (t.amount / quartiles.median).round(),
                    currency(quartiles.median)
                )
            } else {
                "Median payment is $0".to_string()
            };

            let mut details = vec![
                format!("Amount: {}", currency(t.amount)),
                versus_median,
                format!("Outlier fence (Q3 + {}x IQR): {}", config.fence_multiplier, currency(fence)),
                format!("Department: {}", t.department),
            ];
            if let Some(date) = t.date {
                details.push(format!("Date: {}", date.format("%Y-%m-%d")));
            }
            if let Some(description) = &t.description {
                details.push(format!("Description: {}", description));
            }

            Finding::new(
                AnomalyKind::LargeOutlier,
                severity,
                format!("Unusually large payment to {}", t.vendor),
                format!(
                    "A single payment of {} to {} is far above typical payment sizes",
                    currency(t.amount),
                    t.vendor
                ),
            )
            .vendor(&t.vendor)
            .department(&t.department)
            .amount(t.amount)
            .count(1)
            .details(details)
            .tips([
                "Confirm the payment was authorized at the appropriate level",
                "Match the payment to a contract, board approval or emergency declaration",
                "Check for a data-entry error such as a misplaced decimal point",
            ])
        })
        .collect()
}
