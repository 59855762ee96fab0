use crate::config::{
    DigitDistributionConfig, DuplicatePaymentConfig, RoundNumberConfig, ThresholdAvoidanceConfig,
};
use crate::ingest::Transaction;

use super::group::{by_vendor, currency, day_span, group_by, percent, vendor_counts};
use super::types::{AnomalyKind, Finding, Severity};

/// Expected first-digit frequencies under Benford's law, indexed by digit - 1.
pub const BENFORD_EXPECTED: [f64; 9] = [0.301, 0.176, 0.125, 0.097, 0.079, 0.067, 0.058, 0.051, 0.046];

/// Leading digit (1-9) of the integer part of `amount`. Amounts below 1 have none.
pub fn leading_digit(amount: f64) -> Option<u8> {
    if !amount.is_finite() {
        return None;
    }
    let whole = amount.abs().trunc() as u64;
    let first = whole.to_string().chars().next()?;
    match first.to_digit(10) {
        Some(d) if d >= 1 => Some(d as u8),
        _ => None,
    }
}

struct DigitDeviation {
    digit: u8,
    expected: f64,
    observed: f64,
}

impl DigitDeviation {
    fn magnitude(&self) -> f64 {
        (self.observed - self.expected).abs()
    }
}

/// Compare the leading-digit distribution of larger payments against Benford's law.
pub fn check_digit_distribution(
    transactions: &[Transaction],
    config: &DigitDistributionConfig,
) -> Vec<Finding> {
    let digits: Vec<u8> = transactions
        .iter()
        .filter(|t| t.amount >= config.min_amount)
        .filter_map(|t| leading_digit(t.amount))
        .collect();

    if digits.len() < config.min_sample {
        return Vec::new();
    }

    let mut counts = [0usize; 9];
    for d in &digits {
        counts[(*d - 1) as usize] += 1;
    }
    let sample = digits.len() as f64;

    let mut deviations: Vec<DigitDeviation> = BENFORD_EXPECTED
        .iter()
        .enumerate()
        .map(|(i, &expected)| DigitDeviation {
            digit: i as u8 + 1,
            expected,
            observed: counts[i] as f64 / sample,
        })
        .filter(|d| d.magnitude() > config.flag_deviation)
        .collect();

    if deviations.is_empty() {
        return Vec::new();
    }

    let severity = if deviations.iter().any(|d| d.magnitude() > config.high_deviation) {
        Severity::High
    } else {
        Severity::Medium
    };

    deviations.sort_by(|a, b| b.magnitude().total_cmp(&a.magnitude()));
    deviations.truncate(3);

    let mut details = vec![format!("Sample size: {} transactions", digits.len())];
    details.extend(deviations.iter().map(|d| {
        let delta = (d.observed - d.expected) * 100.0;
        format!(
            "Digit {}: expected {}, actual {} ({}{:.1} pts)",
            d.digit,
            percent(d.expected * 100.0),
            percent(d.observed * 100.0),
            if delta >= 0.0 { "+" } else { "" },
            delta
        )
    }));

    let flagged: Vec<String> = deviations.iter().map(|d| d.digit.to_string()).collect();

    vec![Finding::new(
        AnomalyKind::DigitDistribution,
        severity,
        "Unusual leading-digit distribution",
        format!(
            "Leading digits of {} payments deviate from Benford's law (digits {})",
            digits.len(),
            flagged.join(", ")
        ),
    )
    .count(digits.len())
    .details(details)
    .tips([
        "Natural spending data follows Benford's law; large deviations can indicate fabricated amounts",
        "Look for amounts set just under approval limits",
        "Compare against prior fiscal years for the same departments",
    ])]
}

/// Same vendor paid the same exact amount several times.
pub fn check_duplicate_payments(
    transactions: &[Transaction],
    config: &DuplicatePaymentConfig,
) -> Vec<Finding> {
    let groups = group_by(transactions, |t| {
        Some((t.vendor.as_str(), t.amount.to_bits()))
    });

    groups
        .into_iter()
        .filter_map(|group| {
            let (vendor, bits) = group.key;
            let amount = f64::from_bits(bits);
            let count = group.len();
            if count < config.min_count || amount <= config.min_amount {
                return None;
            }

            let total = group.total();
            let severity = if count >= config.high_count || total > config.high_total {
                Severity::High
            } else {
                Severity::Medium
            };
            let span = day_span(&group.members)
                .map(|days| format!("{:.0} days", days))
                .unwrap_or_else(|| "unknown".to_string());
            let departments = group.departments();

            Some(
                Finding::new(
                    AnomalyKind::DuplicatePayment,
                    severity,
                    format!("Repeated payments of {} to {}", currency(amount), vendor),
                    format!(
                        "{} received {} payments of exactly {} totaling {}",
                        vendor,
                        count,
                        currency(amount),
                        currency(total)
                    ),
                )
                .vendor(vendor)
                .amount(total)
                .count(count)
                .details(vec![
                    format!("Vendor: {}", vendor),
                    format!("Amount per payment: {}", currency(amount)),
                    format!("Number of payments: {}", count),
                    format!("Total paid: {}", currency(total)),
                    format!("Time span: {}", span),
                    format!("Departments: {}", departments.join(", ")),
                ])
                .tips([
                    "Verify each payment maps to a distinct invoice",
                    "Check whether a recurring contract explains the identical amounts",
                    "Confirm goods or services were received for every payment",
                ]),
            )
        })
        .collect()
}

/// Clusters of payments just below common approval limits.
pub fn check_threshold_avoidance(
    transactions: &[Transaction],
    config: &ThresholdAvoidanceConfig,
) -> Vec<Finding> {
    let mut findings = Vec::new();

    for &threshold in &config.thresholds {
        let low = threshold * config.window_ratio;
        let high = threshold - 1.0;

        let in_window = transactions
            .iter()
            .filter(|t| t.amount >= low && t.amount <= high);

        for group in by_vendor(in_window) {
            let count = group.len();
            if count < config.min_count {
                continue;
            }

            let total = group.total();
            let severity = if count >= config.critical_count {
                Severity::Critical
            } else {
                Severity::High
            };
            let samples: Vec<String> = group
                .members
                .iter()
                .take(5)
                .map(|t| currency(t.amount))
                .collect();

            findings.push(
                Finding::new(
                    AnomalyKind::ThresholdAvoidance,
                    severity,
                    format!("Payments just under {} to {}", currency(threshold), group.key),
                    format!(
                        "{} payments to {} fall between {} and {}, just below the {} threshold",
                        count,
                        group.key,
                        currency(low),
                        currency(high),
                        currency(threshold)
                    ),
                )
                .vendor(group.key)
                .amount(total)
                .count(count)
                .details(vec![
                    format!("Threshold: {}", currency(threshold)),
                    format!("Window: {} - {}", currency(low), currency(high)),
                    format!("Payments in window: {}", count),
                    format!("Total in window: {}", currency(total)),
                    format!("Sample amounts: {}", samples.join(", ")),
                ])
                .tips([
                    "Check whether purchases were split to avoid approval requirements",
                    "Look for invoices with consecutive numbers or matching dates",
                    format!(
                        "Review who approves purchases at or above {}",
                        currency(threshold)
                    )
                    .as_str(),
                ]),
            );
        }
    }

    findings
}

/// Vendors paid mostly in round increments.
pub fn check_round_numbers(
    transactions: &[Transaction],
    config: &RoundNumberConfig,
) -> Vec<Finding> {
    let totals = vendor_counts(transactions);
    let mut findings = Vec::new();

    for pattern in &config.patterns {
        let matches = transactions
            .iter()
            .filter(|t| t.amount >= pattern.min_amount && t.amount % pattern.divisor == 0.0);

        for group in by_vendor(matches) {
            let count = group.len();
            let vendor_total = totals.get(group.key).copied().unwrap_or(count);
            let round_share = count as f64 / vendor_total as f64 * 100.0;
            if count < config.min_count || round_share <= config.min_percentage {
                continue;
            }

            let total = group.total();
            let severity = if count >= config.high_count {
                Severity::High
            } else {
                Severity::Medium
            };

            findings.push(
                Finding::new(
                    AnomalyKind::RoundNumber,
                    severity,
                    format!("Round-number payments to {} ({})", group.key, pattern.label),
                    format!(
                        "{} of {} payments to {} are exact multiples of {}",
                        count,
                        vendor_total,
                        group.key,
                        currency(pattern.divisor)
                    ),
                )
                .vendor(group.key)
                .amount(total)
                .count(count)
                .details(vec![
                    format!("Pattern: {}", pattern.label),
                    format!("Round payments: {} of {}", count, vendor_total),
                    format!("Share of vendor payments: {}", percent(round_share)),
                    format!("Total in round amounts: {}", currency(total)),
                ])
                .tips([
                    "Round amounts are typical of estimates, retainers or advances rather than itemized invoices",
                    "Request supporting invoices with line-item detail",
                    "Check whether the contract specifies fixed installments",
                ]),
            );
        }
    }

    findings
}
