use chrono::{Datelike, Weekday};

use crate::config::{SameDayConfig, WeekendPaymentConfig};
use crate::ingest::Transaction;

use super::group::{by_vendor, currency, group_by, percent, vendor_counts};
use super::types::{AnomalyKind, Finding, Severity};

fn is_weekend(t: &Transaction) -> bool {
    t.date
        .map(|d| matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
        .unwrap_or(false)
}

/// Vendors with an unusual share of payments dated on Saturday or Sunday.
pub fn check_weekend_payments(
    transactions: &[Transaction],
    config: &WeekendPaymentConfig,
) -> Vec<Finding> {
    let totals = vendor_counts(transactions);
    let weekend = transactions.iter().filter(|t| is_weekend(t));

    by_vendor(weekend)
        .into_iter()
        .filter_map(|group| {
            let count = group.len();
            let vendor_total = totals.get(group.key).copied().unwrap_or(count);
            let share = count as f64 / vendor_total as f64 * 100.0;
            if count < config.min_count || share <= config.min_percentage {
                return None;
            }

            let severity = if share > config.high_percentage {
                Severity::High
            } else {
                Severity::Medium
            };
            let total = group.total();

            Some(
                Finding::new(
                    AnomalyKind::WeekendPayment,
                    severity,
                    format!("Weekend payments to {}", group.key),
                    format!(
                        "{} of {} payments to {} ({}) are dated on a weekend",
                        count,
                        vendor_total,
                        group.key,
                        percent(share)
                    ),
                )
                .vendor(group.key)
                .amount(total)
                .count(count)
                .details(vec![
                    format!("Weekend payments: {}", count),
                    format!("Total payments to vendor: {}", vendor_total),
                    format!("Weekend share: {}", percent(share)),
                    format!("Weekend total: {}", currency(total)),
                ])
                .tips([
                    "Government offices rarely process payments on weekends",
                    "Check who entered and approved these transactions",
                    "Compare posting dates against invoice and service dates",
                ]),
            )
        })
        .collect()
}

/// Several payments to one vendor on the same calendar day.
pub fn check_same_day_payments(
    transactions: &[Transaction],
    config: &SameDayConfig,
) -> Vec<Finding> {
    let groups = group_by(transactions, |t| Some((t.vendor.as_str(), t.day()?)));

    groups
        .into_iter()
        .filter_map(|group| {
            let (vendor, day) = group.key;
            let count = group.len();
            if count < config.min_count {
                return None;
            }

            let total = group.total();
            let severity = if count >= config.high_count || total > config.high_total {
                Severity::High
            } else {
                Severity::Medium
            };
            let amounts: Vec<String> = group.members.iter().map(|t| currency(t.amount)).collect();
            let departments = group.departments();
            let date = day.format("%Y-%m-%d").to_string();

            Some(
                Finding::new(
                    AnomalyKind::SameDayPayments,
                    severity,
                    format!("{} payments to {} on {}", count, vendor, date),
                    format!(
                        "{} received {} separate payments totaling {} on {}",
                        vendor,
                        count,
                        currency(total),
                        date
                    ),
                )
                .vendor(vendor)
                .amount(total)
                .count(count)
                .details(vec![
                    format!("Date: {}", date),
                    format!("Amounts: {}", amounts.join(", ")),
                    format!("Total: {}", currency(total)),
                    format!("Departments: {}", departments.join(", ")),
                ])
                .tips([
                    "Multiple same-day payments can indicate a split purchase",
                    "Check whether the payments share an invoice or purchase order",
                    format!("Review all payments to {} around {}", vendor, date).as_str(),
                ]),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::parse_date;

    fn dated(vendor: &str, amount: f64, date: &str) -> Transaction {
        Transaction::new("Parks", vendor, amount, parse_date(date))
    }

    #[test]
    fn test_weekend_payments() {
        // 2024-03-09 is a Saturday, 2024-03-10 a Sunday, 2024-03-11 a Monday
        let mut txs: Vec<Transaction> = (0..3).map(|_| dated("Acme", 500.0, "2024-03-09")).collect();
        txs.extend((0..2).map(|_| dated("Acme", 500.0, "2024-03-10T08:15:00")));
        txs.extend((0..10).map(|_| dated("Acme", 500.0, "2024-03-11")));
        txs.extend((0..5).map(|_| dated("Acme", 500.0, "")));

        let findings = check_weekend_payments(&txs, &WeekendPaymentConfig::default());
        assert_eq!(findings.len(), 1);
        // 5 of 20 = 25%
        assert_eq!(findings[0].severity, Severity::Medium);
        assert_eq!(findings[0].count, Some(5));
        assert_eq!(findings[0].amount, Some(2500.0));
    }

    #[test]
    fn test_weekend_payments_high_share() {
        let mut txs: Vec<Transaction> = (0..6).map(|_| dated("Acme", 100.0, "2024-03-09")).collect();
        txs.extend((0..4).map(|_| dated("Acme", 100.0, "2024-03-12")));
        let findings = check_weekend_payments(&txs, &WeekendPaymentConfig::default());
        assert_eq!(findings[0].severity, Severity::High);
    }

    #[test]
    fn test_weekend_payments_share_boundary() {
        // 5 of 25 = exactly 20%: not flagged
        let mut txs: Vec<Transaction> = (0..5).map(|_| dated("Acme", 100.0, "2024-03-09")).collect();
        txs.extend((0..20).map(|_| dated("Acme", 100.0, "2024-03-12")));
        assert!(check_weekend_payments(&txs, &WeekendPaymentConfig::default()).is_empty());
    }

    #[test]
    fn test_same_day_ignores_time_of_day() {
        let txs = vec![
            dated("Acme", 1000.0, "2024-03-12T09:00:00"),
            dated("Acme", 2000.0, "2024-03-12T17:45:00"),
            Transaction::new("Roads", "Acme", 3000.0, parse_date("2024-03-12")),
            dated("Acme", 4000.0, "2024-03-13"),
            dated("Acme", 4000.0, ""),
        ];
        let findings = check_same_day_payments(&txs, &SameDayConfig::default());
        assert_eq!(findings.len(), 1);
        let f = &findings[0];
        assert_eq!(f.severity, Severity::Medium);
        assert_eq!(f.count, Some(3));
        assert_eq!(f.amount, Some(6000.0));
        assert!(f.details.contains(&"Amounts: $1,000, $2,000, $3,000".to_string()));
        assert!(f.details.contains(&"Departments: Parks, Roads".to_string()));
    }

    #[test]
    fn test_same_day_high_total() {
        let txs: Vec<Transaction> = (0..3)
            .map(|_| dated("Acme", 20_000.0, "2024-03-12"))
            .collect();
        let findings = check_same_day_payments(&txs, &SameDayConfig::default());
        assert_eq!(findings[0].severity, Severity::High);
    }

    #[test]
    fn test_same_day_high_count() {
        let five: Vec<Transaction> = (0..5)
            .map(|_| dated("Acme", 100.0, "2024-03-12"))
            .collect();
        let findings = check_same_day_payments(&five, &SameDayConfig::default());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::High);
        assert_eq!(findings[0].amount, Some(500.0));

        let findings = check_same_day_payments(&five[..4], &SameDayConfig::default());
        assert_eq!(findings[0].severity, Severity::Medium);
    }
}
