use crate::config::DetectionConfig;
use crate::ingest::Transaction;

use super::types::{Anomaly, AnomalyKind, DetectionReport, DetectionStats, Finding};
use super::{outlier, rules, timing, vendor};

/// The anomaly detection engine. Runs all enabled checks against a batch of transactions.
///
/// Analysis is pure: the engine holds only configuration, so one instance can serve
/// concurrent callers.
#[derive(Debug, Clone, Default)]
pub struct AnomalyEngine {
    config: DetectionConfig,
}

impl AnomalyEngine {
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Run one check by kind.
    pub fn run_check(&self, kind: AnomalyKind, transactions: &[Transaction]) -> Vec<Finding> {
        let c = &self.config;
        match kind {
            AnomalyKind::DigitDistribution => {
                rules::check_digit_distribution(transactions, &c.digit_distribution)
            }
            AnomalyKind::DuplicatePayment => {
                rules::check_duplicate_payments(transactions, &c.duplicate_payment)
            }
            AnomalyKind::ThresholdAvoidance => {
                rules::check_threshold_avoidance(transactions, &c.threshold_avoidance)
            }
            AnomalyKind::RoundNumber => rules::check_round_numbers(transactions, &c.round_number),
            AnomalyKind::WeekendPayment => {
                timing::check_weekend_payments(transactions, &c.weekend_payment)
            }
            AnomalyKind::SameDayPayments => {
                timing::check_same_day_payments(transactions, &c.same_day)
            }
            AnomalyKind::VendorNameFlag => vendor::check_vendor_names(transactions, &c.vendor_name),
            AnomalyKind::HighFrequency => {
                vendor::check_high_frequency(transactions, &c.high_frequency)
            }
            AnomalyKind::LargeOutlier => {
                outlier::check_large_outliers(transactions, &c.large_outlier)
            }
            AnomalyKind::VendorConcentration => {
                vendor::check_vendor_concentration(transactions, &c.concentration)
            }
        }
    }

    /// Analyze a batch of transactions.
    /// Findings are numbered from 1 in check order, then summarized.
    pub fn analyze(&self, transactions: &[Transaction]) -> DetectionReport {
        let (anomalies, _next_id) = AnomalyKind::ALL
            .into_iter()
            .filter(|kind| self.config.is_enabled(*kind))
            .fold((Vec::new(), 1u32), |(acc, next_id), kind| {
                let findings = self.run_check(kind, transactions);
                tracing::debug!(check = kind.as_str(), findings = findings.len(), "Check complete");
                number_findings(acc, next_id, findings)
            });

        let stats = DetectionStats::from_anomalies(&anomalies, transactions.len());
        tracing::info!(
            transactions = stats.transactions_analyzed,
            anomalies = stats.total_anomalies,
            critical = stats.critical,
            high = stats.high,
            flagged_amount = stats.total_flagged_amount,
            "Anomaly detection complete"
        );

        DetectionReport { anomalies, stats }
    }
}

/// Append `findings` to `acc`, numbering them from `next_id`.
/// Returns the grown list and the next free id.
fn number_findings(
    mut acc: Vec<Anomaly>,
    mut next_id: u32,
    findings: Vec<Finding>,
) -> (Vec<Anomaly>, u32) {
    for finding in findings {
        acc.push(finding.into_anomaly(next_id));
        next_id += 1;
    }
    (acc, next_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::types::Severity;
    use crate::ingest::types::parse_date;

    fn dated(vendor: &str, amount: f64, date: &str) -> Transaction {
        Transaction::new("Parks", vendor, amount, parse_date(date))
    }

    fn mixed_batch() -> Vec<Transaction> {
        let mut txs = vec![
            dated("Acme LLC", 9950.0, "2024-03-04"),
            dated("Acme LLC", 9950.0, "2024-03-06"),
            dated("Acme LLC", 9950.0, "2024-03-08"),
        ];
        txs.extend((0..30).map(|i| dated(&format!("Vendor {}", i), 120.0 + i as f64, "2024-03-05")));
        txs.push(dated("Mega Corp", 50_000_000.0, "2024-03-05"));
        txs
    }

    #[test]
    fn test_empty_input() {
        let report = AnomalyEngine::default().analyze(&[]);
        assert!(report.anomalies.is_empty());
        assert_eq!(report.stats, DetectionStats::default());
    }

    #[test]
    fn test_degenerate_inputs_do_not_panic() {
        let engine = AnomalyEngine::default();
        engine.analyze(&[dated("", 0.0, "")]);
        engine.analyze(&vec![dated("A", 0.0, ""); 50]);
        engine.analyze(&vec![dated("A", 5000.0, "2024-01-06"); 200]);
    }

    #[test]
    fn test_ids_follow_check_order() {
        let report = AnomalyEngine::default().analyze(&mixed_batch());
        let ids: Vec<u32> = report.anomalies.iter().map(|a| a.id).collect();
        let expected: Vec<u32> = (1..=report.anomalies.len() as u32).collect();
        assert_eq!(ids, expected);

        let order: Vec<usize> = report
            .anomalies
            .iter()
            .map(|a| AnomalyKind::ALL.iter().position(|k| *k == a.kind).unwrap())
            .collect();
        assert!(order.windows(2).all(|w| w[0] <= w[1]));

        let kinds: Vec<AnomalyKind> = report.anomalies.iter().map(|a| a.kind).collect();
        assert!(kinds.contains(&AnomalyKind::ThresholdAvoidance));
        assert!(kinds.contains(&AnomalyKind::LargeOutlier));
        assert!(kinds.contains(&AnomalyKind::VendorConcentration));
    }

    #[test]
    fn test_stats_match_anomalies() {
        let report = AnomalyEngine::default().analyze(&mixed_batch());
        let stats = &report.stats;
        assert_eq!(stats.total_anomalies, report.anomalies.len());
        assert_eq!(
            stats.critical + stats.high + stats.medium + stats.low,
            stats.total_anomalies
        );
        let sum: f64 = report.anomalies.iter().filter_map(|a| a.amount).sum();
        assert_eq!(stats.total_flagged_amount, sum);
        assert_eq!(stats.transactions_analyzed, 34);
    }

    #[test]
    fn test_disabled_checks_consume_no_ids() {
        let mut config = DetectionConfig::default();
        config.disabled = vec!["threshold_avoidance".to_string()];
        let report = AnomalyEngine::new(config).analyze(&mixed_batch());
        assert_eq!(report.of_kind(AnomalyKind::ThresholdAvoidance).count(), 0);
        assert_eq!(report.anomalies[0].id, 1);
        assert_eq!(report.anomalies[0].kind, AnomalyKind::DuplicatePayment);
        assert_eq!(report.anomalies[0].severity, Severity::Medium);
    }
}
