use regex::Regex;
use std::sync::LazyLock;

use crate::config::{ConcentrationConfig, HighFrequencyConfig, VendorNameConfig};
use crate::ingest::Transaction;

use super::group::{by_vendor, currency, percent};
use super::types::{AnomalyKind, Finding, Severity};

static DOUBLE_LLC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bLLC\b.*\bLLC\b").expect("valid double-LLC pattern"));
static ACRONYM_COMPANY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z]{2,4}\s+(?:LLC|INC|CORP)\b").expect("valid acronym pattern")
});
static GENERIC_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)consulting|services|solutions|enterprises|holdings")
        .expect("valid generic-name pattern")
});

/// Vendor-name red flags, in priority order. The first match wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameFlag {
    DoubleLlc,
    AcronymCompany,
    GenericName,
}

impl NameFlag {
    pub const PRIORITY: [NameFlag; 3] = [Self::DoubleLlc, Self::AcronymCompany, Self::GenericName];

    pub fn label(&self) -> &'static str {
        match self {
            Self::DoubleLlc => "Double LLC",
            Self::AcronymCompany => "Acronym company",
            Self::GenericName => "Generic business name",
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::DoubleLlc => DOUBLE_LLC.is_match(name),
            Self::AcronymCompany => ACRONYM_COMPANY.is_match(name),
            Self::GenericName => GENERIC_NAME.is_match(name),
        }
    }

    fn explanation(&self) -> &'static str {
        match self {
            Self::DoubleLlc => "Layered LLC names can indicate nested shell entities",
            Self::AcronymCompany => "Bare acronym names reveal little about the business behind them",
            Self::GenericName => "Generic names make it hard to tell what was actually purchased",
        }
    }
}

pub fn classify_vendor_name(name: &str) -> Option<NameFlag> {
    NameFlag::PRIORITY.into_iter().find(|flag| flag.matches(name))
}

/// High-value vendors whose names fit common shell-company patterns.
pub fn check_vendor_names(transactions: &[Transaction], config: &VendorNameConfig) -> Vec<Finding> {
    by_vendor(transactions)
        .into_iter()
        .filter_map(|group| {
            let total = group.total();
            if total < config.min_total {
                return None;
            }
            let flag = classify_vendor_name(group.key)?;

            let severity = if total > config.medium_total {
                Severity::Medium
            } else {
                Severity::Low
            };

            Some(
                Finding::new(
                    AnomalyKind::VendorNameFlag,
                    severity,
                    format!("{}: {}", flag.label(), group.key),
                    format!(
                        "{} received {} and its name matches the '{}' pattern",
                        group.key,
                        currency(total),
                        flag.label()
                    ),
                )
                .vendor(group.key)
                .amount(total)
                .count(group.len())
                .details(vec![
                    format!("Pattern: {}", flag.label()),
                    format!("Total received: {}", currency(total)),
                    format!("Payments: {}", group.len()),
                    flag.explanation().to_string(),
                ])
                .tips([
                    "Look up the vendor in the state business registry",
                    "Check the registered agent and address against employee records",
                    "Confirm the vendor has a physical place of business",
                ]),
            )
        })
        .collect()
}

/// Vendors paid far more often than the average vendor.
pub fn check_high_frequency(
    transactions: &[Transaction],
    config: &HighFrequencyConfig,
) -> Vec<Finding> {
    let groups = by_vendor(transactions);
    if groups.is_empty() {
        return Vec::new();
    }
    let avg_count = transactions.len() as f64 / groups.len() as f64;

    groups
        .into_iter()
        .filter_map(|group| {
            let count = group.len();
            if (count as f64) <= avg_count * config.multiple || count <= config.min_count {
                return None;
            }

            let severity = if count > config.high_count {
                Severity::High
            } else {
                Severity::Medium
            };
            let total = group.total();
            let multiple = count as f64 / avg_count;
            let departments = group.departments();

            Some(
                Finding::new(
                    AnomalyKind::HighFrequency,
                    severity,
                    format!("High payment frequency: {}", group.key),
                    format!(
                        "{} was paid {} times, {:.1}x the average vendor",
                        group.key, count, multiple
                    ),
                )
                .vendor(group.key)
                .amount(total)
                .count(count)
                .details(vec![
                    format!("Payments: {} ({:.1}x average of {:.1})", count, multiple, avg_count),
                    format!("Average payment: {}", currency(total / count as f64)),
                    format!("Total paid: {}", currency(total)),
                    format!("Paying departments: {}", departments.len()),
                ])
                .tips([
                    "Check whether a master contract covers these payments",
                    "Look for payments that could have been consolidated",
                    "Review whether the same staff approve most payments to this vendor",
                ]),
            )
        })
        .collect()
}

/// The single vendor receiving the largest share of all spending, if that share is high.
pub fn check_vendor_concentration(
    transactions: &[Transaction],
    config: &ConcentrationConfig,
) -> Vec<Finding> {
    let grand_total: f64 = transactions.iter().map(|t| t.amount).sum();
    if grand_total <= 0.0 {
        return Vec::new();
    }

    let mut ranked: Vec<(&str, f64, usize)> = by_vendor(transactions)
        .into_iter()
        .map(|g| (g.key, g.total(), g.len()))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    let Some(&(vendor, total, count)) = ranked.first() else {
        return Vec::new();
    };
    let share = total / grand_total * 100.0;
    if share <= config.flag_share {
        return Vec::new();
    }

    let severity = if share > config.high_share {
        Severity::High
    } else {
        Severity::Medium
    };
    let breakdown = ranked.iter().take(config.top_n).enumerate().map(|(i, (v, t, _))| {
        format!(
            "{}. {}: {} ({})",
            i + 1,
            v,
            currency(*t),
            percent(t / grand_total * 100.0)
        )
    });

    let mut details = vec![format!("Total spending analyzed: {}", currency(grand_total))];
    details.extend(breakdown);

    vec![Finding::new(
        AnomalyKind::VendorConcentration,
        severity,
        format!("Spending concentrated in {}", vendor),
        format!(
            "{} received {} of all spending ({})",
            vendor,
            percent(share),
            currency(total)
        ),
    )
    .vendor(vendor)
    .amount(total)
    .count(count)
    .details(details)
    .tips([
        "Check whether contracts with this vendor were competitively bid",
        "Review whether sole-source justifications are on file",
        "Compare the vendor's share against prior years",
    ])]
}
