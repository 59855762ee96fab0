//! Grouping and formatting helpers shared by the checks.
//!
//! Groups are returned in first-seen input order so that every check is
//! deterministic for a given input sequence.

use std::collections::HashMap;
use std::hash::Hash;

use crate::ingest::Transaction;

/// A set of transactions sharing a key.
pub struct Group<'a, K> {
    pub key: K,
    pub members: Vec<&'a Transaction>,
}

impl<K> Group<'_, K> {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.members.iter().map(|t| t.amount).sum()
    }

    /// Distinct departments among the members, in first-seen order.
    pub fn departments(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for t in &self.members {
            if !seen.contains(&t.department.as_str()) {
                seen.push(&t.department);
            }
        }
        seen
    }
}

/// Group transactions by `key_fn`, skipping those for which it returns `None`.
pub fn group_by<'a, I, K, F>(transactions: I, mut key_fn: F) -> Vec<Group<'a, K>>
where
    I: IntoIterator<Item = &'a Transaction>,
    K: Eq + Hash + Clone,
    F: FnMut(&'a Transaction) -> Option<K>,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<Group<'a, K>> = Vec::new();

    for t in transactions {
        let Some(key) = key_fn(t) else {
            continue;
        };
        match index.get(&key) {
            Some(&i) => groups[i].members.push(t),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(Group {
                    key,
                    members: vec![t],
                });
            }
        }
    }

    groups
}

/// Group by vendor name.
pub fn by_vendor<'a, I>(transactions: I) -> Vec<Group<'a, &'a str>>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    group_by(transactions, |t| Some(t.vendor.as_str()))
}

/// Per-vendor transaction counts over the full input.
pub fn vendor_counts(transactions: &[Transaction]) -> HashMap<&str, usize> {
    let mut counts = HashMap::new();
    for t in transactions {
        *counts.entry(t.vendor.as_str()).or_insert(0) += 1;
    }
    counts
}

/// Whole days between the earliest and latest dated member, if any are dated.
pub fn day_span(members: &[&Transaction]) -> Option<f64> {
    let mut dates = members.iter().filter_map(|t| t.date);
    let first = dates.next()?;
    let (min, max) = dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
    Some((max - min).num_milliseconds() as f64 / 86_400_000.0)
}

/// Format as whole dollars with thousands separators, e.g. `$1,234,568`.
pub fn currency(amount: f64) -> String {
    let rounded = amount.abs().round() as u64;
    let digits = rounded.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 2);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if amount < 0.0 && rounded > 0 {
        format!("-${}", out)
    } else {
        format!("${}", out)
    }
}

pub fn percent(share: f64) -> String {
    format!("{:.1}%", share)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::parse_date;

    fn tx(vendor: &str, dept: &str, amount: f64, date: &str) -> Transaction {
        Transaction::new(dept, vendor, amount, parse_date(date))
    }

    #[test]
    fn test_currency() {
        assert_eq!(currency(0.0), "$0");
        assert_eq!(currency(999.4), "$999");
        assert_eq!(currency(1000.0), "$1,000");
        assert_eq!(currency(1_234_567.89), "$1,234,568");
        assert_eq!(currency(-2500.0), "-$2,500");
    }

    #[test]
    fn test_group_by_first_seen_order() {
        let txs = vec![
            tx("B", "X", 1.0, ""),
            tx("A", "X", 2.0, ""),
            tx("B", "Y", 3.0, ""),
        ];
        let groups = by_vendor(&txs);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key, "B");
        assert_eq!(groups[0].len(), 2);
        assert_eq!(groups[0].total(), 4.0);
        assert_eq!(groups[0].departments(), vec!["X", "Y"]);
        assert_eq!(groups[1].key, "A");
    }

    #[test]
    fn test_group_by_skips_none() {
        let txs = vec![tx("A", "X", 1.0, "2024-01-01"), tx("A", "X", 1.0, "")];
        let groups = group_by(&txs, |t| t.day());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 1);
    }

    #[test]
    fn test_day_span() {
        let txs = vec![
            tx("A", "X", 1.0, "2024-01-10"),
            tx("A", "X", 1.0, ""),
            tx("A", "X", 1.0, "2024-01-01"),
        ];
        let refs: Vec<&Transaction> = txs.iter().collect();
        assert_eq!(day_span(&refs), Some(9.0));

        let undated = vec![tx("A", "X", 1.0, "")];
        let refs: Vec<&Transaction> = undated.iter().collect();
        assert_eq!(day_span(&refs), None);
    }
}
