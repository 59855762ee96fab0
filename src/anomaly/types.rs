use serde::{Deserialize, Serialize};

/// Types of anomalies the engine can detect, in detection order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    DigitDistribution,
    DuplicatePayment,
    ThresholdAvoidance,
    RoundNumber,
    WeekendPayment,
    SameDayPayments,
    VendorNameFlag,
    HighFrequency,
    LargeOutlier,
    VendorConcentration,
}

impl AnomalyKind {
    pub const ALL: [AnomalyKind; 10] = [
        Self::DigitDistribution,
        Self::DuplicatePayment,
        Self::ThresholdAvoidance,
        Self::RoundNumber,
        Self::WeekendPayment,
        Self::SameDayPayments,
        Self::VendorNameFlag,
        Self::HighFrequency,
        Self::LargeOutlier,
        Self::VendorConcentration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DigitDistribution => "digit_distribution",
            Self::DuplicatePayment => "duplicate_payment",
            Self::ThresholdAvoidance => "threshold_avoidance",
            Self::RoundNumber => "round_number",
            Self::WeekendPayment => "weekend_payment",
            Self::SameDayPayments => "same_day_payments",
            Self::VendorNameFlag => "vendor_name_flag",
            Self::HighFrequency => "high_frequency",
            Self::LargeOutlier => "large_outlier",
            Self::VendorConcentration => "vendor_concentration",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

/// A check's output before the engine numbers it.
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    pub kind: AnomalyKind,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub vendor: Option<String>,
    pub department: Option<String>,
    pub amount: Option<f64>,
    pub count: Option<usize>,
    pub details: Vec<String>,
    pub investigation_tips: Vec<String>,
}

impl Finding {
    pub fn new(
        kind: AnomalyKind,
        severity: Severity,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            severity,
            title: title.into(),
            description: description.into(),
            vendor: None,
            department: None,
            amount: None,
            count: None,
            details: Vec::new(),
            investigation_tips: Vec::new(),
        }
    }

    pub fn vendor(mut self, vendor: &str) -> Self {
        self.vendor = Some(vendor.to_string());
        self
    }

    pub fn department(mut self, department: &str) -> Self {
        self.department = Some(department.to_string());
        self
    }

    pub fn amount(mut self, amount: f64) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    pub fn details(mut self, details: Vec<String>) -> Self {
        self.details = details;
        self
    }

    pub fn tips<I, S>(mut self, tips: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.investigation_tips.extend(tips.into_iter().map(Into::into));
        self
    }

    pub fn into_anomaly(self, id: u32) -> Anomaly {
        Anomaly {
            id,
            kind: self.kind,
            severity: self.severity,
            title: self.title,
            description: self.description,
            vendor: self.vendor,
            department: self.department,
            amount: self.amount,
            count: self.count,
            details: self.details,
            investigation_tips: self.investigation_tips,
        }
    }
}

/// A flagged pattern. Advisory only: a heuristic hit, not a fraud determination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Anomaly {
    pub id: u32,
    pub kind: AnomalyKind,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    pub details: Vec<String>,
    pub investigation_tips: Vec<String>,
}

/// Summary counts over one detection run.
///
/// `total_flagged_amount` is a plain sum of `Anomaly::amount`; a transaction
/// caught by several checks is counted once per check.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionStats {
    pub total_anomalies: usize,
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub total_flagged_amount: f64,
    pub transactions_analyzed: usize,
}

impl DetectionStats {
    pub fn from_anomalies(anomalies: &[Anomaly], transactions_analyzed: usize) -> Self {
        let mut stats = Self {
            transactions_analyzed,
            ..Self::default()
        };
        for anomaly in anomalies {
            stats.total_anomalies += 1;
            match anomaly.severity {
                Severity::Critical => stats.critical += 1,
                Severity::High => stats.high += 1,
                Severity::Medium => stats.medium += 1,
                Severity::Low => stats.low += 1,
            }
            stats.total_flagged_amount += anomaly.amount.unwrap_or(0.0);
        }
        stats
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionReport {
    pub anomalies: Vec<Anomaly>,
    pub stats: DetectionStats,
}

impl DetectionReport {
    /// Anomalies ordered most severe first; equal severities keep detection order.
    pub fn by_severity(&self) -> Vec<&Anomaly> {
        let mut sorted: Vec<&Anomaly> = self.anomalies.iter().collect();
        sorted.sort_by(|a, b| b.severity.cmp(&a.severity));
        sorted
    }

    pub fn of_kind(&self, kind: AnomalyKind) -> impl Iterator<Item = &Anomaly> {
        self.anomalies.iter().filter(move |a| a.kind == kind)
    }
}
