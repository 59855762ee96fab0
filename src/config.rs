use serde::Deserialize;
use std::path::Path;

use crate::anomaly::types::AnomalyKind;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

// ============================================================
// Detection Config
// ============================================================

/// Thresholds for every check. Defaults are the values the dashboard ships with.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct DetectionConfig {
    /// Checks to skip, by tag (e.g. "vendor_name_flag").
    #[serde(default)]
    pub disabled: Vec<String>,
    #[serde(default)]
    pub digit_distribution: DigitDistributionConfig,
    #[serde(default)]
    pub duplicate_payment: DuplicatePaymentConfig,
    #[serde(default)]
    pub threshold_avoidance: ThresholdAvoidanceConfig,
    #[serde(default)]
    pub round_number: RoundNumberConfig,
    #[serde(default)]
    pub weekend_payment: WeekendPaymentConfig,
    #[serde(default)]
    pub same_day: SameDayConfig,
    #[serde(default)]
    pub vendor_name: VendorNameConfig,
    #[serde(default)]
    pub high_frequency: HighFrequencyConfig,
    #[serde(default)]
    pub large_outlier: LargeOutlierConfig,
    #[serde(default)]
    pub concentration: ConcentrationConfig,
}

impl DetectionConfig {
    pub fn is_enabled(&self, kind: AnomalyKind) -> bool {
        !self.disabled.iter().any(|d| d == kind.as_str())
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DigitDistributionConfig {
    pub min_amount: f64,
    pub min_sample: usize,
    pub flag_deviation: f64,
    pub high_deviation: f64,
}

impl Default for DigitDistributionConfig {
    fn default() -> Self {
        Self {
            min_amount: 100.0,
            min_sample: 100,
            flag_deviation: 0.05,
            high_deviation: 0.10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DuplicatePaymentConfig {
    pub min_count: usize,
    pub min_amount: f64,
    pub high_count: usize,
    pub high_total: f64,
}

impl Default for DuplicatePaymentConfig {
    fn default() -> Self {
        Self {
            min_count: 3,
            min_amount: 1000.0,
            high_count: 5,
            high_total: 100_000.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ThresholdAvoidanceConfig {
    pub thresholds: Vec<f64>,
    /// Lower edge of the window as a fraction of the threshold.
    pub window_ratio: f64,
    pub min_count: usize,
    pub critical_count: usize,
}

impl Default for ThresholdAvoidanceConfig {
    fn default() -> Self {
        Self {
            thresholds: vec![
                1_000.0, 2_500.0, 5_000.0, 10_000.0, 25_000.0, 50_000.0, 100_000.0,
            ],
            window_ratio: 0.95,
            min_count: 3,
            critical_count: 5,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RoundPatternConfig {
    pub divisor: f64,
    pub min_amount: f64,
    pub label: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RoundNumberConfig {
    pub patterns: Vec<RoundPatternConfig>,
    pub min_count: usize,
    /// Strict lower bound on the share of a vendor's payments that are round.
    pub min_percentage: f64,
    pub high_count: usize,
}

impl Default for RoundNumberConfig {
    fn default() -> Self {
        let pattern = |divisor: f64, min_amount: f64, label: &str| RoundPatternConfig {
            divisor,
            min_amount,
            label: label.to_string(),
        };
        Self {
            patterns: vec![
                pattern(10_000.0, 10_000.0, "$10K increments"),
                pattern(5_000.0, 5_000.0, "$5K increments"),
                pattern(1_000.0, 5_000.0, "$1K increments"),
            ],
            min_count: 4,
            min_percentage: 50.0,
            high_count: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WeekendPaymentConfig {
    pub min_count: usize,
    pub min_percentage: f64,
    pub high_percentage: f64,
}

impl Default for WeekendPaymentConfig {
    fn default() -> Self {
        Self {
            min_count: 5,
            min_percentage: 20.0,
            high_percentage: 40.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SameDayConfig {
    pub min_count: usize,
    pub high_count: usize,
    pub high_total: f64,
}

impl Default for SameDayConfig {
    fn default() -> Self {
        Self {
            min_count: 3,
            high_count: 5,
            high_total: 50_000.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct VendorNameConfig {
    pub min_total: f64,
    pub medium_total: f64,
}

impl Default for VendorNameConfig {
    fn default() -> Self {
        Self {
            min_total: 50_000.0,
            medium_total: 500_000.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HighFrequencyConfig {
    /// Multiple of the mean per-vendor transaction count.
    pub multiple: f64,
    pub min_count: usize,
    pub high_count: usize,
}

impl Default for HighFrequencyConfig {
    fn default() -> Self {
        Self {
            multiple: 5.0,
            min_count: 20,
            high_count: 100,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LargeOutlierConfig {
    pub fence_multiplier: f64,
    pub min_amount: f64,
    pub critical_amount: f64,
    pub max_results: usize,
}

impl Default for LargeOutlierConfig {
    fn default() -> Self {
        Self {
            fence_multiplier: 3.0,
            min_amount: 1_000_000.0,
            critical_amount: 10_000_000.0,
            max_results: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ConcentrationConfig {
    pub flag_share: f64,
    pub high_share: f64,
    pub top_n: usize,
}

impl Default for ConcentrationConfig {
    fn default() -> Self {
        Self {
            flag_share: 15.0,
            high_share: 25.0,
            top_n: 5,
        }
    }
}

// ============================================================
// Ingest Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    #[serde(default = "default_max_transactions")]
    pub max_transactions: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_transactions: default_max_transactions(),
        }
    }
}

fn default_max_transactions() -> usize {
    10_000
}

// ============================================================
// API Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_api_port")]
    pub port: u16,
    #[serde(default = "default_api_host")]
    pub host: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_api_port() -> u16 {
    3000
}

fn default_api_host() -> String {
    "0.0.0.0".to_string()
}

impl Config {
    pub fn load(path: &str) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("Failed to read config file '{}': {}", path, e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| eyre::eyre!("Failed to parse config file '{}': {}", path, e))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to the built-in defaults.
    pub fn load_or_default(path: &str) -> eyre::Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            tracing::warn!(path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    fn validate(&self) -> eyre::Result<()> {
        if self.ingest.max_transactions == 0 {
            return Err(eyre::eyre!("ingest.max_transactions must be greater than zero"));
        }

        let detection = &self.detection;
        for name in &detection.disabled {
            if !AnomalyKind::ALL.iter().any(|k| k.as_str() == name) {
                return Err(eyre::eyre!("Unknown check '{}' in detection.disabled", name));
            }
        }

        let digits = &detection.digit_distribution;
        ensure_not_below(
            "digit_distribution.high_deviation",
            digits.high_deviation,
            "flag_deviation",
            digits.flag_deviation,
        )?;

        let duplicates = &detection.duplicate_payment;
        ensure_not_below(
            "duplicate_payment.high_count",
            duplicates.high_count,
            "min_count",
            duplicates.min_count,
        )?;

        let window = &detection.threshold_avoidance;
        if !(window.window_ratio > 0.0 && window.window_ratio <= 1.0) {
            return Err(eyre::eyre!(
                "threshold_avoidance.window_ratio must be in (0, 1], got {}",
                window.window_ratio
            ));
        }
        if let Some(t) = window.thresholds.iter().find(|t| !(**t > 0.0)) {
            return Err(eyre::eyre!(
                "threshold_avoidance.thresholds must be positive, got {}",
                t
            ));
        }
        ensure_not_below(
            "threshold_avoidance.critical_count",
            window.critical_count,
            "min_count",
            window.min_count,
        )?;

        let round = &detection.round_number;
        for pattern in &round.patterns {
            if !(pattern.divisor > 0.0) {
                return Err(eyre::eyre!(
                    "Round-number pattern '{}' must have a positive divisor, got {}",
                    pattern.label,
                    pattern.divisor
                ));
            }
        }
        ensure_not_below(
            "round_number.high_count",
            round.high_count,
            "min_count",
            round.min_count,
        )?;

        let weekend = &detection.weekend_payment;
        ensure_not_below(
            "weekend_payment.high_percentage",
            weekend.high_percentage,
            "min_percentage",
            weekend.min_percentage,
        )?;

        let same_day = &detection.same_day;
        ensure_not_below(
            "same_day.high_count",
            same_day.high_count,
            "min_count",
            same_day.min_count,
        )?;

        let names = &detection.vendor_name;
        ensure_not_below(
            "vendor_name.medium_total",
            names.medium_total,
            "min_total",
            names.min_total,
        )?;

        let frequency = &detection.high_frequency;
        ensure_not_below(
            "high_frequency.high_count",
            frequency.high_count,
            "min_count",
            frequency.min_count,
        )?;

        let outliers = &detection.large_outlier;
        ensure_not_below(
            "large_outlier.critical_amount",
            outliers.critical_amount,
            "min_amount",
            outliers.min_amount,
        )?;

        let concentration = &detection.concentration;
        ensure_not_below(
            "concentration.high_share",
            concentration.high_share,
            "flag_share",
            concentration.flag_share,
        )?;

        Ok(())
    }
}

/// Escalation thresholds must sit at or above the flag threshold they escalate.
/// NaN on either side fails.
fn ensure_not_below<T>(high_name: &str, high: T, low_name: &str, low: T) -> eyre::Result<()>
where
    T: PartialOrd + std::fmt::Display,
{
    if high >= low {
        Ok(())
    } else {
        Err(eyre::eyre!(
            "{} ({}) is below {} ({})",
            high_name,
            high,
            low_name,
            low
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml_str = r#"
[detection]
disabled = ["vendor_name_flag"]

[detection.threshold_avoidance]
thresholds = [10000.0]

[detection.concentration]
flag_share = 20.0
high_share = 30.0

[ingest]
max_transactions = 500

[api]
port = 8080
"#;

        let config: Config = toml::from_str(toml_str).unwrap();
        config.validate().unwrap();
        assert!(!config.detection.is_enabled(AnomalyKind::VendorNameFlag));
        assert!(config.detection.is_enabled(AnomalyKind::LargeOutlier));
        assert_eq!(config.detection.threshold_avoidance.thresholds, vec![10_000.0]);
        assert_eq!(config.detection.threshold_avoidance.window_ratio, 0.95); // default
        assert_eq!(config.detection.concentration.top_n, 5); // default
        assert_eq!(config.detection.round_number.patterns.len(), 3); // default
        assert_eq!(config.ingest.max_transactions, 500);
        assert_eq!(config.api.port, 8080);
        assert_eq!(config.api.host, "0.0.0.0");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        config.validate().unwrap();
        assert_eq!(config.ingest.max_transactions, 10_000);
        assert_eq!(config.detection.digit_distribution.min_sample, 100);
        assert_eq!(config.detection.large_outlier.max_results, 10);
        assert!(config.detection.disabled.is_empty());
    }

    #[test]
    fn test_validate_unknown_disabled_check() {
        let mut config = Config::default();
        config.detection.disabled = vec!["benford".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bad_window_ratio() {
        let mut config = Config::default();
        config.detection.threshold_avoidance.window_ratio = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_inverted_shares() {
        let mut config = Config::default();
        config.detection.concentration.flag_share = 30.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_inverted_counts() {
        let cases: [fn(&mut DetectionConfig); 5] = [
            |d| d.duplicate_payment.high_count = 2,
            |d| d.same_day.high_count = 2,
            |d| d.round_number.high_count = d.round_number.min_count - 1,
            |d| d.threshold_avoidance.critical_count = 2,
            |d| d.high_frequency.high_count = 10,
        ];
        for invert in cases {
            let mut config = Config::default();
            invert(&mut config.detection);
            assert!(config.validate().is_err());
        }
    }

    #[test]
    fn test_validate_inverted_amounts() {
        let mut config = Config::default();
        config.detection.large_outlier.critical_amount = 500_000.0;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("large_outlier.critical_amount"));

        let mut config = Config::default();
        config.detection.vendor_name.medium_total = 10_000.0;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("vendor_name.medium_total"));
    }

    #[test]
    fn test_validate_equal_thresholds_allowed() {
        let mut config = Config::default();
        config.detection.same_day.high_count = config.detection.same_day.min_count;
        config.detection.large_outlier.critical_amount = config.detection.large_outlier.min_amount;
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_nan_values() {
        let mut config = Config::default();
        config.detection.round_number.patterns[0].divisor = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.detection.threshold_avoidance.thresholds = vec![f64::NAN];
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.detection.concentration.high_share = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = Config::load_or_default("/nonexistent/spendwatch.toml").unwrap();
        assert_eq!(config.api.port, 3000);
    }
}
