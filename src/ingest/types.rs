use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Label used when a portal record has no vendor or department.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// A normalized spending record, ready for anomaly detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(default = "unknown_label", deserialize_with = "deserialize_label")]
    pub department: String,
    #[serde(default = "unknown_label", deserialize_with = "deserialize_label")]
    pub vendor: String,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub amount: f64,
    #[serde(
        default,
        serialize_with = "serialize_opt_datetime",
        deserialize_with = "deserialize_opt_datetime"
    )]
    pub date: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Transaction {
    pub fn new(
        department: impl Into<String>,
        vendor: impl Into<String>,
        amount: f64,
        date: Option<NaiveDateTime>,
    ) -> Self {
        let department: String = department.into();
        let vendor: String = vendor.into();
        Self {
            department: normalize_label(&department),
            vendor: normalize_label(&vendor),
            amount,
            date,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Calendar day of the transaction, ignoring time of day.
    pub fn day(&self) -> Option<NaiveDate> {
        self.date.map(|d| d.date())
    }
}

fn unknown_label() -> String {
    UNKNOWN_LABEL.to_string()
}

pub fn normalize_label(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        unknown_label()
    } else {
        trimmed.to_string()
    }
}

/// Parse a currency string such as `"$1,234.50"`. Unparseable input yields 0.
pub fn parse_amount(raw: &str) -> f64 {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' '))
        .collect();
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Parse the date formats open-data portals emit. Offsets are dropped, keeping the
/// wall-clock time the record was written with.
pub fn parse_date(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }

    const DATETIME_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ];
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }

    for fmt in ["%Y-%m-%d", "%m/%d/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }

    None
}

/// Any JSON scalar or structure a portal might put in a field.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawValue {
    Number(f64),
    Text(String),
    Other(serde::de::IgnoredAny),
}

fn deserialize_label<'de, D>(d: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<RawValue> = Option::deserialize(d)?;
    Ok(match raw {
        Some(RawValue::Text(s)) => normalize_label(&s),
        Some(RawValue::Number(n)) if n.is_finite() => n.to_string(),
        _ => unknown_label(),
    })
}

fn deserialize_amount<'de, D>(d: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<RawValue> = Option::deserialize(d)?;
    Ok(match raw {
        Some(RawValue::Number(n)) if n.is_finite() => n,
        Some(RawValue::Text(s)) => parse_amount(&s),
        _ => 0.0,
    })
}

/// Numeric dates are Unix epoch milliseconds, read as UTC.
fn deserialize_opt_datetime<'de, D>(d: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<RawValue> = Option::deserialize(d)?;
    Ok(match raw {
        Some(RawValue::Text(s)) => parse_date(&s),
        Some(RawValue::Number(n)) if n.is_finite() => {
            DateTime::from_timestamp_millis(n as i64).map(|dt| dt.naive_utc())
        }
        _ => None,
    })
}

fn serialize_opt_datetime<S>(value: &Option<NaiveDateTime>, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(dt) => s.serialize_some(&dt.format("%Y-%m-%dT%H:%M:%S").to_string()),
        None => s.serialize_none(),
    }
}
