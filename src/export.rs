//! CSV export of detection results and transaction batches.

use std::io::Write;

use crate::anomaly::Anomaly;
use crate::ingest::Transaction;

const ANOMALY_HEADER: [&str; 10] = [
    "id",
    "severity",
    "kind",
    "title",
    "vendor",
    "department",
    "amount",
    "count",
    "description",
    "details",
];

/// Write anomalies as CSV, one row per anomaly. Details are joined with " | ".
pub fn write_anomalies_csv<W: Write>(writer: W, anomalies: &[Anomaly]) -> eyre::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(ANOMALY_HEADER)?;

    for a in anomalies {
        wtr.write_record([
            a.id.to_string(),
            a.severity.as_str().to_string(),
            a.kind.as_str().to_string(),
            a.title.clone(),
            a.vendor.clone().unwrap_or_default(),
            a.department.clone().unwrap_or_default(),
            a.amount.map(|v| format!("{:.2}", v)).unwrap_or_default(),
            a.count.map(|c| c.to_string()).unwrap_or_default(),
            a.description.clone(),
            a.details.join(" | "),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Write transactions as CSV with the column names the loader accepts.
pub fn write_transactions_csv<W: Write>(
    writer: W,
    transactions: &[Transaction],
) -> eyre::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["department", "vendor", "amount", "date", "description"])?;

    for t in transactions {
        wtr.write_record([
            t.department.clone(),
            t.vendor.clone(),
            format!("{:.2}", t.amount),
            t.date
                .map(|d| d.format("%Y-%m-%dT%H:%M:%S").to_string())
                .unwrap_or_default(),
            t.description.clone().unwrap_or_default(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Export anomalies to a CSV file at `path`.
pub fn export_anomalies(path: &str, anomalies: &[Anomaly]) -> eyre::Result<()> {
    let file = std::fs::File::create(path)
        .map_err(|e| eyre::eyre!("Failed to create export file '{}': {}", path, e))?;
    write_anomalies_csv(file, anomalies)?;
    tracing::info!(path, anomalies = anomalies.len(), "Exported anomalies");
    Ok(())
}

/// Write a normalized transaction batch to a CSV file at `path`.
pub fn export_transactions(path: &str, transactions: &[Transaction]) -> eyre::Result<()> {
    let file = std::fs::File::create(path)
        .map_err(|e| eyre::eyre!("Failed to create export file '{}': {}", path, e))?;
    write_transactions_csv(file, transactions)?;
    tracing::info!(
        path,
        transactions = transactions.len(),
        "Exported normalized transactions"
    );
    Ok(())
}
