use std::io::Read;

use super::types::{normalize_label, parse_amount, parse_date, Transaction};

const DEPARTMENT_COLUMNS: [&str; 4] = ["department", "department_name", "agency", "agency_name"];
const VENDOR_COLUMNS: [&str; 4] = ["vendor", "vendor_name", "payee", "payee_name"];
const AMOUNT_COLUMNS: [&str; 4] = ["amount", "check_amount", "payment_amount", "total"];
const DATE_COLUMNS: [&str; 5] = [
    "date",
    "check_date",
    "payment_date",
    "transaction_date",
    "issue_date",
];
const DESCRIPTION_COLUMNS: [&str; 3] = ["description", "purpose", "memo"];

/// Resolved column positions for a spending CSV.
#[derive(Debug, Default)]
struct ColumnMap {
    department: Option<usize>,
    vendor: Option<usize>,
    amount: Option<usize>,
    date: Option<usize>,
    description: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &csv::StringRecord) -> Self {
        let find = |aliases: &[&str]| {
            aliases.iter().find_map(|alias| {
                headers
                    .iter()
                    .position(|h| h.trim().eq_ignore_ascii_case(alias))
            })
        };
        Self {
            department: find(&DEPARTMENT_COLUMNS[..]),
            vendor: find(&VENDOR_COLUMNS[..]),
            amount: find(&AMOUNT_COLUMNS[..]),
            date: find(&DATE_COLUMNS[..]),
            description: find(&DESCRIPTION_COLUMNS[..]),
        }
    }
}

/// Parse a spending CSV file with a header row into normalized transactions.
pub fn parse_transactions_csv(path: &str) -> eyre::Result<Vec<Transaction>> {
    let file = std::fs::File::open(path)
        .map_err(|e| eyre::eyre!("Failed to open transactions CSV '{}': {}", path, e))?;
    read_transactions_csv(file)
}

/// Read normalized transactions from any CSV source with a header row.
/// Columns are matched by name, case-insensitively; unknown columns are ignored.
pub fn read_transactions_csv<R: Read>(source: R) -> eyre::Result<Vec<Transaction>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(source);

    let headers = reader
        .headers()
        .map_err(|e| eyre::eyre!("Failed to read CSV header: {}", e))?
        .clone();
    let columns = ColumnMap::from_headers(&headers);
    if columns.vendor.is_none() || columns.amount.is_none() {
        return Err(eyre::eyre!(
            "CSV must have vendor and amount columns, found: {}",
            headers.iter().collect::<Vec<_>>().join(", ")
        ));
    }

    let mut transactions = Vec::new();
    let mut undated = 0usize;

    for (row, result) in reader.records().enumerate() {
        let record =
            result.map_err(|e| eyre::eyre!("Failed to read CSV row {}: {}", row + 1, e))?;
        let field = |idx: Option<usize>| idx.and_then(|i| record.get(i)).unwrap_or("");

        let date = parse_date(field(columns.date));
        if date.is_none() {
            undated += 1;
        }
        let description = Some(field(columns.description).trim())
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        transactions.push(Transaction {
            department: normalize_label(field(columns.department)),
            vendor: normalize_label(field(columns.vendor)),
            amount: parse_amount(field(columns.amount)),
            date,
            description,
        });
    }

    tracing::debug!(undated, "Transactions without a usable date");
    tracing::info!(transactions = transactions.len(), "Parsed transactions CSV");
    Ok(transactions)
}

/// Bound a fetched batch to `limit` records, keeping the first ones.
pub fn cap_transactions(mut transactions: Vec<Transaction>, limit: usize) -> Vec<Transaction> {
    if transactions.len() > limit {
        tracing::warn!(
            fetched = transactions.len(),
            limit,
            "Transaction batch exceeds limit, truncating"
        );
        transactions.truncate(limit);
    }
    transactions
}
