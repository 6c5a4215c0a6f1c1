use crate::utils::error::{PipelineError, Result};
use serde::de::DeserializeOwned;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// What the document reader produced for one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageContent {
    /// 1-based page number.
    pub number: u32,
    pub text: Option<String>,
    /// Detected table grid, first row being the header as printed on the page.
    pub table: Option<Vec<Vec<String>>>,
}

/// Header plus data rows recovered from the statement's transaction table.
///
/// Every row has exactly as many cells as the header.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    header: Vec<String>,
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Builds a table, aligning rows to the header width.
    ///
    /// Short rows are padded with empty cells. Rows wider than the header
    /// cannot be keyed by column name and are dropped.
    pub fn new(header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = header.len();
        let mut aligned = Vec::with_capacity(rows.len());

        for mut row in rows {
            if row.len() > width {
                tracing::warn!(
                    cells = row.len(),
                    header_cells = width,
                    "Dropping table row wider than the header"
                );
                continue;
            }
            row.resize(width, String::new());
            aligned.push(row);
        }

        let columns = unique_column_names(&header);
        Self {
            header,
            columns,
            rows: aligned,
        }
    }

    /// Header cells exactly as extracted.
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Column names used as record keys and CSV header; always unique.
    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn records(&self) -> Vec<TransactionRecord> {
        self.rows
            .iter()
            .map(|row| TransactionRecord {
                fields: self.columns.iter().cloned().zip(row.iter().cloned()).collect(),
            })
            .collect()
    }

    /// Renders the table as comma-separated text with a header row.
    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| PipelineError::IoError(e.into_error()))?;
        String::from_utf8(bytes).map_err(|e| {
            PipelineError::IoError(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })
    }
}

fn unique_column_names(header: &[String]) -> Vec<String> {
    let mut used = HashSet::new();
    let mut names = Vec::with_capacity(header.len());

    for (idx, raw) in header.iter().enumerate() {
        let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        let base = if collapsed.is_empty() {
            format!("column_{}", idx + 1)
        } else {
            collapsed
        };

        let mut name = base.clone();
        let mut suffix = 2;
        while used.contains(&name) {
            name = format!("{}_{}", base, suffix);
            suffix += 1;
        }
        used.insert(name.clone());
        names.push(name);
    }

    names
}

/// One table row keyed by column name, in column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    fields: Vec<(String, String)>,
}

impl TransactionRecord {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for TransactionRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountHolderDetails {
    #[serde(default, alias = "Name", deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, alias = "Address", deserialize_with = "lenient_string")]
    pub address: Option<String>,
    #[serde(
        default,
        alias = "Contact Nr",
        alias = "contact_number",
        alias = "phone",
        deserialize_with = "lenient_string"
    )]
    pub contact_nr: Option<String>,
    #[serde(default, alias = "Email", deserialize_with = "lenient_string")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankAccountDetails {
    #[serde(default, alias = "Bank Name", deserialize_with = "lenient_string")]
    pub bank_name: Option<String>,
    #[serde(
        default,
        alias = "Account Nr",
        alias = "account_number",
        deserialize_with = "lenient_string"
    )]
    pub account_nr: Option<String>,
    #[serde(
        default,
        alias = "IFSC Code",
        alias = "ifsc",
        deserialize_with = "lenient_string"
    )]
    pub ifsc_code: Option<String>,
    #[serde(
        default,
        alias = "Bank Branch Address",
        alias = "branch_address",
        deserialize_with = "lenient_string"
    )]
    pub bank_branch_address: Option<String>,
}

// Models print account numbers and phone numbers as JSON numbers often enough.
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(other) => Some(other.to_string()),
    })
}

/// JSON object recovered from a model response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParsedDetails(Map<String, Value>);

impl ParsedDetails {
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn account_holder(&self) -> Option<AccountHolderDetails> {
        self.typed("account_holder_details")
    }

    pub fn bank_account(&self) -> Option<BankAccountDetails> {
        self.typed("bank_account_details")
    }

    pub fn transactions(&self) -> Option<&Vec<Value>> {
        self.0.get("transactions").and_then(Value::as_array)
    }

    fn typed<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.0.get(key)?;
        match serde_json::from_value(value.clone()) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::debug!(key, error = %e, "Section does not match the expected shape");
                None
            }
        }
    }
}

/// Model output for the no-table path: parsed when possible, raw otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassifiedDetails {
    Structured(ParsedDetails),
    Raw(String),
}

/// Response for one document. Callers branch on which key set is present.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ExtractionResult {
    TableFound {
        account_and_bank_details: String,
        transactions: Vec<TransactionRecord>,
        transactions_csv: String,
    },
    ModelOnly {
        all_details: ClassifiedDetails,
    },
}

impl ExtractionResult {
    pub fn is_table_found(&self) -> bool {
        matches!(self, ExtractionResult::TableFound { .. })
    }

    pub fn transactions(&self) -> &[TransactionRecord] {
        match self {
            ExtractionResult::TableFound { transactions, .. } => transactions,
            ExtractionResult::ModelOnly { .. } => &[],
        }
    }

    pub fn transactions_csv(&self) -> Option<&str> {
        match self {
            ExtractionResult::TableFound {
                transactions_csv, ..
            } => Some(transactions_csv),
            ExtractionResult::ModelOnly { .. } => None,
        }
    }
}
