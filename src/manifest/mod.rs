//! Classification table built from the CSV manifest
//!
//! The table maps a database name to the tables it publishes and their PII
//! classification. It is built once per run and shared read-only (behind an
//! `Arc`) by every tagging task.

mod loader;

pub use loader::{load_manifest, parse_manifest, ManifestLocation};

use ahash::{HashMap, HashMapExt};

/// Raw content of a manifest `pii` cell
#[derive(Debug, Clone, PartialEq)]
pub enum PiiCell {
    /// Free text, possibly empty. Every CSV cell is text.
    Text(String),
    /// A numeric value from an entry built in code; not a valid classification
    Number(f64),
}

impl PiiCell {
    /// Value written to the `pii` tag. Non-text cells collapse to empty.
    pub fn tag_value(&self) -> &str {
        match self {
            PiiCell::Text(text) => text,
            PiiCell::Number(_) => "",
        }
    }
}

impl From<&str> for PiiCell {
    fn from(value: &str) -> Self {
        PiiCell::Text(value.to_string())
    }
}

impl From<String> for PiiCell {
    fn from(value: String) -> Self {
        PiiCell::Text(value)
    }
}

impl From<i64> for PiiCell {
    fn from(value: i64) -> Self {
        PiiCell::Number(value as f64)
    }
}

/// One table listed under a database in the manifest
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationEntry {
    pub table: String,
    pub pii: PiiCell,
}

impl ClassificationEntry {
    pub fn new(table: impl Into<String>, pii: impl Into<PiiCell>) -> Self {
        Self {
            table: table.into(),
            pii: pii.into(),
        }
    }
}

/// Database name -> ordered table entries
#[derive(Debug, Clone, Default)]
pub struct ClassificationTable {
    databases: HashMap<String, Vec<ClassificationEntry>>,
}

impl ClassificationTable {
    /// Build a table from `(database, entry)` rows, keeping manifest order
    pub fn from_rows<I, S>(rows: I) -> Self
    where
        I: IntoIterator<Item = (S, ClassificationEntry)>,
        S: Into<String>,
    {
        let mut databases: HashMap<String, Vec<ClassificationEntry>> = HashMap::new();
        for (database, entry) in rows {
            databases.entry(database.into()).or_default().push(entry);
        }
        Self { databases }
    }

    /// Whether `database` appears in the manifest
    pub fn contains_database(&self, database: &str) -> bool {
        self.databases.contains_key(database)
    }

    /// Entries listed for `database`
    pub fn entries(&self, database: &str) -> Option<&[ClassificationEntry]> {
        self.databases.get(database).map(Vec::as_slice)
    }

    /// First entry for `table` under `database`
    pub fn find(&self, database: &str, table: &str) -> Option<&ClassificationEntry> {
        self.entries(database)?
            .iter()
            .find(|entry| entry.table == table)
    }

    /// Number of distinct databases
    pub fn database_count(&self) -> usize {
        self.databases.len()
    }

    /// Number of table entries across all databases
    pub fn entry_count(&self) -> usize {
        self.databases.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.databases.is_empty()
    }
}
