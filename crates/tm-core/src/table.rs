//! Core table types shared by the reader, the join engine and the writers

use serde::{Deserialize, Serialize};

/// An ordered set of rows sharing one column set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Label used in log lines and error messages (e.g. "base", "input")
    pub name: String,
    /// Column definitions
    pub columns: Vec<Column>,
    /// Row data
    pub rows: Vec<Row>,
}

impl Table {
    /// Create an empty table with the given column names
    pub fn with_columns<S: AsRef<str>>(name: impl Into<String>, columns: &[S]) -> Self {
        Self {
            name: name.into(),
            columns: columns
                .iter()
                .enumerate()
                .map(|(i, c)| Column::new(c.as_ref().to_string(), i))
                .collect(),
            rows: Vec::new(),
        }
    }

    /// Get the number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Find a column by name
    pub fn find_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Index of a column by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.find_column(name).map(|c| c.index)
    }

    /// Column names in order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Append a row, padding or truncating it to the column count
    pub fn push_row(&mut self, mut cells: Vec<CellValue>) {
        cells.resize(self.columns.len(), CellValue::Empty);
        self.rows.push(Row::new(cells));
    }

    /// Cell lookup by row position and column name
    pub fn value(&self, row: usize, column: &str) -> Option<&CellValue> {
        let index = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(index))
    }

    /// Replace a column's values, or append the column if it does not exist.
    ///
    /// `values` must hold one cell per row.
    pub fn set_column(&mut self, name: &str, values: Vec<CellValue>) {
        debug_assert_eq!(values.len(), self.rows.len());
        match self.column_index(name) {
            Some(index) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.cells[index] = value;
                }
            }
            None => {
                self.columns.push(Column::new(name.to_string(), self.columns.len()));
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.cells.push(value);
                }
            }
        }
    }
}

/// A column definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name as found in the header
    pub name: String,
    /// Column index (0-based)
    pub index: usize,
}

impl Column {
    /// Create a new column
    pub fn new(name: String, index: usize) -> Self {
        Self { name, index }
    }
}

/// A row of data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Cell values for each column
    pub cells: Vec<CellValue>,
}

impl Row {
    /// Create a new row
    pub fn new(cells: Vec<CellValue>) -> Self {
        Self { cells }
    }

    /// Get a cell value by column index
    pub fn get(&self, index: usize) -> Option<&CellValue> {
        self.cells.get(index)
    }
}

/// A cell value with type detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    /// Integer value
    Integer(i64),
    /// Floating-point value
    Float(f64),
    /// String value
    String(String),
    /// Empty/null cell
    Empty,
}

impl CellValue {
    /// Parse a string into a CellValue, detecting the type
    pub fn parse(s: &str) -> Self {
        let trimmed = s.trim();

        if trimmed.is_empty() {
            return CellValue::Empty;
        }

        if let Ok(i) = trimmed.parse::<i64>() {
            return CellValue::Integer(i);
        }

        // "nan"/"inf" parse as f64 but are text in these files
        if let Ok(f) = trimmed.parse::<f64>() {
            if f.is_finite() {
                return CellValue::Float(f);
            }
        }

        CellValue::String(trimmed.to_string())
    }

    /// Check if the cell is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Numeric view of the cell; `None` for text and empty cells
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Integer(i) => Some(*i as f64),
            CellValue::Float(f) => Some(*f),
            CellValue::String(_) | CellValue::Empty => None,
        }
    }

    /// Hashable identity of the value.
    ///
    /// Integers compare exactly. A float with no fractional part that fits
    /// in `i64` shares the integer's key, so `100` and `100.0` are equal.
    pub fn key(&self) -> CellKey {
        match self {
            CellValue::Empty => CellKey::Null,
            CellValue::String(s) => CellKey::Text(s.clone()),
            CellValue::Integer(i) => CellKey::Int(*i),
            CellValue::Float(f) => {
                // -0.0 lands on Int(0) here
                if f.fract() == 0.0 && *f >= I64_MIN_F && *f < I64_END_F {
                    CellKey::Int(*f as i64)
                } else {
                    CellKey::Float(f.to_bits())
                }
            }
        }
    }

    /// Convert to a display string
    pub fn to_string_value(&self) -> String {
        self.to_string()
    }
}

// i64::MIN and i64::MAX + 1 are both exact in f64
const I64_MIN_F: f64 = -9_223_372_036_854_775_808.0;
const I64_END_F: f64 = 9_223_372_036_854_775_808.0;

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Integer(i) => write!(f, "{}", i),
            // `{:?}` keeps the ".0" of whole numbers
            CellValue::Float(fl) => write!(f, "{:?}", fl),
            CellValue::String(s) => write!(f, "{}", s),
            CellValue::Empty => write!(f, ""),
        }
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Integer(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Float(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::String(value.to_string())
    }
}

/// Hashable identity of a cell, used for equality joins and duplicate grouping
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CellKey {
    Null,
    Int(i64),
    /// Bit pattern of a float that has no exact integer form
    Float(u64),
    Text(String),
}

impl CellKey {
    pub fn is_null(&self) -> bool {
        matches!(self, CellKey::Null)
    }
}
