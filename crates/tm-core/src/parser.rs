//! Delimited-file reader producing `Table`s

use crate::error::{Error, Result};
use crate::table::{CellValue, Column, Row, Table};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Character encoding of a source file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    #[default]
    #[serde(alias = "utf-8")]
    Utf8,
    /// ISO-8859-1
    #[serde(alias = "iso-8859-1")]
    Latin1,
}

impl Encoding {
    fn label(self) -> &'static str {
        match self {
            Encoding::Utf8 => "UTF-8",
            Encoding::Latin1 => "ISO-8859-1",
        }
    }

    fn decode(self, bytes: &[u8]) -> Option<String> {
        match self {
            Encoding::Utf8 => std::str::from_utf8(bytes).ok().map(str::to_string),
            Encoding::Latin1 => Some(encoding_rs::mem::decode_latin1(bytes).into_owned()),
        }
    }
}

/// How to read a delimited file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    pub delimiter: u8,
    pub encoding: Encoding,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            encoding: Encoding::Utf8,
        }
    }
}

/// Parse a delimited file into a Table named after the file
pub fn parse_csv<P: AsRef<Path>>(path: P, options: &ReadOptions) -> Result<Table> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("table")
        .to_string();
    read_table(BufReader::new(file), name, path.to_path_buf(), options)
}

/// Parse delimited text from a string (useful for testing)
pub fn parse_csv_str(content: &str, source_name: &str, options: &ReadOptions) -> Result<Table> {
    read_table(
        content.as_bytes(),
        source_name.to_string(),
        PathBuf::from(source_name),
        options,
    )
}

fn read_table<R: Read>(
    reader: R,
    name: String,
    path: PathBuf,
    options: &ReadOptions,
) -> Result<Table> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(options.delimiter)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader
        .byte_headers()
        .map_err(|e| Error::Csv {
            path: path.clone(),
            source: e,
        })?
        .clone();

    let mut columns = Vec::with_capacity(headers.len());
    for (i, raw) in headers.iter().enumerate() {
        let header = decode_field(raw, options.encoding, &path, 0)?;
        columns.push(Column::new(header.trim().to_string(), i));
    }

    if columns.is_empty() || columns.iter().all(|c| c.name.is_empty()) {
        return Err(Error::CsvParse {
            path,
            message: "no columns found".to_string(),
        });
    }

    let mut rows = Vec::new();
    for (row_idx, result) in csv_reader.byte_records().enumerate() {
        let record = result.map_err(|e| Error::Csv {
            path: path.clone(),
            source: e,
        })?;

        let mut cells = Vec::with_capacity(columns.len());
        for raw in record.iter() {
            let field = decode_field(raw, options.encoding, &path, row_idx + 1)?;
            cells.push(CellValue::parse(&field));
        }

        if cells.len() > columns.len() {
            warn!(
                row = row_idx + 1,
                path = %path.display(),
                "row has more cells than columns, truncating"
            );
        }
        cells.resize(columns.len(), CellValue::Empty);

        rows.push(Row::new(cells));
    }

    Ok(Table {
        name,
        columns,
        rows,
    })
}

fn decode_field(raw: &[u8], encoding: Encoding, path: &Path, record: usize) -> Result<String> {
    encoding.decode(raw).ok_or_else(|| Error::Encoding {
        path: path.to_path_buf(),
        record,
        encoding: encoding.label(),
    })
}
