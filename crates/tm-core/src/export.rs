//! Writers for merged tables

use crate::error::{Error, Result};
use crate::table::Table;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write a table as delimited text with a header row
pub fn write_delimited<P: AsRef<Path>>(table: &Table, path: P, delimiter: u8) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    write_delimited_to(table, BufWriter::new(file), delimiter).map_err(|e| match e {
        Error::Csv { source, .. } => Error::Csv {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })
}

/// Write a table as delimited text to any writer
pub fn write_delimited_to<W: Write>(table: &Table, writer: W, delimiter: u8) -> Result<()> {
    let to_error = |source: csv::Error| Error::Csv {
        path: table.name.clone().into(),
        source,
    };

    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(writer);

    csv_writer
        .write_record(table.columns.iter().map(|c| c.name.as_str()))
        .map_err(to_error)?;
    for row in &table.rows {
        csv_writer
            .write_record(row.cells.iter().map(|c| c.to_string_value()))
            .map_err(to_error)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write a table as a JSON array of objects keyed by column name
pub fn write_json<P: AsRef<Path>>(table: &Table, path: P) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &to_records(table))?;
    writeln!(writer)?;
    Ok(())
}

/// Rows as JSON objects; empty cells become `null`
pub fn to_records(table: &Table) -> Vec<serde_json::Map<String, serde_json::Value>> {
    use crate::table::CellValue;
    use serde_json::Value;

    table
        .rows
        .iter()
        .map(|row| {
            table
                .columns
                .iter()
                .zip(&row.cells)
                .map(|(column, cell)| {
                    let value = match cell {
                        CellValue::Integer(i) => Value::from(*i),
                        CellValue::Float(f) => Value::from(*f),
                        CellValue::String(s) => Value::from(s.as_str()),
                        CellValue::Empty => Value::Null,
                    };
                    (column.name.clone(), value)
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::CellValue;

    fn merged() -> Table {
        let mut table = Table::with_columns("merged", &["Station", "Depth", "O2"]);
        table.push_row(vec!["A".into(), CellValue::Integer(100), CellValue::Float(5.1)]);
        table.push_row(vec!["B, east".into(), CellValue::Float(12.5), CellValue::Empty]);
        table
    }

    #[test]
    fn test_write_tab_separated() {
        let mut out = Vec::new();
        write_delimited_to(&merged(), &mut out, b'\t').unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Station\tDepth\tO2\nA\t100\t5.1\nB, east\t12.5\t\n"
        );
    }

    #[test]
    fn test_write_csv_quotes_delimiters() {
        let mut out = Vec::new();
        write_delimited_to(&merged(), &mut out, b',').unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\"B, east\",12.5,"));
    }

    #[test]
    fn test_records_use_null_for_empty() {
        let records = to_records(&merged());

        assert_eq!(records[0]["Depth"], serde_json::json!(100));
        assert_eq!(records[1]["O2"], serde_json::Value::Null);
    }

    #[test]
    fn test_write_files() {
        let dir = tempfile::tempdir().unwrap();
        let tsv = dir.path().join("output.txt");
        let json = dir.path().join("output.json");

        write_delimited(&merged(), &tsv, b'\t').unwrap();
        write_json(&merged(), &json).unwrap();

        assert!(std::fs::read_to_string(&tsv).unwrap().starts_with("Station\tDepth"));
        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&json).unwrap()).unwrap();
        assert_eq!(parsed.as_array().map(Vec::len), Some(2));
    }
}
