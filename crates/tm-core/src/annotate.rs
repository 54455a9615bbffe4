//! Derived lower/upper bound columns for within-range join fields

use crate::config::ToleranceConfig;
use crate::error::{Error, Result};
use crate::margin::resolve_margin;
use crate::table::{CellValue, Table};

/// Names of the three columns derived for one range-joined input field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundColumns {
    pub margin: String,
    pub min: String,
    pub max: String,
}

impl BoundColumns {
    pub fn for_field(field: &str) -> Self {
        Self {
            margin: format!("{field}_margin"),
            min: format!("min_{field}"),
            max: format!("max_{field}"),
        }
    }
}

/// Return a copy of `input` with `{field}_margin`, `min_{field}` and
/// `max_{field}` columns attached.
///
/// Empty cells produce empty bounds, which never match. Text cells are a
/// `TypeMismatch`.
pub fn annotate(input: &Table, field: &str, config: &ToleranceConfig) -> Result<Table> {
    let index = input
        .column_index(field)
        .ok_or_else(|| Error::missing_column(&input.name, field))?;

    let row_count = input.row_count();
    let mut margins = Vec::with_capacity(row_count);
    let mut mins = Vec::with_capacity(row_count);
    let mut maxs = Vec::with_capacity(row_count);

    for (row_idx, row) in input.rows.iter().enumerate() {
        let cell = &row.cells[index];
        match cell.as_f64() {
            Some(value) => {
                let margin = resolve_margin(value, config);
                margins.push(CellValue::Float(margin));
                mins.push(CellValue::Float(value - margin));
                maxs.push(CellValue::Float(value + margin));
            }
            None if cell.is_empty() => {
                margins.push(CellValue::Empty);
                mins.push(CellValue::Empty);
                maxs.push(CellValue::Empty);
            }
            None => {
                return Err(Error::TypeMismatch {
                    table: input.name.clone(),
                    column: field.to_string(),
                    row: row_idx + 1,
                    value: cell.to_string_value(),
                });
            }
        }
    }

    let names = BoundColumns::for_field(field);
    let mut annotated = input.clone();
    annotated.set_column(&names.margin, margins);
    annotated.set_column(&names.min, mins);
    annotated.set_column(&names.max, maxs);
    Ok(annotated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Tier;

    fn depths() -> Table {
        let mut table = Table::with_columns("input", &["Station", "Depth"]);
        table.push_row(vec!["A".into(), CellValue::Integer(100)]);
        table.push_row(vec!["A".into(), CellValue::Float(300.0)]);
        table.push_row(vec!["B".into(), CellValue::Empty]);
        table
    }

    fn bounds(table: &Table, row: usize) -> (f64, f64, f64) {
        let get = |name: &str| table.value(row, name).and_then(CellValue::as_f64).unwrap();
        (get("Depth_margin"), get("min_Depth"), get("max_Depth"))
    }

    #[test]
    fn test_annotate_adds_three_columns() {
        let input = depths();
        let annotated = annotate(&input, "Depth", &ToleranceConfig::fixed(0.8)).unwrap();

        assert_eq!(
            annotated.column_names(),
            vec!["Station", "Depth", "Depth_margin", "min_Depth", "max_Depth"]
        );
        let (margin, min, max) = bounds(&annotated, 0);
        assert_eq!(margin, 0.8);
        assert!((min - 99.2).abs() < 1e-9);
        assert!((max - 100.8).abs() < 1e-9);
    }

    #[test]
    fn test_annotate_uses_tiers() {
        let config = ToleranceConfig::tiered(
            10.0,
            vec![Tier::new(0.0, 200.0, 0.5), Tier::new(200.0, 800.0, 2.0)],
        );
        let annotated = annotate(&depths(), "Depth", &config).unwrap();

        assert_eq!(bounds(&annotated, 0), (0.5, 99.5, 100.5));
        assert_eq!(bounds(&annotated, 1), (2.0, 298.0, 302.0));
    }

    #[test]
    fn test_annotate_leaves_caller_table_untouched() {
        let input = depths();
        let before = input.clone();
        let _ = annotate(&input, "Depth", &ToleranceConfig::fixed(0.8)).unwrap();
        assert_eq!(input, before);
    }

    #[test]
    fn test_empty_values_get_empty_bounds() {
        let annotated = annotate(&depths(), "Depth", &ToleranceConfig::fixed(0.8)).unwrap();
        assert_eq!(annotated.value(2, "min_Depth"), Some(&CellValue::Empty));
        assert_eq!(annotated.value(2, "max_Depth"), Some(&CellValue::Empty));
    }

    #[test]
    fn test_text_value_is_type_mismatch() {
        let mut input = depths();
        input.push_row(vec!["C".into(), "deep".into()]);

        let err = annotate(&input, "Depth", &ToleranceConfig::fixed(0.8)).unwrap_err();
        match err {
            Error::TypeMismatch { column, row, value, .. } => {
                assert_eq!(column, "Depth");
                assert_eq!(row, 4);
                assert_eq!(value, "deep");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_field_is_configuration_error() {
        let err = annotate(&depths(), "Pressure", &ToleranceConfig::fixed(1.0)).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_annotate_twice_for_two_fields() {
        let mut input = Table::with_columns("input", &["Depth", "Time"]);
        input.push_row(vec![CellValue::Integer(10), CellValue::Integer(1000)]);

        let once = annotate(&input, "Depth", &ToleranceConfig::fixed(1.0)).unwrap();
        let twice = annotate(&once, "Time", &ToleranceConfig::fixed(30.0)).unwrap();

        assert_eq!(twice.column_count(), 8);
        assert_eq!(twice.value(0, "min_Depth").and_then(CellValue::as_f64), Some(9.0));
        assert_eq!(twice.value(0, "max_Time").and_then(CellValue::as_f64), Some(1030.0));
    }
}
