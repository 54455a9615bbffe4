//! Left outer join of the base table against the annotated input table

use crate::error::{Error, Result};
use crate::plan::{Fragment, JoinPlan};
use crate::table::{CellKey, CellValue, Column, Table};
use std::collections::HashMap;
use tracing::debug;

/// Join output before ambiguity resolution: one row per (base row, match),
/// or one null-filled row for a base row without match
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedTable {
    /// Base columns followed by the projected input columns
    pub columns: Vec<Column>,
    pub rows: Vec<JoinedRow>,
}

impl JoinedTable {
    /// Find a column by name
    pub fn find_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRow {
    /// Position of the originating row in the base table
    pub base_index: usize,
    /// Position of the matched row in the input table
    pub input_index: Option<usize>,
    pub cells: Vec<CellValue>,
}

#[derive(Debug, Clone, Copy)]
enum Comparison {
    Above,
    AtMost,
}

#[derive(Debug, Clone, Copy)]
struct BoundCheck {
    base: usize,
    input: usize,
    comparison: Comparison,
}

impl BoundCheck {
    /// Null on either side never satisfies a comparison
    fn holds(&self, base: &[CellValue], input: &[CellValue]) -> bool {
        match (base[self.base].as_f64(), input[self.input].as_f64()) {
            (Some(b), Some(i)) => match self.comparison {
                Comparison::Above => b > i,
                Comparison::AtMost => b <= i,
            },
            _ => false,
        }
    }
}

/// Input rows sharing one equality key, sorted by the probe lower bound
#[derive(Debug, Default)]
struct Bucket {
    rows: Vec<usize>,
    lower: Vec<f64>,
}

/// Hash index over the equality fragments with an optional sorted probe on
/// the first lower-bound fragment
struct InputIndex {
    equals: Vec<(usize, usize)>,
    probe: Option<BoundCheck>,
    buckets: HashMap<Vec<CellKey>, Bucket>,
}

impl InputIndex {
    fn build(input: &Table, equals: Vec<(usize, usize)>, probe: Option<BoundCheck>) -> Self {
        let mut unsorted: HashMap<Vec<CellKey>, Vec<(f64, usize)>> = HashMap::new();

        'rows: for (i, row) in input.rows.iter().enumerate() {
            let mut key = Vec::with_capacity(equals.len());
            for &(_, column) in &equals {
                let part = row.cells[column].key();
                if part.is_null() {
                    continue 'rows;
                }
                key.push(part);
            }

            let lower = match probe {
                Some(check) => match row.cells[check.input].as_f64() {
                    Some(lower) => lower,
                    None => continue,
                },
                None => f64::NEG_INFINITY,
            };
            unsorted.entry(key).or_default().push((lower, i));
        }

        let buckets = unsorted
            .into_iter()
            .map(|(key, mut entries)| {
                // stable, so equal bounds keep input order
                entries.sort_by(|a, b| a.0.total_cmp(&b.0));
                let (lower, rows): (Vec<f64>, Vec<usize>) = entries.into_iter().unzip();
                (key, Bucket { rows, lower })
            })
            .collect();

        Self {
            equals,
            probe,
            buckets,
        }
    }

    /// Input rows whose equality key matches and whose probe bound lies below
    /// the base value. Other fragments still have to be checked.
    fn candidates(&self, base: &[CellValue]) -> &[usize] {
        let mut key = Vec::with_capacity(self.equals.len());
        for &(column, _) in &self.equals {
            let part = base[column].key();
            if part.is_null() {
                return &[];
            }
            key.push(part);
        }

        let Some(bucket) = self.buckets.get(&key) else {
            return &[];
        };

        match self.probe {
            Some(check) => match base[check.base].as_f64() {
                Some(value) => {
                    let end = bucket.lower.partition_point(|&lower| lower < value);
                    &bucket.rows[..end]
                }
                None => &[],
            },
            None => &bucket.rows,
        }
    }
}

fn column_of(table: &Table, name: &str) -> Result<usize> {
    table
        .column_index(name)
        .ok_or_else(|| Error::missing_column(&table.name, name))
}

/// Run the plan as a left outer join.
///
/// Every base row yields at least one output row. Matches of one base row
/// are emitted in input-table order.
pub fn execute(base: &Table, input: &Table, plan: &JoinPlan) -> Result<JoinedTable> {
    let mut equals = Vec::new();
    let mut checks = Vec::new();
    for fragment in &plan.fragments {
        let base_column = column_of(base, fragment.base_column())?;
        let input_column = column_of(input, fragment.input_column())?;
        let comparison = match fragment {
            Fragment::Equals { .. } => {
                equals.push((base_column, input_column));
                continue;
            }
            Fragment::Above { .. } => Comparison::Above,
            Fragment::AtMost { .. } => Comparison::AtMost,
        };
        checks.push(BoundCheck {
            base: base_column,
            input: input_column,
            comparison,
        });
    }

    let projected = plan
        .projection
        .iter()
        .map(|p| column_of(input, &p.source))
        .collect::<Result<Vec<_>>>()?;

    let probe = checks
        .iter()
        .copied()
        .find(|c| matches!(c.comparison, Comparison::Above));
    let index = InputIndex::build(input, equals, probe);

    let mut columns = base.columns.clone();
    for (offset, column) in plan.projection.iter().enumerate() {
        columns.push(Column::new(column.output.clone(), base.column_count() + offset));
    }

    let mut rows = Vec::with_capacity(base.row_count());
    let mut matched_base_rows = 0;
    for (base_index, base_row) in base.rows.iter().enumerate() {
        let mut matches: Vec<usize> = index
            .candidates(&base_row.cells)
            .iter()
            .copied()
            .filter(|&i| {
                checks
                    .iter()
                    .all(|check| check.holds(&base_row.cells, &input.rows[i].cells))
            })
            .collect();
        matches.sort_unstable();

        if matches.is_empty() {
            let mut cells = base_row.cells.clone();
            cells.resize(columns.len(), CellValue::Empty);
            rows.push(JoinedRow {
                base_index,
                input_index: None,
                cells,
            });
            continue;
        }

        matched_base_rows += 1;
        for input_index in matches {
            let input_row = &input.rows[input_index];
            let mut cells = base_row.cells.clone();
            cells.extend(projected.iter().map(|&c| input_row.cells[c].clone()));
            rows.push(JoinedRow {
                base_index,
                input_index: Some(input_index),
                cells,
            });
        }
    }

    debug!(
        base_rows = base.row_count(),
        matched_base_rows,
        joined_rows = rows.len(),
        "join evaluated"
    );

    Ok(JoinedTable { columns, rows })
}
