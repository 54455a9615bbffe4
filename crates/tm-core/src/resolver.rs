//! Collapse multiple matches of a base row into one

use crate::config::AmbiguityPolicy;
use crate::error::{Error, Result};
use crate::executor::JoinedTable;
use crate::table::{CellKey, Row, Table};
use std::collections::HashSet;

/// Resolved table and how many joined rows were dropped to get there
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub table: Table,
    pub removed: usize,
}

/// Keep the first joined row of every group and drop the rest.
///
/// Rows are grouped by the base-side values of `key_fields` (nulls compare
/// equal here); under `PerBaseRow` the originating base row is part of the
/// group as well. Join-output order decides which row survives.
pub fn resolve(
    joined: JoinedTable,
    key_fields: &[String],
    policy: AmbiguityPolicy,
    name: &str,
) -> Result<Resolution> {
    let key_columns = key_fields
        .iter()
        .map(|field| {
            joined
                .find_column(field)
                .map(|c| c.index)
                .ok_or_else(|| Error::missing_column(name, field))
        })
        .collect::<Result<Vec<_>>>()?;

    let initial = joined.rows.len();
    let mut seen: HashSet<(Option<usize>, Vec<CellKey>)> = HashSet::with_capacity(initial);
    let mut rows = Vec::with_capacity(initial);

    for row in joined.rows {
        let origin = match policy {
            AmbiguityPolicy::PerBaseRow => Some(row.base_index),
            AmbiguityPolicy::PerJoinKey => None,
        };
        let key: Vec<CellKey> = key_columns.iter().map(|&c| row.cells[c].key()).collect();
        if seen.insert((origin, key)) {
            rows.push(Row::new(row.cells));
        }
    }

    let removed = initial - rows.len();
    Ok(Resolution {
        table: Table {
            name: name.to_string(),
            columns: joined.columns,
            rows,
        },
        removed,
    })
}
