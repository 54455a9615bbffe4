//! Join plan construction
//!
//! Turns the declarative join field specs into typed predicates, validates
//! them against both tables, attaches range bounds to a private copy of the
//! input table and emits the AND-combined list of join fragments together
//! with the output projection.

use crate::annotate::{annotate, BoundColumns};
use crate::config::{JoinCondition, JoinFieldSpec, ToleranceConfig};
use crate::error::{Error, Result};
use crate::table::Table;
use std::collections::HashSet;
use std::fmt;

/// Suffix for appended columns whose name is already taken by a base column
pub const INPUT_SUFFIX: &str = "_input";

/// A validated join field
#[derive(Debug, Clone, PartialEq)]
pub enum JoinPredicate<'a> {
    Equality {
        base: &'a str,
        input: &'a str,
    },
    WithinRange {
        base: &'a str,
        input: &'a str,
        tolerance: &'a ToleranceConfig,
    },
}

impl<'a> JoinPredicate<'a> {
    /// Check the spec shape; column existence is checked by the plan
    pub fn from_spec(spec: &'a JoinFieldSpec) -> Result<Self> {
        match spec.condition {
            JoinCondition::Equality => Ok(JoinPredicate::Equality {
                base: &spec.field_in_base,
                input: &spec.field_in_input,
            }),
            JoinCondition::WithinRange => {
                let tolerance = spec.tolerance.as_ref().ok_or_else(|| {
                    Error::Configuration(format!(
                        "within-range field '{}' has no tolerance configuration",
                        spec.field_in_base
                    ))
                })?;
                tolerance.validate(&spec.field_in_base)?;
                Ok(JoinPredicate::WithinRange {
                    base: &spec.field_in_base,
                    input: &spec.field_in_input,
                    tolerance,
                })
            }
        }
    }

    pub fn base_field(&self) -> &'a str {
        match self {
            JoinPredicate::Equality { base, .. } | JoinPredicate::WithinRange { base, .. } => *base,
        }
    }

    pub fn input_field(&self) -> &'a str {
        match self {
            JoinPredicate::Equality { input, .. } | JoinPredicate::WithinRange { input, .. } => {
                *input
            }
        }
    }
}

/// One AND-ed term of the join condition, comparing a base column with an
/// input column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// `base = input`
    Equals { base: String, input: String },
    /// `base > input`, against a lower bound column
    Above { base: String, input: String },
    /// `base <= input`, against an upper bound column
    AtMost { base: String, input: String },
}

impl Fragment {
    pub fn base_column(&self) -> &str {
        match self {
            Fragment::Equals { base, .. }
            | Fragment::Above { base, .. }
            | Fragment::AtMost { base, .. } => base,
        }
    }

    pub fn input_column(&self) -> &str {
        match self {
            Fragment::Equals { input, .. }
            | Fragment::Above { input, .. }
            | Fragment::AtMost { input, .. } => input,
        }
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            Fragment::Equals { .. } => "=",
            Fragment::Above { .. } => ">",
            Fragment::AtMost { .. } => "<=",
        };
        write!(
            f,
            "base.'{}' {} input.'{}'",
            self.base_column(),
            op,
            self.input_column()
        )
    }
}

/// An input column copied into the result, possibly under another name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedColumn {
    /// Column name in the input table
    pub source: String,
    /// Column name in the merged table
    pub output: String,
}

/// Validated join condition and projection for one merge
#[derive(Debug, Clone, PartialEq)]
pub struct JoinPlan {
    /// AND-combined fragments, equality first
    pub fragments: Vec<Fragment>,
    /// Base-side join field names, in configuration order
    pub key_fields: Vec<String>,
    /// Appended input columns, in caller order
    pub projection: Vec<ProjectedColumn>,
}

/// A plan plus the bound-annotated copy of the input table it runs against
#[derive(Debug, Clone)]
pub struct PreparedJoin {
    pub plan: JoinPlan,
    pub input: Table,
}

impl JoinPlan {
    /// Validate the configuration against both tables and build the plan.
    ///
    /// Every configuration check runs before any input column is derived, so
    /// a bad configuration fails without partial work.
    pub fn build(
        specs: &[JoinFieldSpec],
        base: &Table,
        input: &Table,
        fields_to_append: &[String],
    ) -> Result<PreparedJoin> {
        if specs.is_empty() {
            return Err(Error::Configuration("no join fields configured".to_string()));
        }

        let predicates = specs
            .iter()
            .map(JoinPredicate::from_spec)
            .collect::<Result<Vec<_>>>()?;

        for predicate in &predicates {
            if base.find_column(predicate.base_field()).is_none() {
                return Err(Error::missing_column(&base.name, predicate.base_field()));
            }
            if input.find_column(predicate.input_field()).is_none() {
                return Err(Error::missing_column(&input.name, predicate.input_field()));
            }
        }

        let key_fields: Vec<String> = predicates
            .iter()
            .map(|p| p.base_field().to_string())
            .collect();
        let projection = build_projection(base, input, fields_to_append)?;

        for predicate in &predicates {
            if let JoinPredicate::WithinRange { base: field, .. } = predicate {
                check_numeric(base, field)?;
            }
        }

        let mut fragments = Vec::new();
        for predicate in &predicates {
            if let JoinPredicate::Equality {
                base: base_field,
                input: input_field,
            } = predicate
            {
                fragments.push(Fragment::Equals {
                    base: base_field.to_string(),
                    input: input_field.to_string(),
                });
            }
        }

        let mut annotated = input.clone();
        for predicate in &predicates {
            if let JoinPredicate::WithinRange {
                base: base_field,
                input: input_field,
                tolerance,
            } = predicate
            {
                annotated = annotate(&annotated, input_field, tolerance)?;
                let bounds = BoundColumns::for_field(input_field);
                fragments.push(Fragment::Above {
                    base: base_field.to_string(),
                    input: bounds.min,
                });
                fragments.push(Fragment::AtMost {
                    base: base_field.to_string(),
                    input: bounds.max,
                });
            }
        }

        Ok(PreparedJoin {
            plan: JoinPlan {
                fragments,
                key_fields,
                projection,
            },
            input: annotated,
        })
    }

    /// Output column names of the appended section
    pub fn output_columns(&self) -> Vec<&str> {
        self.projection.iter().map(|c| c.output.as_str()).collect()
    }
}

/// Input columns that can be appended: every column not used as an
/// input-side join field, in input order
pub fn candidate_fields(input: &Table, specs: &[JoinFieldSpec]) -> Vec<String> {
    input
        .columns
        .iter()
        .filter(|c| !specs.iter().any(|s| s.field_in_input == c.name))
        .map(|c| c.name.clone())
        .collect()
}

fn build_projection(
    base: &Table,
    input: &Table,
    fields_to_append: &[String],
) -> Result<Vec<ProjectedColumn>> {
    let mut taken: HashSet<String> = base.columns.iter().map(|c| c.name.clone()).collect();
    let mut projection = Vec::with_capacity(fields_to_append.len());

    for field in fields_to_append {
        if input.find_column(field).is_none() {
            return Err(Error::Configuration(format!(
                "field to append '{field}' not found in {} table",
                input.name
            )));
        }

        let output = if taken.contains(field.as_str()) {
            format!("{field}{INPUT_SUFFIX}")
        } else {
            field.clone()
        };
        if taken.contains(&output) {
            return Err(Error::Configuration(format!(
                "appended column '{output}' would appear twice in the result"
            )));
        }

        taken.insert(output.clone());
        projection.push(ProjectedColumn {
            source: field.clone(),
            output,
        });
    }

    Ok(projection)
}

fn check_numeric(table: &Table, field: &str) -> Result<()> {
    let Some(index) = table.column_index(field) else {
        return Err(Error::missing_column(&table.name, field));
    };
    for (row_idx, row) in table.rows.iter().enumerate() {
        let cell = &row.cells[index];
        if !cell.is_empty() && cell.as_f64().is_none() {
            return Err(Error::TypeMismatch {
                table: table.name.clone(),
                column: field.to_string(),
                row: row_idx + 1,
                value: cell.to_string_value(),
            });
        }
    }
    Ok(())
}
