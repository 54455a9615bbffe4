//! Merge engine: build the plan, run the join, resolve ambiguous matches

use crate::config::{AmbiguityPolicy, JoinFieldSpec, MergeConfig};
use crate::error::Result;
use crate::executor::execute;
use crate::plan::{JoinPlan, PreparedJoin};
use crate::resolver::resolve;
use crate::table::Table;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Result of one merge
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// One row per base row: base columns, then the appended columns
    pub table: Table,
    /// The plan that produced the table
    pub plan: JoinPlan,
    /// Base rows with at least one matching input row
    pub matched_rows: usize,
    /// Base rows without any matching input row
    pub unmatched_rows: usize,
    /// Joined rows dropped while resolving ambiguous matches
    pub ambiguous_rows_removed: usize,
}

/// Joins an input table into a base table according to a list of join fields.
///
/// The engine holds only configuration; every `launch` works on its own copies.
#[derive(Debug, Clone)]
pub struct MergeEngine {
    join_fields: Vec<JoinFieldSpec>,
    policy: AmbiguityPolicy,
}

impl MergeEngine {
    pub fn new(join_fields: Vec<JoinFieldSpec>) -> Self {
        Self {
            join_fields,
            policy: AmbiguityPolicy::default(),
        }
    }

    pub fn from_config(config: &MergeConfig) -> Self {
        Self {
            join_fields: config.join_fields.clone(),
            policy: config.ambiguity,
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: AmbiguityPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn join_fields(&self) -> &[JoinFieldSpec] {
        &self.join_fields
    }

    pub fn policy(&self) -> AmbiguityPolicy {
        self.policy
    }

    /// Validate and plan without executing the join
    pub fn prepare(
        &self,
        base: &Table,
        input: &Table,
        fields_to_append: &[String],
    ) -> Result<PreparedJoin> {
        JoinPlan::build(&self.join_fields, base, input, fields_to_append)
    }

    /// Merge `input` into `base`.
    ///
    /// Fails with a configuration or type error before any row is joined; no
    /// partial result is ever returned.
    pub fn launch(
        &self,
        base: &Table,
        input: &Table,
        fields_to_append: &[String],
    ) -> Result<MergeOutcome> {
        let started = Instant::now();
        let elapsed_ms = || started.elapsed().as_millis() as u64;
        info!(
            base_rows = base.row_count(),
            input_rows = input.row_count(),
            join_fields = self.join_fields.len(),
            "merge launched"
        );

        let PreparedJoin { plan, input } = self.prepare(base, input, fields_to_append)?;
        for fragment in &plan.fragments {
            debug!(%fragment, "join fragment");
        }
        info!(
            elapsed_ms = elapsed_ms(),
            fragments = plan.fragments.len(),
            "join plan built"
        );

        let joined = execute(base, &input, &plan)?;
        let unmatched_rows = joined.rows.iter().filter(|r| r.input_index.is_none()).count();
        let matched_rows = base.row_count() - unmatched_rows;
        info!(
            elapsed_ms = elapsed_ms(),
            joined_rows = joined.row_count(),
            matched_rows,
            unmatched_rows,
            "tables joined"
        );

        let resolution = resolve(joined, &plan.key_fields, self.policy, &base.name)?;
        if resolution.removed > 0 {
            warn!(
                removed = resolution.removed,
                policy = ?self.policy,
                "ambiguous rows had to be removed"
            );
        }
        info!(
            elapsed_ms = elapsed_ms(),
            output_rows = resolution.table.row_count(),
            "merge done"
        );

        Ok(MergeOutcome {
            table: resolution.table,
            plan,
            matched_rows,
            unmatched_rows,
            ambiguous_rows_removed: resolution.removed,
        })
    }
}

/// Merge with the default ambiguity policy
pub fn launch(
    base: &Table,
    input: &Table,
    fields_to_append: &[String],
    join_fields: &[JoinFieldSpec],
) -> Result<MergeOutcome> {
    MergeEngine::new(join_fields.to_vec()).launch(base, input, fields_to_append)
}
