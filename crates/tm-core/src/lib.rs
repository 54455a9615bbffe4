//! tm-core: Core library for merging a secondary table into a reference table
//!
//! This library provides functionality to:
//! - Parse delimited files into structured tables
//! - Describe join fields mixing exact equality and tolerance-based matching
//! - Resolve tiered margins of error and derive per-row match windows
//! - Run a left outer join and collapse ambiguous matches deterministically
//! - Export the merged table and a run report

pub mod annotate;
pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod export;
pub mod margin;
pub mod parser;
pub mod plan;
pub mod report;
pub mod resolver;
pub mod table;

pub use annotate::{annotate, BoundColumns};
pub use config::{
    AmbiguityPolicy, JoinCondition, JoinFieldSpec, MergeConfig, OutputConfig, SourceConfig, Tier,
    ToleranceConfig,
};
pub use engine::{launch, MergeEngine, MergeOutcome};
pub use error::{Error, Result};
pub use executor::{execute, JoinedRow, JoinedTable};
pub use export::{write_delimited, write_delimited_to, write_json};
pub use margin::resolve_margin;
pub use parser::{parse_csv, parse_csv_str, Encoding, ReadOptions};
pub use plan::{candidate_fields, Fragment, JoinPlan, JoinPredicate, PreparedJoin, ProjectedColumn};
pub use report::MergeReport;
pub use resolver::{resolve, Resolution};
pub use table::{CellKey, CellValue, Column, Row, Table};
