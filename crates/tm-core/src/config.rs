//! Join configuration
//!
//! The configuration is plain data: a list of join field specs plus a few
//! options, stored as JSON. Key names used by older configuration files
//! (`FieldNameInBase`, `SpecialConditionConfig`, ...) are accepted as aliases.

use crate::error::{Error, Result};
use crate::parser::{Encoding, ReadOptions};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// How a base field is compared with an input field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinCondition {
    /// `base.F = input.G`
    #[serde(alias = "Equality")]
    Equality,
    /// `input.min_G < base.F <= input.max_G`
    #[serde(alias = "WithinRange")]
    WithinRange,
}

impl std::fmt::Display for JoinCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Equality => write!(f, "equality"),
            Self::WithinRange => write!(f, "within_range"),
        }
    }
}

/// One band of the tiered tolerance table: values in `(min, max]` get `margin`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tier {
    pub min: f64,
    pub max: f64,
    #[serde(alias = "margin +/-")]
    pub margin: f64,
}

impl Tier {
    pub fn new(min: f64, max: f64, margin: f64) -> Self {
        Self { min, max, margin }
    }

    /// Low end exclusive, high end inclusive
    pub fn contains(&self, value: f64) -> bool {
        self.min < value && value <= self.max
    }
}

/// Tolerance settings for a within-range join field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToleranceConfig {
    /// Margin used when no tier matches, or always when `always_use_default` is set
    #[serde(alias = "defaultMarginValue")]
    pub default_margin: f64,
    #[serde(default, alias = "alwaysUseDefaultValue")]
    pub always_use_default: bool,
    /// Searched in declaration order, first match wins
    #[serde(default, alias = "marginErrorVariationsConfig")]
    pub tiers: Vec<Tier>,
}

impl ToleranceConfig {
    /// A flat margin with no tiers
    pub fn fixed(margin: f64) -> Self {
        Self {
            default_margin: margin,
            always_use_default: true,
            tiers: Vec::new(),
        }
    }

    /// A tiered margin table falling back to `default_margin`
    pub fn tiered(default_margin: f64, tiers: Vec<Tier>) -> Self {
        Self {
            default_margin,
            always_use_default: false,
            tiers,
        }
    }

    /// Reject a default margin that is not a number.
    ///
    /// Tiers are not checked: a tier that can never match just leaves its
    /// values to the default margin.
    pub fn validate(&self, field: &str) -> Result<()> {
        if !self.default_margin.is_finite() {
            return Err(Error::Configuration(format!(
                "field '{field}': default margin must be a finite number, got {}",
                self.default_margin
            )));
        }
        Ok(())
    }
}

/// A declared pairing of one base column with one input column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinFieldSpec {
    #[serde(alias = "FieldNameInBase")]
    pub field_in_base: String,
    #[serde(alias = "FieldNameInInput")]
    pub field_in_input: String,
    #[serde(alias = "JoinCondition")]
    pub condition: JoinCondition,
    /// Required for `WithinRange`, ignored for `Equality`
    #[serde(
        default,
        alias = "SpecialConditionConfig",
        skip_serializing_if = "Option::is_none"
    )]
    pub tolerance: Option<ToleranceConfig>,
}

impl JoinFieldSpec {
    pub fn equality(field_in_base: impl Into<String>, field_in_input: impl Into<String>) -> Self {
        Self {
            field_in_base: field_in_base.into(),
            field_in_input: field_in_input.into(),
            condition: JoinCondition::Equality,
            tolerance: None,
        }
    }

    pub fn within_range(
        field_in_base: impl Into<String>,
        field_in_input: impl Into<String>,
        tolerance: ToleranceConfig,
    ) -> Self {
        Self {
            field_in_base: field_in_base.into(),
            field_in_input: field_in_input.into(),
            condition: JoinCondition::WithinRange,
            tolerance: Some(tolerance),
        }
    }
}

/// Rule for collapsing several matches of one base row into one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguityPolicy {
    /// Keep the first match of every base row
    #[default]
    PerBaseRow,
    /// Keep the first row of every distinct base join-key tuple, which also
    /// collapses base rows that share join-key values
    PerJoinKey,
}

/// Reading options for one side, as stored in the configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    #[serde(default)]
    pub encoding: Encoding,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            encoding: Encoding::default(),
        }
    }
}

impl SourceConfig {
    pub fn read_options(&self) -> Result<ReadOptions> {
        Ok(ReadOptions {
            delimiter: delimiter_byte(self.delimiter)?,
            encoding: self.encoding,
        })
    }
}

/// Output options as stored in the configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_delimiter")]
    pub delimiter: char,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            delimiter: default_output_delimiter(),
        }
    }
}

impl OutputConfig {
    pub fn delimiter_byte(&self) -> Result<u8> {
        delimiter_byte(self.delimiter)
    }
}

fn default_delimiter() -> char {
    ','
}

fn default_output_delimiter() -> char {
    '\t'
}

fn delimiter_byte(c: char) -> Result<u8> {
    if c.is_ascii() {
        Ok(c as u8)
    } else {
        Err(Error::Configuration(format!(
            "delimiter '{c}' is not a single-byte ASCII character"
        )))
    }
}

/// Complete merge configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeConfig {
    pub join_fields: Vec<JoinFieldSpec>,
    #[serde(default)]
    pub fields_to_append: Vec<String>,
    #[serde(default)]
    pub ambiguity: AmbiguityPolicy,
    #[serde(default)]
    pub base: SourceConfig,
    #[serde(default)]
    pub input: SourceConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl MergeConfig {
    /// Create a configuration from join fields, with default options
    pub fn new(join_fields: Vec<JoinFieldSpec>) -> Self {
        Self {
            join_fields,
            fields_to_append: Vec::new(),
            ambiguity: AmbiguityPolicy::default(),
            base: SourceConfig::default(),
            input: SourceConfig::default(),
            output: OutputConfig::default(),
        }
    }

    /// Station/depth matching of CTD casts: stations must be equal and depths
    /// must agree within 0.8 m
    pub fn template() -> Self {
        let depth_tolerance = ToleranceConfig {
            default_margin: 0.8,
            always_use_default: true,
            tiers: vec![
                Tier::new(0.0, 200.0, 0.8),
                Tier::new(200.0, 800.0, 0.8),
                Tier::new(800.0, 2000.0, 0.8),
                Tier::new(2000.0, 1_000_000.0, 0.8),
            ],
        };
        let latin1 = SourceConfig {
            delimiter: ';',
            encoding: Encoding::Latin1,
        };
        Self {
            join_fields: vec![
                JoinFieldSpec::equality("Station", "Station"),
                JoinFieldSpec::within_range("Depth [m]", "Depth [m]", depth_tolerance),
            ],
            fields_to_append: Vec::new(),
            ambiguity: AmbiguityPolicy::PerBaseRow,
            base: latin1.clone(),
            input: latin1,
            output: OutputConfig::default(),
        }
    }

    /// Load a configuration from JSON
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        Self::from_json(&content)
    }

    /// Parse a configuration from a JSON string
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(Error::Json)
    }

    /// Save the configuration to JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "join_fields": [
                { "field_in_base": "Station", "field_in_input": "Station", "condition": "equality" },
                { "field_in_base": "Depth", "field_in_input": "Depth", "condition": "within_range",
                  "tolerance": { "default_margin": 0.8, "tiers": [ { "min": 0, "max": 200, "margin": 0.5 } ] } }
            ],
            "fields_to_append": ["O2"],
            "ambiguity": "per_join_key",
            "input": { "delimiter": ";", "encoding": "latin1" }
        }"#;
        let config = MergeConfig::from_json(json).unwrap();

        assert_eq!(config.join_fields.len(), 2);
        assert_eq!(config.join_fields[0].condition, JoinCondition::Equality);
        let tolerance = config.join_fields[1].tolerance.as_ref().unwrap();
        assert!(!tolerance.always_use_default);
        assert_eq!(tolerance.tiers, vec![Tier::new(0.0, 200.0, 0.5)]);
        assert_eq!(config.fields_to_append, vec!["O2"]);
        assert_eq!(config.ambiguity, AmbiguityPolicy::PerJoinKey);
        assert_eq!(config.base, SourceConfig::default());
        assert_eq!(config.input.delimiter, ';');
        assert_eq!(config.input.encoding, Encoding::Latin1);
        assert_eq!(config.output.delimiter, '\t');
    }

    #[test]
    fn test_parse_legacy_key_names() {
        let json = r#"{
            "join_fields": [
                { "FieldNameInBase": "Depth [m]", "FieldNameInInput": "Depth [m]",
                  "JoinCondition": "WithinRange",
                  "SpecialConditionConfig": {
                      "defaultMarginValue": 0.8,
                      "alwaysUseDefaultValue": true,
                      "marginErrorVariationsConfig": [ { "min": 0, "max": 200, "margin +/-": 0.8 } ]
                  } }
            ]
        }"#;
        let config = MergeConfig::from_json(json).unwrap();
        let spec = &config.join_fields[0];

        assert_eq!(spec.condition, JoinCondition::WithinRange);
        let tolerance = spec.tolerance.as_ref().unwrap();
        assert!(tolerance.always_use_default);
        assert_eq!(tolerance.tiers[0].margin, 0.8);
    }

    #[test]
    fn test_within_range_without_tolerance_parses() {
        // rejected later, at launch
        let json = r#"{ "join_fields": [
            { "field_in_base": "d", "field_in_input": "d", "condition": "within_range" }
        ] }"#;
        let config = MergeConfig::from_json(json).unwrap();
        assert!(config.join_fields[0].tolerance.is_none());
    }

    #[test]
    fn test_unknown_condition_rejected() {
        let json = r#"{ "join_fields": [
            { "field_in_base": "d", "field_in_input": "d", "condition": "fuzzy" }
        ] }"#;
        assert!(MergeConfig::from_json(json).is_err());
    }

    #[test]
    fn test_tier_bounds() {
        let tier = Tier::new(0.0, 200.0, 0.8);
        assert!(tier.contains(200.0));
        assert!(tier.contains(0.0001));
        assert!(!tier.contains(0.0));
        assert!(!tier.contains(200.0001));
    }

    #[test]
    fn test_validate_tolerance() {
        assert!(ToleranceConfig::fixed(0.8).validate("d").is_ok());
        assert!(ToleranceConfig::fixed(f64::NAN).validate("d").unwrap_err().is_configuration());
        assert!(ToleranceConfig::fixed(f64::INFINITY).validate("d").is_err());

        // degenerate and inverted tiers never match, which is allowed
        let degenerate = ToleranceConfig::tiered(
            0.8,
            vec![Tier::new(5000.0, 5000.0, 0.1), Tier::new(10.0, 5.0, -1.0)],
        );
        assert!(degenerate.validate("d").is_ok());
    }

    #[test]
    fn test_template_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("merge.json");

        let config = MergeConfig::template();
        config.save(&path).unwrap();
        let loaded = MergeConfig::load(&path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_non_ascii_delimiter_rejected() {
        let source = SourceConfig {
            delimiter: '§',
            encoding: Encoding::Utf8,
        };
        assert!(source.read_options().unwrap_err().is_configuration());
    }
}
