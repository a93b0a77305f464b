//! Collector configuration schema
//!
//! [`CollectorSchema::build`] turns an [`ExtractorChoice`] (the extractor
//! shapes a collector understands) into a validator for a collector's whole
//! configuration section. The section is either one block or a non-empty list
//! of blocks:
//!
//! ```yaml
//! frequency:
//!   cron: "0 * * * *"
//! filter:
//!   kind: Component
//! cache: true
//! collects:
//!   type: branchDescriptor
//!   factName: branch_count
//! ```
//!
//! Validation is pure and reports every violated path, not just the first.

use crate::error::{SchemaError, SchemaIssue};
use branchcount_domain::{CachePolicy, EntityFilter, Frequency};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::OnceLock;
use tracing::debug;

const BLOCK_KEYS: &[&str] = &["frequency", "filter", "cache", "collects"];
const EXTRACTOR_KEYS: &[&str] = &["factName", "type", "frequency", "filter", "cache"];

/// A value that may be written either bare or as a list
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    /// A list of values
    Many(Vec<T>),
    /// A single value
    One(T),
}

impl<T> OneOrMany<T> {
    /// Normalize to a list
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }

    /// Whether the value was written as a list
    pub fn is_many(&self) -> bool {
        matches!(self, OneOrMany::Many(_))
    }
}

/// One concrete extractor shape, identified by its `type` pattern
#[derive(Debug, Clone)]
pub struct ExtractorKind {
    name: String,
    type_pattern: Regex,
}

impl ExtractorKind {
    /// Create a kind whose `type` must match `pattern` (unanchored)
    pub fn new(name: impl Into<String>, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.into(),
            type_pattern: Regex::new(pattern)?,
        })
    }

    /// Kind name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether a `type` value selects this kind
    pub fn accepts(&self, ty: &str) -> bool {
        self.type_pattern.is_match(ty)
    }
}

/// Union of extractor shapes a collector accepts
#[derive(Debug, Clone)]
pub struct ExtractorChoice {
    kinds: Vec<ExtractorKind>,
}

impl ExtractorChoice {
    /// A choice with one kind
    pub fn of(kind: ExtractorKind) -> Self {
        Self { kinds: vec![kind] }
    }

    /// Add an alternative kind
    pub fn or(mut self, kind: ExtractorKind) -> Self {
        self.kinds.push(kind);
        self
    }

    /// First kind accepting the `type` value
    pub fn select(&self, ty: &str) -> Option<&ExtractorKind> {
        self.kinds.iter().find(|kind| kind.accepts(ty))
    }

    fn describe(&self) -> String {
        let patterns: Vec<&str> = self.kinds.iter().map(|k| k.type_pattern.as_str()).collect();
        patterns.join(" | ")
    }
}

/// A validated extractor declaration
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractorDescriptor {
    /// Where it was declared (for diagnostics)
    pub path: String,
    /// Name of the [`ExtractorKind`] that matched
    pub kind: String,
    /// Declared fact name
    pub fact_name: String,
    /// Declared `type` tag
    pub r#type: String,
    /// Extractor-level filter override
    pub filter: Option<EntityFilter>,
    /// Extractor-level frequency override
    pub frequency: Option<Frequency>,
    /// Extractor-level cache override
    pub cache: Option<CachePolicy>,
}

/// A validated configuration block
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CollectorBlock {
    /// Block-level cadence
    pub frequency: Option<Frequency>,
    /// Block-level filter
    pub filter: Option<EntityFilter>,
    /// Block-level cache policy
    pub cache: Option<CachePolicy>,
    /// Extractors declared by the block
    pub collects: Vec<ExtractorDescriptor>,
}

/// Validator for a collector's configuration section
#[derive(Debug, Clone)]
pub struct CollectorSchema {
    choice: ExtractorChoice,
}

impl CollectorSchema {
    /// Build a validator for the given extractor choice
    pub fn build(choice: ExtractorChoice) -> Self {
        Self { choice }
    }

    /// Validate a configuration section
    ///
    /// # Errors
    /// Returns every issue found across all blocks and extractors.
    pub fn validate(&self, value: &Value) -> Result<Vec<CollectorBlock>, SchemaError> {
        let mut issues = Vec::new();

        let shape: OneOrMany<Value> = match serde_json::from_value(value.clone()) {
            Ok(shape) => shape,
            Err(e) => {
                return Err(SchemaError {
                    issues: vec![SchemaIssue::new("", e.to_string())],
                })
            }
        };

        let is_list = shape.is_many();
        let items = shape.into_vec();
        if is_list && items.is_empty() {
            issues.push(SchemaIssue::new("", "expected at least one collector block"));
        }

        let mut blocks = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let path = if is_list { format!("[{}]", index) } else { String::new() };
            if let Some(block) = self.validate_block(item, &path, &mut issues) {
                blocks.push(block);
            }
        }

        if issues.is_empty() {
            Ok(blocks)
        } else {
            Err(SchemaError { issues })
        }
    }

    fn validate_block(&self, value: &Value, path: &str, issues: &mut Vec<SchemaIssue>) -> Option<CollectorBlock> {
        let Some(object) = value.as_object() else {
            issues.push(SchemaIssue::new(path, "expected an object"));
            return None;
        };
        let before = issues.len();

        skip_unknown_keys(object, BLOCK_KEYS, path);

        let frequency = optional_field(object, "frequency", path, issues, Frequency::validate);
        let filter = optional_field(object, "filter", path, issues, EntityFilter::validate);
        let cache = optional_field(object, "cache", path, issues, CachePolicy::validate);

        let mut collects = Vec::new();
        if let Some(raw) = object.get("collects").filter(|v| !v.is_null()) {
            let collects_path = join(path, "collects");
            match raw {
                Value::Array(items) if items.is_empty() => {
                    issues.push(SchemaIssue::new(&collects_path, "expected at least one extractor"));
                }
                Value::Array(items) => {
                    for (index, item) in items.iter().enumerate() {
                        let item_path = format!("{}[{}]", collects_path, index);
                        if let Some(extractor) = self.validate_extractor(item, &item_path, issues) {
                            collects.push(extractor);
                        }
                    }
                }
                item => {
                    if let Some(extractor) = self.validate_extractor(item, &collects_path, issues) {
                        collects.push(extractor);
                    }
                }
            }
        }

        (issues.len() == before).then_some(CollectorBlock {
            frequency,
            filter,
            cache,
            collects,
        })
    }

    fn validate_extractor(
        &self,
        value: &Value,
        path: &str,
        issues: &mut Vec<SchemaIssue>,
    ) -> Option<ExtractorDescriptor> {
        let Some(object) = value.as_object() else {
            issues.push(SchemaIssue::new(path, "expected an extractor object"));
            return None;
        };
        let before = issues.len();

        skip_unknown_keys(object, EXTRACTOR_KEYS, path);

        let fact_name = required_string(object, "factName", path, issues);
        if let Some(name) = &fact_name {
            if !fact_name_pattern().is_match(name) {
                issues.push(SchemaIssue::new(
                    join(path, "factName"),
                    format!("'{}' may only contain letters, digits, '_' and '-'", name),
                ));
            }
        }

        let ty = required_string(object, "type", path, issues);
        let kind = ty.as_deref().and_then(|ty| {
            let kind = self.choice.select(ty);
            if kind.is_none() {
                issues.push(SchemaIssue::new(
                    join(path, "type"),
                    format!("'{}' does not match {}", ty, self.choice.describe()),
                ));
            }
            kind
        });

        let frequency = optional_field(object, "frequency", path, issues, Frequency::validate);
        let filter = optional_field(object, "filter", path, issues, EntityFilter::validate);
        let cache = optional_field(object, "cache", path, issues, CachePolicy::validate);

        if issues.len() != before {
            return None;
        }

        Some(ExtractorDescriptor {
            path: path.to_string(),
            kind: kind?.name().to_string(),
            fact_name: fact_name?,
            r#type: ty?,
            filter,
            frequency,
            cache,
        })
    }
}

/// Schema of the branch collector: one `branchDescriptor` extractor kind
pub fn branch_count_schema() -> CollectorSchema {
    static SCHEMA: OnceLock<CollectorSchema> = OnceLock::new();
    SCHEMA
        .get_or_init(|| {
            let kind = ExtractorKind::new("branch", "branchDescriptor")
                .expect("branch descriptor pattern is valid");
            CollectorSchema::build(ExtractorChoice::of(kind))
        })
        .clone()
}

fn fact_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("fact name pattern is valid"))
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

/// Keys outside the schema are dropped, not rejected
fn skip_unknown_keys(object: &Map<String, Value>, known: &[&str], path: &str) {
    for key in object.keys().filter(|k| !known.contains(&k.as_str())) {
        debug!(key = %join(path, key), "Ignoring unrecognized collector config key");
    }
}

fn required_string(object: &Map<String, Value>, key: &str, path: &str, issues: &mut Vec<SchemaIssue>) -> Option<String> {
    match object.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::String(_)) => {
            issues.push(SchemaIssue::new(join(path, key), "cannot be empty"));
            None
        }
        None | Some(Value::Null) => {
            issues.push(SchemaIssue::new(join(path, key), "required"));
            None
        }
        Some(other) => {
            issues.push(SchemaIssue::new(join(path, key), format!("expected a string, found {}", other)));
            None
        }
    }
}

fn optional_field<T: DeserializeOwned>(
    object: &Map<String, Value>,
    key: &str,
    path: &str,
    issues: &mut Vec<SchemaIssue>,
    validate: fn(&T) -> Result<(), String>,
) -> Option<T> {
    let raw = object.get(key).filter(|v| !v.is_null())?;
    let field_path = join(path, key);
    match serde_json::from_value::<T>(raw.clone()) {
        Ok(parsed) => match validate(&parsed) {
            Ok(()) => Some(parsed),
            Err(message) => {
                issues.push(SchemaIssue::new(field_path, message));
                None
            }
        },
        Err(e) => {
            issues.push(SchemaIssue::new(field_path, e.to_string()));
            None
        }
    }
}
