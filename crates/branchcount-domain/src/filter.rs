//! Entity filters
//!
//! A filter is one object or a list of objects mapping dotted entity field
//! paths to accepted values:
//!
//! ```yaml
//! filter:
//!   - kind: Component
//!     spec.type: [service, website]
//!   - kind: API
//! ```
//!
//! Keys inside one object are ANDed, objects in a list are ORed, and value
//! comparison is case-insensitive.

use crate::Entity;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A single string or a list of strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValues {
    /// One accepted value
    One(String),
    /// Several accepted values
    Many(Vec<String>),
}

impl FilterValues {
    fn as_slice(&self) -> &[String] {
        match self {
            FilterValues::One(value) => std::slice::from_ref(value),
            FilterValues::Many(values) => values,
        }
    }
}

/// One filter object: every key must match
pub type FilterClause = BTreeMap<String, FilterValues>;

/// Entity filter in its one-or-many form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityFilter {
    /// A single clause
    Single(FilterClause),
    /// Any of several clauses
    Any(Vec<FilterClause>),
}

impl EntityFilter {
    /// All clauses of the filter
    pub fn clauses(&self) -> &[FilterClause] {
        match self {
            EntityFilter::Single(clause) => std::slice::from_ref(clause),
            EntityFilter::Any(clauses) => clauses,
        }
    }

    /// Validate the filter shape
    pub fn validate(&self) -> Result<(), String> {
        let clauses = self.clauses();
        if clauses.is_empty() {
            return Err("filter must contain at least one clause".to_string());
        }
        for clause in clauses {
            if clause.is_empty() {
                return Err("filter clause cannot be empty".to_string());
            }
            for (path, values) in clause {
                if path.is_empty() {
                    return Err("filter key cannot be empty".to_string());
                }
                if values.as_slice().is_empty() {
                    return Err(format!("filter key '{}' has no values", path));
                }
            }
        }
        Ok(())
    }

    /// Whether the entity satisfies the filter
    pub fn matches(&self, entity: &Entity) -> bool {
        let Ok(value) = serde_json::to_value(entity) else {
            return false;
        };
        self.clauses()
            .iter()
            .any(|clause| clause.iter().all(|(path, accepted)| field_matches(&value, path, accepted)))
    }
}

fn field_matches(entity: &Value, path: &str, accepted: &FilterValues) -> bool {
    let Some(field) = lookup(entity, path) else {
        return false;
    };

    let candidates: Vec<&Value> = match field {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };

    candidates.iter().filter_map(|v| scalar_string(v)).any(|actual| {
        accepted
            .as_slice()
            .iter()
            .any(|expected| expected.eq_ignore_ascii_case(&actual))
    })
}

/// Resolve a dotted path; annotation-style keys containing dots are tried
/// whole before splitting further
fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let object = value.as_object()?;
    if let Some(found) = object.get(path) {
        return Some(found);
    }
    let (head, rest) = path.split_once('.')?;
    lookup(object.get(head)?, rest)
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn service() -> Entity {
        serde_json::from_value(json!({
            "apiVersion": "backstage.io/v1alpha1",
            "kind": "Component",
            "metadata": {
                "name": "payments",
                "tags": ["java", "payments"],
                "annotations": { "github.com/project-slug": "acme/payments" }
            },
            "spec": { "type": "service", "lifecycle": "production" }
        }))
        .unwrap()
    }

    fn filter(value: Value) -> EntityFilter {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_single_clause_all_keys_must_match() {
        assert!(filter(json!({ "kind": "component", "spec.type": "service" })).matches(&service()));
        assert!(!filter(json!({ "kind": "component", "spec.type": "website" })).matches(&service()));
    }

    #[test]
    fn test_any_clause_matches() {
        let f = filter(json!([{ "kind": "API" }, { "spec.lifecycle": ["experimental", "production"] }]));
        assert!(f.matches(&service()));
    }

    #[test]
    fn test_array_fields_match_any_element() {
        assert!(filter(json!({ "metadata.tags": "JAVA" })).matches(&service()));
        assert!(!filter(json!({ "metadata.tags": "go" })).matches(&service()));
    }

    #[test]
    fn test_dotted_annotation_keys() {
        let f = filter(json!({ "metadata.annotations.github.com/project-slug": "acme/payments" }));
        assert!(f.matches(&service()));
    }

    #[test]
    fn test_missing_field_does_not_match() {
        assert!(!filter(json!({ "spec.owner": "team-a" })).matches(&service()));
    }

    #[test]
    fn test_validate_rejects_empty() {
        assert!(filter(json!([])).validate().is_err());
        assert!(filter(json!({})).validate().is_err());
        assert!(filter(json!({ "kind": [] })).validate().is_err());
        assert!(filter(json!({ "kind": "Component" })).validate().is_ok());
    }
}
