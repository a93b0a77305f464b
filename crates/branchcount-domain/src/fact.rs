//! Fact module - timestamped observations about entities

use crate::{EntityRef, ExtractorConfig, RefParseError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scope used when a fact reference does not name one
pub const DEFAULT_SCOPE: &str = "default";

/// Structured fact identifier `{source, scope, name}`
///
/// The canonical string form is `source:scope/name`. Equality is defined on
/// the decoded triple, so two references that parse to the same components
/// are equal regardless of how they were written (`branch:count` and
/// `branch:default/count` are the same reference).
///
/// # Examples
///
/// ```
/// use branchcount_domain::FactRef;
///
/// let fact_ref: FactRef = "branch:default/branch_count".parse().unwrap();
/// assert_eq!(fact_ref.source(), "branch");
/// assert_eq!(fact_ref.name(), "branch_count");
/// assert_eq!(fact_ref.to_string(), "branch:default/branch_count");
///
/// let short: FactRef = "branch:branch_count".parse().unwrap();
/// assert_eq!(short, fact_ref);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FactRef {
    source: String,
    scope: String,
    name: String,
}

impl FactRef {
    /// Create a fact reference from its components
    ///
    /// # Errors
    /// Returns an error if any component is empty or contains `:` or `/`.
    pub fn new(
        source: impl Into<String>,
        scope: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self, RefParseError> {
        let source = validate_component("source", source.into())?;
        let scope = validate_component("scope", scope.into())?;
        let name = validate_component("name", name.into())?;
        Ok(Self { source, scope, name })
    }

    /// Build the reference a collector declares for one of its extractors
    ///
    /// The scope is always [`DEFAULT_SCOPE`].
    pub fn for_extractor(source: &str, config: &ExtractorConfig) -> Result<Self, RefParseError> {
        Self::new(source, DEFAULT_SCOPE, config.fact_name.as_str())
    }

    /// Collector that produces this fact
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Scope of the fact
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Fact name
    pub fn name(&self) -> &str {
        &self.name
    }
}

fn validate_component(component: &'static str, value: String) -> Result<String, RefParseError> {
    if value.is_empty() {
        return Err(RefParseError::MissingComponent {
            component,
            input: value,
        });
    }
    if value.contains(':') || value.contains('/') {
        return Err(RefParseError::InvalidComponent { component, value });
    }
    Ok(value)
}

impl fmt::Display for FactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.source, self.scope, self.name)
    }
}

impl FromStr for FactRef {
    type Err = RefParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(RefParseError::Empty);
        }

        let (source, rest) = s.split_once(':').ok_or_else(|| RefParseError::MissingComponent {
            component: "source",
            input: s.to_string(),
        })?;

        let (scope, name) = match rest.split_once('/') {
            Some((scope, name)) => (scope, name),
            None => (DEFAULT_SCOPE, rest),
        };

        Self::new(source, scope, name)
    }
}

impl TryFrom<String> for FactRef {
    type Error = RefParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FactRef> for String {
    fn from(value: FactRef) -> Self {
        value.to_string()
    }
}

/// JSON object payload carried by a [`Fact`]
pub type JsonObject = serde_json::Map<String, serde_json::Value>;

/// One observation about an entity
///
/// Facts are created fresh by every collection run and are owned by the
/// caller once returned; collectors never retain them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fact {
    /// Which metric this is
    pub fact_ref: FactRef,

    /// Subject entity
    pub entity_ref: EntityRef,

    /// Payload, shape owned by the producing collector
    pub data: JsonObject,

    /// Instant of collection (UTC)
    pub timestamp: DateTime<Utc>,
}

impl Fact {
    /// Create a fact stamped with the current UTC time
    pub fn new(entity_ref: EntityRef, fact_ref: FactRef, data: JsonObject) -> Self {
        Self {
            fact_ref,
            entity_ref,
            data,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fact_ref_display() {
        let fact_ref = FactRef::new("branch", "default", "branch_count").unwrap();
        assert_eq!(fact_ref.to_string(), "branch:default/branch_count");
    }

    #[test]
    fn test_fact_ref_default_scope() {
        let fact_ref: FactRef = "github:open_prs".parse().unwrap();
        assert_eq!(fact_ref.scope(), DEFAULT_SCOPE);
    }

    #[test]
    fn test_fact_ref_rejects_invalid() {
        assert_eq!("".parse::<FactRef>(), Err(RefParseError::Empty));
        assert!("no_source".parse::<FactRef>().is_err());
        assert!(":default/name".parse::<FactRef>().is_err());
        assert!("branch:default/".parse::<FactRef>().is_err());
        assert!("branch:a/b/c".parse::<FactRef>().is_err());
        assert!(FactRef::new("bra:nch", "default", "x").is_err());
    }

    #[test]
    fn test_fact_ref_for_extractor() {
        let config = ExtractorConfig {
            fact_name: "branch_count".to_string(),
            r#type: "branchDescriptor".to_string(),
            filter: None,
            frequency: None,
            cache: None,
        };
        let fact_ref = FactRef::for_extractor("branch", &config).unwrap();
        assert_eq!(fact_ref.to_string(), "branch:default/branch_count");
    }

    #[test]
    fn test_fact_serializes_refs_as_strings() {
        let entity_ref: EntityRef = "component:default/service-a".parse().unwrap();
        let fact_ref = FactRef::new("branch", "default", "branch_count").unwrap();
        let data = json!({ "totalCount": 7 }).as_object().cloned().unwrap();

        let fact = Fact::new(entity_ref, fact_ref, data);
        let value = serde_json::to_value(&fact).unwrap();

        assert_eq!(value["factRef"], "branch:default/branch_count");
        assert_eq!(value["entityRef"], "component:default/service-a");
        assert_eq!(value["data"]["totalCount"], 7);

        let timestamp = value["timestamp"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(timestamp).is_ok());
    }

    #[test]
    fn test_fact_deserialize_rejects_bad_ref() {
        let result: Result<Fact, _> = serde_json::from_value(json!({
            "factRef": "not-a-ref",
            "entityRef": "component:default/a",
            "data": {},
            "timestamp": "2024-01-01T00:00:00Z"
        }));
        assert!(result.is_err());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: display then parse yields the same triple
        #[test]
        fn test_fact_ref_string_roundtrip(
            source in "[a-z][a-z0-9_-]{0,15}",
            scope in "[a-z][a-z0-9_-]{0,15}",
            name in "[a-zA-Z0-9_-]{1,24}",
        ) {
            let fact_ref = FactRef::new(source, scope, name).unwrap();
            let parsed: FactRef = fact_ref.to_string().parse().unwrap();
            prop_assert_eq!(fact_ref, parsed);
        }
    }
}
