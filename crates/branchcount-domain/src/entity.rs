//! Catalog entities and entity references

use crate::RefParseError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Namespace used when an entity or reference does not name one
pub const DEFAULT_NAMESPACE: &str = "default";

/// Annotation holding the entity's source-code location (`url:<target>`)
pub const SOURCE_LOCATION_ANNOTATION: &str = "backstage.io/source-location";

/// Annotation holding the location the entity was registered from
pub const MANAGED_BY_LOCATION_ANNOTATION: &str = "backstage.io/managed-by-location";

/// Canonical reference to a catalog entity `{kind, namespace, name}`
///
/// String form is `kind:namespace/name`. Kind and namespace are
/// case-insensitive and normalized to lower case; the name is kept verbatim.
///
/// # Examples
///
/// ```
/// use branchcount_domain::EntityRef;
///
/// let entity_ref: EntityRef = "Component:default/payments".parse().unwrap();
/// assert_eq!(entity_ref.to_string(), "component:default/payments");
///
/// let short: EntityRef = "component:payments".parse().unwrap();
/// assert_eq!(short, entity_ref);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityRef {
    kind: String,
    namespace: String,
    name: String,
}

impl EntityRef {
    /// Create a reference from its components
    ///
    /// # Errors
    /// Returns an error if any component is empty or contains `:` or `/`.
    pub fn new(kind: &str, namespace: &str, name: &str) -> Result<Self, RefParseError> {
        Ok(Self {
            kind: check("kind", kind)?.to_lowercase(),
            namespace: check("namespace", namespace)?.to_lowercase(),
            name: check("name", name)?.to_string(),
        })
    }

    /// Entity kind (lower case)
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Entity namespace (lower case)
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Entity name
    pub fn name(&self) -> &str {
        &self.name
    }
}

fn check<'a>(component: &'static str, value: &'a str) -> Result<&'a str, RefParseError> {
    if value.is_empty() {
        return Err(RefParseError::MissingComponent {
            component,
            input: value.to_string(),
        });
    }
    if value.contains(':') || value.contains('/') {
        return Err(RefParseError::InvalidComponent {
            component,
            value: value.to_string(),
        });
    }
    Ok(value)
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.kind, self.namespace, self.name)
    }
}

impl FromStr for EntityRef {
    type Err = RefParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(RefParseError::Empty);
        }

        let (kind, rest) = s.split_once(':').ok_or_else(|| RefParseError::MissingComponent {
            component: "kind",
            input: s.to_string(),
        })?;

        match rest.split_once('/') {
            Some((namespace, name)) => Self::new(kind, namespace, name),
            None => Self::new(kind, DEFAULT_NAMESPACE, rest),
        }
    }
}

impl TryFrom<String> for EntityRef {
    type Error = RefParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EntityRef> for String {
    fn from(value: EntityRef) -> Self {
        value.to_string()
    }
}

/// Entity metadata block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityMetadata {
    /// Entity name, unique within kind and namespace
    pub name: String,

    /// Namespace (defaults to `default`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Display title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Annotations (`backstage.io/source-location`, ...)
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,

    /// Labels
    #[serde(default)]
    pub labels: BTreeMap<String, String>,

    /// Tags
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A catalog entity
///
/// Only the fields fact collection relies on are typed; `spec` stays free-form
/// JSON so entities of any kind deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    /// Schema version (e.g. `backstage.io/v1alpha1`)
    pub api_version: String,

    /// Entity kind (e.g. `Component`)
    pub kind: String,

    /// Metadata block
    pub metadata: EntityMetadata,

    /// Kind-specific spec
    #[serde(default)]
    pub spec: serde_json::Value,
}

impl Entity {
    /// Create a minimal entity of the given kind
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            api_version: "backstage.io/v1alpha1".to_string(),
            kind: kind.into(),
            metadata: EntityMetadata {
                name: name.into(),
                ..Default::default()
            },
            spec: serde_json::Value::Null,
        }
    }

    /// Add an annotation (builder style)
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.annotations.insert(key.into(), value.into());
        self
    }

    /// Set the `backstage.io/source-location` annotation to `url:<url>`
    pub fn with_source_location(self, url: &str) -> Self {
        self.with_annotation(SOURCE_LOCATION_ANNOTATION, format!("url:{}", url))
    }

    /// Canonical reference to this entity
    ///
    /// # Errors
    /// Returns an error if kind or name is empty or malformed.
    pub fn entity_ref(&self) -> Result<EntityRef, RefParseError> {
        let namespace = self
            .metadata
            .namespace
            .as_deref()
            .filter(|ns| !ns.is_empty())
            .unwrap_or(DEFAULT_NAMESPACE);
        EntityRef::new(&self.kind, namespace, &self.metadata.name)
    }

    /// Source-control URL of the entity, if it is SCM-backed
    ///
    /// Reads the source-location annotation, falling back to the
    /// managed-by-location annotation. Only `url:` locations count; `file:`
    /// and other location types yield `None`.
    pub fn scm_url(&self) -> Option<&str> {
        [SOURCE_LOCATION_ANNOTATION, MANAGED_BY_LOCATION_ANNOTATION]
            .iter()
            .filter_map(|key| self.metadata.annotations.get(*key))
            .find_map(|location| match location.split_once(':') {
                Some(("url", target)) if !target.trim().is_empty() => Some(target.trim()),
                _ => None,
            })
    }

    /// Whether the entity has a resolvable source-control URL
    pub fn is_scm_entity(&self) -> bool {
        self.scm_url().is_some()
    }
}
