//! Branchcount Domain Layer
//!
//! This crate contains the value objects and trait interfaces shared by every
//! other crate in the workspace. It holds no I/O: transports, configuration
//! files and HTTP live in the infrastructure crates.
//!
//! ## Key Concepts
//!
//! - **Entity**: A catalog-tracked software component, addressed by an [`EntityRef`]
//! - **Fact**: One timestamped observation about an entity, tagged with a [`FactRef`]
//! - **Extractor**: A declarative description of one thing to collect ([`ExtractorConfig`])
//! - **Collection config**: The host-facing descriptor of what an extractor
//!   produces and how often to run it ([`CollectionConfig`])
//!
//! ## Architecture
//!
//! - Pure value objects with explicit parse/serialize pairs
//! - Trait definitions for every external interaction (credentials, GraphQL
//!   transport, fact collectors)
//! - Infrastructure implementations live in other crates

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod entity;
pub mod error;
pub mod extractor;
pub mod fact;
pub mod filter;
pub mod scm;
pub mod traits;

// Re-exports for convenience
pub use entity::{
    Entity, EntityMetadata, EntityRef, DEFAULT_NAMESPACE, MANAGED_BY_LOCATION_ANNOTATION,
    SOURCE_LOCATION_ANNOTATION,
};
pub use error::{CollectError, RefParseError};
pub use extractor::{CachePolicy, CollectionConfig, DurationSpec, ExtractorConfig, Frequency};
pub use fact::{Fact, FactRef, JsonObject, DEFAULT_SCOPE};
pub use filter::{EntityFilter, FilterClause, FilterValues};
pub use scm::{RepoLocation, ScmCredentials};
