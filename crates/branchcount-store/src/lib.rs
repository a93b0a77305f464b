//! Branchcount Configuration Layer
//!
//! Loads collector configuration, validates it against a collector schema and
//! keeps a hot-reloadable `fact name -> ExtractorConfig` mapping.
//!
//! # Architecture
//!
//! - [`ConfigSource`] abstracts the configuration tree; [`AppConfig`] backs it
//!   with YAML, TOML or JSON files and notifies subscribers on change
//! - [`CollectorSchema`] accepts one collector block or a list of them, each
//!   with one extractor or a list of extractors
//! - [`ExtractorsStore`] rebuilds its mapping from scratch on every change
//!
//! # Examples
//!
//! ```
//! use branchcount_store::{branch_count_schema, AppConfig, ExtractorsStore};
//! use std::sync::Arc;
//!
//! let config = Arc::new(AppConfig::from_yaml_str(r#"
//! soundcheck:
//!   collectors:
//!     branch:
//!       frequency:
//!         cron: "0 * * * *"
//!       collects:
//!         - type: branchDescriptor
//!           factName: branch_count
//! "#).unwrap());
//!
//! let store = ExtractorsStore::create(config, "soundcheck.collectors.branch", branch_count_schema()).unwrap();
//! let extractor = store.extractor_config("branch_count").unwrap();
//! assert_eq!(extractor.frequency.unwrap().cron, "0 * * * *");
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod map;
pub mod schema;
pub mod store;

pub use config::{expand_env_vars, AppConfig, ConfigFormat, ConfigSource, Listener, ListenerRegistry, Subscription};
pub use error::{ConfigError, SchemaError, SchemaIssue, StoreError};
pub use map::build_extractor_config_map;
pub use schema::{
    branch_count_schema, CollectorBlock, CollectorSchema, ExtractorChoice, ExtractorDescriptor,
    ExtractorKind, OneOrMany,
};
pub use store::{ExtractorsStore, ReloadHandle};
