//! Branchcount Fact Collector
//!
//! Collects the number of branches of each catalog entity's source
//! repository as a `branch:default/branch_count` fact.
//!
//! # Architecture
//!
//! ```text
//! Entities → SCM filter → (credentials → GraphQL query)* → Facts
//! ```
//!
//! # Key Features
//!
//! - **Hot-reloadable extractors**: `soundcheck.collectors.branch` is re-read
//!   on every configuration change
//! - **Per-entity isolation**: one tokio task per entity, failures are logged
//!   and skipped
//! - **Stable ordering**: facts come back in input order
//!
//! # Example Usage
//!
//! ```no_run
//! use branchcount_collector::BranchCountFactCollector;
//! use branchcount_domain::traits::FactCollector;
//! use branchcount_domain::Entity;
//! use branchcount_github::MockGithub;
//! use branchcount_store::AppConfig;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let github = MockGithub::new().with_repo("acme", "payments", 7);
//! let collector = BranchCountFactCollector::create(
//!     Arc::new(AppConfig::empty()),
//!     github.clone(),
//!     github,
//! )?;
//!
//! let entity = Entity::new("Component", "payments")
//!     .with_source_location("https://github.com/acme/payments/tree/main/");
//! let facts = collector.collect(&[entity], None).await?;
//! assert_eq!(facts[0].data["totalCount"], 7);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod collector;
mod error;
mod query;


pub use collector::{
    BranchCountFactCollector, BRANCH_COLLECTOR_CONFIG_PATH, BRANCH_COLLECTOR_ID,
    BRANCH_COUNT_FACT_NAME,
};
pub use error::EntityFailure;
pub use query::BRANCH_COUNT_QUERY;
