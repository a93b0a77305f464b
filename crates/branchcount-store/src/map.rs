//! Extractor config map builder
//!
//! Flattens validated collector blocks into the `fact name -> ExtractorConfig`
//! mapping a store serves. Extractor-level `filter`, `frequency` and `cache`
//! override the values of the enclosing block.

use crate::error::{SchemaError, SchemaIssue};
use crate::schema::CollectorBlock;
use branchcount_domain::ExtractorConfig;
use std::collections::BTreeMap;

/// Build the extractor config map
///
/// # Errors
/// Returns a [`SchemaError`] naming every duplicated fact name.
pub fn build_extractor_config_map(
    blocks: &[CollectorBlock],
) -> Result<BTreeMap<String, ExtractorConfig>, SchemaError> {
    let mut configs = BTreeMap::new();
    let mut issues = Vec::new();

    for block in blocks {
        for extractor in &block.collects {
            if configs.contains_key(&extractor.fact_name) {
                issues.push(SchemaIssue::new(
                    format!("{}.factName", extractor.path),
                    format!("duplicate fact name '{}'", extractor.fact_name),
                ));
                continue;
            }

            let config = ExtractorConfig {
                fact_name: extractor.fact_name.clone(),
                r#type: extractor.r#type.clone(),
                filter: extractor.filter.clone().or_else(|| block.filter.clone()),
                frequency: extractor.frequency.clone().or_else(|| block.frequency.clone()),
                cache: extractor.cache.clone().or_else(|| block.cache.clone()),
            };
            configs.insert(config.fact_name.clone(), config);
        }
    }

    if issues.is_empty() {
        Ok(configs)
    } else {
        Err(SchemaError { issues })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::branch_count_schema;
    use branchcount_domain::{CachePolicy, Frequency};
    use serde_json::json;

    #[test]
    fn test_block_values_are_inherited() {
        let blocks = branch_count_schema()
            .validate(&json!({
                "frequency": { "cron": "0 * * * *" },
                "cache": true,
                "collects": { "type": "branchDescriptor", "factName": "branch_count" }
            }))
            .unwrap();

        let map = build_extractor_config_map(&blocks).unwrap();
        let config = &map["branch_count"];
        assert_eq!(config.frequency, Some(Frequency { cron: "0 * * * *".into() }));
        assert_eq!(config.cache, Some(CachePolicy::Toggle(true)));
        assert_eq!(config.r#type, "branchDescriptor");
    }

    #[test]
    fn test_extractor_values_override_block() {
        let blocks = branch_count_schema()
            .validate(&json!({
                "frequency": { "cron": "0 * * * *" },
                "collects": [
                    { "type": "branchDescriptor", "factName": "hourly" },
                    {
                        "type": "branchDescriptor",
                        "factName": "daily",
                        "frequency": { "cron": "0 0 * * *" }
                    }
                ]
            }))
            .unwrap();

        let map = build_extractor_config_map(&blocks).unwrap();
        assert_eq!(map["hourly"].frequency.as_ref().unwrap().cron, "0 * * * *");
        assert_eq!(map["daily"].frequency.as_ref().unwrap().cron, "0 0 * * *");
    }

    #[test]
    fn test_duplicate_fact_names_rejected() {
        let blocks = branch_count_schema()
            .validate(&json!([
                { "collects": { "type": "branchDescriptor", "factName": "branch_count" } },
                { "collects": { "type": "branchDescriptor", "factName": "branch_count" } }
            ]))
            .unwrap();

        let err = build_extractor_config_map(&blocks).unwrap_err();
        assert!(err.has_issue_at("[1].collects.factName"));
    }

    #[test]
    fn test_empty_blocks_yield_empty_map() {
        assert!(build_extractor_config_map(&[]).unwrap().is_empty());
    }
}
