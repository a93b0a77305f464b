//! Branch count GraphQL query and response handling

use crate::error::EntityFailure;
use branchcount_domain::{JsonObject, RepoLocation};
use serde_json::{json, Value};

/// Counts the branches of one repository without fetching any of them
pub const BRANCH_COUNT_QUERY: &str = r#"query numBranches($owner: String!, $repo: String!) {
  repository(owner: $owner, name: $repo) {
    refs(first: 0, refPrefix: "refs/heads/") {
      totalCount
    }
  }
}"#;

/// Query variables for a repository
pub fn variables(location: &RepoLocation) -> Value {
    json!({ "owner": location.owner, "repo": location.name })
}

/// Extract the `repository.refs` object from a query's `data`
///
/// The object must contain an integer `totalCount`; it becomes the fact
/// payload unchanged.
pub fn branch_refs(data: &Value) -> Result<JsonObject, EntityFailure> {
    let repository = data
        .get("repository")
        .filter(|v| !v.is_null())
        .ok_or_else(|| EntityFailure::Response("repository not found".to_string()))?;

    let refs = repository
        .get("refs")
        .and_then(Value::as_object)
        .ok_or_else(|| EntityFailure::Response("repository.refs is not an object".to_string()))?;

    match refs.get("totalCount") {
        Some(count) if count.is_u64() => Ok(refs.clone()),
        Some(other) => Err(EntityFailure::Response(format!(
            "totalCount is not a non-negative integer: {}",
            other
        ))),
        None => Err(EntityFailure::Response("refs.totalCount is missing".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_counts_heads_only() {
        assert!(BRANCH_COUNT_QUERY.contains(r#"refs(first: 0, refPrefix: "refs/heads/")"#));
        assert!(BRANCH_COUNT_QUERY.contains("totalCount"));
    }

    #[test]
    fn test_variables() {
        let location: RepoLocation = "https://github.com/acme/payments".parse().unwrap();
        assert_eq!(variables(&location), json!({ "owner": "acme", "repo": "payments" }));
    }

    #[test]
    fn test_branch_refs_payload() {
        let refs = branch_refs(&json!({ "repository": { "refs": { "totalCount": 7 } } })).unwrap();
        assert_eq!(Value::Object(refs), json!({ "totalCount": 7 }));
    }

    #[test]
    fn test_branch_refs_rejects_bad_shapes() {
        for data in [
            json!({}),
            json!({ "repository": null }),
            json!({ "repository": { "refs": 3 } }),
            json!({ "repository": { "refs": {} } }),
            json!({ "repository": { "refs": { "totalCount": "7" } } }),
            json!({ "repository": { "refs": { "totalCount": -1 } } }),
        ] {
            assert!(
                matches!(branch_refs(&data), Err(EntityFailure::Response(_))),
                "accepted {}",
                data
            );
        }
    }
}
