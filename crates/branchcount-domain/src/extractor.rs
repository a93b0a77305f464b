//! Extractor and collection configuration
//!
//! An [`ExtractorConfig`] is one declared "thing to collect". A
//! [`CollectionConfig`] is what a collector hands to the host so it knows what
//! is produced and how often to run it.

use crate::{EntityFilter, FactRef};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Collection cadence
///
/// ```
/// use branchcount_domain::Frequency;
///
/// let hourly = Frequency { cron: "0 * * * *".to_string() };
/// assert!(hourly.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Frequency {
    /// Cron expression (5 or 6 fields)
    pub cron: String,
}

impl Frequency {
    /// Validate the cron expression shape
    pub fn validate(&self) -> Result<(), String> {
        let fields = self.cron.split_whitespace().count();
        if fields == 0 {
            return Err("cron expression cannot be empty".to_string());
        }
        if !(5..=6).contains(&fields) {
            return Err(format!("cron expression must have 5 or 6 fields, found {}", fields));
        }
        Ok(())
    }
}

/// Duration expressed as calendar-ish components
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DurationSpec {
    /// Days
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days: Option<u64>,
    /// Hours
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours: Option<u64>,
    /// Minutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minutes: Option<u64>,
    /// Seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seconds: Option<u64>,
}

impl DurationSpec {
    /// Total length as a [`Duration`], `None` if it overflows
    pub fn as_duration(&self) -> Option<Duration> {
        let secs = self
            .days
            .unwrap_or(0)
            .checked_mul(86_400)?
            .checked_add(self.hours.unwrap_or(0).checked_mul(3_600)?)?
            .checked_add(self.minutes.unwrap_or(0).checked_mul(60)?)?
            .checked_add(self.seconds.unwrap_or(0))?;
        Some(Duration::from_secs(secs))
    }
}

/// Cache policy for collected facts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CachePolicy {
    /// Caching on (host default TTL) or off
    Toggle(bool),
    /// Cache for an explicit duration
    Ttl {
        /// Time to keep a fact before recollecting
        duration: DurationSpec,
    },
}

impl CachePolicy {
    /// Validate the policy
    pub fn validate(&self) -> Result<(), String> {
        match self {
            CachePolicy::Toggle(_) => Ok(()),
            CachePolicy::Ttl { duration } => match duration.as_duration() {
                None => Err("cache duration is too large".to_string()),
                Some(ttl) if ttl.is_zero() => Err("cache duration must be greater than 0".to_string()),
                Some(_) => Ok(()),
            },
        }
    }

    /// Explicit TTL, if one is configured and representable
    pub fn ttl(&self) -> Option<Duration> {
        match self {
            CachePolicy::Toggle(_) => None,
            CachePolicy::Ttl { duration } => duration.as_duration(),
        }
    }

    /// Whether caching is enabled at all
    pub fn is_enabled(&self) -> bool {
        !matches!(self, CachePolicy::Toggle(false))
    }
}

/// One declared extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractorConfig {
    /// Fact name, unique within a configuration snapshot
    pub fact_name: String,

    /// Descriptor kind tag (e.g. `branchDescriptor`)
    pub r#type: String,

    /// Entities this extractor applies to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<EntityFilter>,

    /// Collection cadence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<Frequency>,

    /// Cache policy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<CachePolicy>,
}

/// Host-facing collection descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionConfig {
    /// Facts produced (never empty)
    pub fact_refs: Vec<FactRef>,

    /// Entities to collect for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<EntityFilter>,

    /// Collection cadence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<Frequency>,

    /// Cache policy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<CachePolicy>,
}

impl CollectionConfig {
    /// Describe a single extractor of the collector identified by `source`
    pub fn for_extractor(source: &str, config: &ExtractorConfig) -> Result<Self, crate::RefParseError> {
        Ok(Self {
            fact_refs: vec![FactRef::for_extractor(source, config)?],
            filter: config.filter.clone(),
            frequency: config.frequency.clone(),
            cache: config.cache.clone(),
        })
    }
}
