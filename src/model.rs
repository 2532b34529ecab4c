// Core structs: Snapshot and the errors an update run can hit
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Categorical result for one region of the tracked contest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegionOutcome {
    Biden,
    Trump,
    Tied,
    InProgress,
    NoResults,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollegeVotes {
    pub biden: u32,
    pub trump: u32,
    /// Units not yet called. Only present when a rule for it is configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopularVotes {
    pub biden: u64,
    pub trump: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMeta {
    pub url: String,
    /// Update time reported by the page itself, if it could be read.
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    pub updated: Option<DateTime<Utc>>,
    /// When the fetch for this snapshot began.
    #[serde(rename = "cacheTimestamp", with = "chrono::serde::ts_milliseconds")]
    pub cache_timestamp: DateTime<Utc>,
}

/// Everything the extractor pulls out of one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFields {
    pub college: CollegeVotes,
    pub popular: PopularVotes,
    pub regions: BTreeMap<String, RegionOutcome>,
    pub reported_update: Option<DateTime<Utc>>,
}

/// One immutable extraction result, as served to readers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub college: CollegeVotes,
    pub popular: PopularVotes,
    pub states: BTreeMap<String, RegionOutcome>,
    pub source: SourceMeta,
}

impl Snapshot {
    /// Builds a snapshot from extracted fields plus the fetch start time.
    pub fn assemble(fields: ExtractedFields, source_url: &str, fetched_at: DateTime<Utc>) -> Self {
        Self {
            college: fields.college,
            popular: fields.popular,
            states: fields.regions,
            source: SourceMeta {
                url: source_url.to_string(),
                updated: fields.reported_update,
                cache_timestamp: fetched_at,
            },
        }
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("request timed out")]
    Timeout,
    #[error("upstream responded with status {0}")]
    Status(u16),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("no element found for {field}")]
    MissingNode { field: &'static str },
    #[error("could not read a number for {field} from {text:?}")]
    InvalidNumber { field: &'static str, text: String },
}

/// Reasons an update run is aborted.
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fields() -> ExtractedFields {
        let mut regions = BTreeMap::new();
        regions.insert("PA".to_string(), RegionOutcome::Biden);
        regions.insert("GA".to_string(), RegionOutcome::InProgress);
        ExtractedFields {
            college: CollegeVotes { biden: 270, trump: 268, remaining: None },
            popular: PopularVotes { biden: 81_000_000, trump: 74_000_000 },
            regions,
            reported_update: None,
        }
    }

    #[test]
    fn assemble_stamps_source() {
        let fetched = Utc.with_ymd_and_hms(2020, 11, 4, 16, 0, 0).unwrap();
        let snapshot = Snapshot::assemble(fields(), "https://example.test/results", fetched);

        assert_eq!(snapshot.source.url, "https://example.test/results");
        assert_eq!(snapshot.source.cache_timestamp, fetched);
        assert_eq!(snapshot.source.updated, None);
        assert_eq!(snapshot.states.len(), 2);
    }

    #[test]
    fn serializes_in_served_shape() {
        let fetched = Utc.with_ymd_and_hms(2020, 11, 4, 16, 0, 0).unwrap();
        let snapshot = Snapshot::assemble(fields(), "https://example.test/results", fetched);
        let json = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(json["college"]["biden"], 270);
        assert!(json["college"].get("remaining").is_none());
        assert_eq!(json["popular"]["trump"], 74_000_000u64);
        assert_eq!(json["states"]["GA"], "in-progress");
        assert!(json["source"]["updated"].is_null());
        assert_eq!(json["source"]["cacheTimestamp"], fetched.timestamp_millis());
    }

    #[test]
    fn outcome_names() {
        let names: Vec<String> = [
            RegionOutcome::Biden,
            RegionOutcome::Trump,
            RegionOutcome::Tied,
            RegionOutcome::InProgress,
            RegionOutcome::NoResults,
            RegionOutcome::Unknown,
        ]
        .iter()
        .map(|o| serde_json::to_string(o).unwrap())
        .collect();

        assert_eq!(
            names,
            ["\"biden\"", "\"trump\"", "\"tied\"", "\"in-progress\"", "\"no-results\"", "\"unknown\""]
        );
    }
}
