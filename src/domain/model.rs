use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp format used in the CSV table: RFC 3339 seconds precision, UTC.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// One row of the durable PR table. Missing lifecycle events are blank cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrRecord {
    pub pr_number: u64,
    pub head_repo: String,
    #[serde(with = "opt_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(with = "opt_timestamp")]
    pub review_requested_at: Option<DateTime<Utc>>,
    #[serde(with = "opt_timestamp")]
    pub reviewing_internally_at: Option<DateTime<Utc>>,
    #[serde(with = "opt_timestamp")]
    pub closed_at: Option<DateTime<Utc>>,
}

impl PrRecord {
    /// Hours from review-requested to closed, when both are known.
    pub fn landing_latency_hours(&self) -> Option<f64> {
        match (self.review_requested_at, self.closed_at) {
            (Some(review), Some(closed)) => {
                Some((closed - review).num_seconds() as f64 / 3600.0)
            }
            _ => None,
        }
    }

    /// Lifecycle ordering: created <= review requested <= closed, for the
    /// timestamps that are present.
    pub fn timestamps_ordered(&self) -> bool {
        let pairs = [
            (self.created_at, self.review_requested_at),
            (self.review_requested_at, self.closed_at),
            (self.created_at, self.closed_at),
        ];
        pairs
            .iter()
            .all(|(a, b)| match (a, b) {
                (Some(a), Some(b)) => a <= b,
                _ => true,
            })
    }
}

/// Serde adapter mapping blank CSV cells to `None`.
pub mod opt_timestamp {
    use super::TIMESTAMP_FORMAT;
    use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(dt) => serializer.serialize_str(&dt.format(TIMESTAMP_FORMAT).to_string()),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        if raw.trim().is_empty() {
            return Ok(None);
        }
        NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT)
            .map(|naive| Some(Utc.from_utc_datetime(&naive)))
            .map_err(serde::de::Error::custom)
    }
}

/// Sidecar metadata written next to the CSV on every scrape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeMeta {
    pub last_scrape: DateTime<Utc>,
}

/// A commit carrying a `PiperOrigin-RevId` footer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PiperCommit {
    pub piper_rev_id: String,
    pub git_sha: String,
    pub author: String,
    /// ISO-8601 UTC with trailing 'Z'.
    pub committed_at: String,
}
