use crate::domain::model::PrRecord;
use crate::utils::error::{EtlError, Result};
use chrono::Datelike;
use std::collections::{BTreeMap, HashSet};

/// The durable PR table: an append-only list of records keyed by PR number.
#[derive(Debug, Clone, Default)]
pub struct PrTable {
    records: Vec<PrRecord>,
}

/// Inter-event delays in fractional hours, one series per lifecycle hop.
/// Rows missing either endpoint are dropped from that series.
#[derive(Debug, Clone, Default)]
pub struct DelaySeries {
    pub created_to_review: Vec<f64>,
    pub review_to_label: Vec<f64>,
    pub label_to_closed: Vec<f64>,
}

impl DelaySeries {
    pub fn is_empty(&self) -> bool {
        self.created_to_review.is_empty()
            && self.review_to_label.is_empty()
            && self.label_to_closed.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthCount {
    /// Calendar month as "YYYY-MM" (UTC).
    pub month: String,
    pub count: u32,
}

impl PrTable {
    pub fn from_records(records: Vec<PrRecord>) -> Self {
        Self { records }
    }

    pub fn from_csv(bytes: &[u8]) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(bytes);
        let records = reader
            .deserialize()
            .collect::<std::result::Result<Vec<PrRecord>, csv::Error>>()?;
        Ok(Self { records })
    }

    pub fn to_csv(&self) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for record in &self.records {
            writer.serialize(record)?;
        }
        writer
            .into_inner()
            .map_err(|e| EtlError::Processing {
                message: format!("Failed to flush CSV writer: {}", e),
            })
    }

    pub fn records(&self) -> &[PrRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// PR numbers already present; used to skip records on re-runs.
    pub fn numbers(&self) -> HashSet<u64> {
        self.records.iter().map(|r| r.pr_number).collect()
    }

    /// Append new records. Existing rows are never rewritten.
    pub fn extend(&mut self, fresh: Vec<PrRecord>) {
        self.records.extend(fresh);
    }

    /// Rows whose head repo matches `repo` exactly; a strict subset of the table.
    pub fn filter_head_repo(&self, repo: &str) -> PrTable {
        PrTable {
            records: self
                .records
                .iter()
                .filter(|r| r.head_repo == repo)
                .cloned()
                .collect(),
        }
    }

    pub fn delay_series(&self) -> DelaySeries {
        let mut series = DelaySeries::default();
        for record in &self.records {
            if let (Some(created), Some(review)) = (record.created_at, record.review_requested_at)
            {
                series
                    .created_to_review
                    .push((review - created).num_seconds() as f64 / 3600.0);
            }
            if let (Some(review), Some(label)) =
                (record.review_requested_at, record.reviewing_internally_at)
            {
                series
                    .review_to_label
                    .push((label - review).num_seconds() as f64 / 3600.0);
            }
            if let (Some(label), Some(closed)) =
                (record.reviewing_internally_at, record.closed_at)
            {
                series
                    .label_to_closed
                    .push((closed - label).num_seconds() as f64 / 3600.0);
            }
        }
        series
    }

    /// PRs opened per calendar month, contiguous from the first to the last
    /// observed month; months without PRs appear with a zero count.
    pub fn counts_by_month(&self) -> Vec<MonthCount> {
        let mut buckets: BTreeMap<i32, u32> = BTreeMap::new();
        for record in &self.records {
            if let Some(created) = record.created_at {
                let index = created.year() * 12 + created.month0() as i32;
                *buckets.entry(index).or_insert(0) += 1;
            }
        }

        let (first, last) = match (buckets.keys().next(), buckets.keys().next_back()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return Vec::new(),
        };

        (first..=last)
            .map(|index| MonthCount {
                month: format!("{:04}-{:02}", index.div_euclid(12), index.rem_euclid(12) + 1),
                count: buckets.get(&index).copied().unwrap_or(0),
            })
            .collect()
    }

    /// PR numbers grouped by creation month, both sorted ascending.
    pub fn links_by_month(&self) -> BTreeMap<String, Vec<u64>> {
        let mut links: BTreeMap<String, Vec<u64>> = BTreeMap::new();
        for record in &self.records {
            if let Some(created) = record.created_at {
                links
                    .entry(format!("{:04}-{:02}", created.year(), created.month()))
                    .or_default()
                    .push(record.pr_number);
            }
        }
        for numbers in links.values_mut() {
            numbers.sort_unstable();
        }
        links
    }
}
