use crate::adapters::github::{GithubClient, Pull, TimelineEvent};
use crate::core::table::PrTable;
use crate::core::{ConfigProvider, Pipeline, Storage};
use crate::domain::model::{PrRecord, ScrapeMeta};
use crate::utils::error::{EtlError, Result};
use chrono::Utc;

pub const CSV_FILE: &str = "pr_data.csv";
pub const META_FILE: &str = "pr_data_meta.json";

/// Extract output: the table on disk plus records for PRs not yet in it.
pub struct AccumulateBatch {
    pub existing: PrTable,
    pub fresh: Vec<PrRecord>,
}

/// Transform output: serialized artifacts ready to persist.
pub struct AccumulateOutput {
    pub csv: Vec<u8>,
    pub meta: Vec<u8>,
    pub new_count: usize,
    pub total: usize,
}

/// Fetches PRs and their timelines from the forge API and appends newly
/// observed lifecycle records to the durable CSV table. PRs already present
/// in the table are skipped without touching the API timeline endpoint, so
/// re-running against unchanged upstream data adds no rows.
pub struct AccumulatePipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    client: GithubClient,
}

impl<S: Storage, C: ConfigProvider> AccumulatePipeline<S, C> {
    pub fn new(storage: S, config: C) -> Result<Self> {
        let token = config.token().ok_or_else(|| EtlError::MissingConfig {
            field: "GITHUB_TOKEN".to_string(),
        })?;
        let client = GithubClient::new(
            config.api_base().to_string(),
            config.repo().to_string(),
            Some(token),
        )?;
        Ok(Self {
            storage,
            config,
            client,
        })
    }

    async fn load_existing_table(&self) -> Result<PrTable> {
        match self.storage.read_file(CSV_FILE).await {
            Ok(bytes) => {
                let table = PrTable::from_csv(&bytes)?;
                tracing::info!("Loaded {} existing PR records from CSV", table.len());
                Ok(table)
            }
            Err(EtlError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("CSV file not found; a new one will be created");
                Ok(PrTable::default())
            }
            Err(e) => Err(e),
        }
    }
}

/// Derive lifecycle timestamps for one PR from its timeline.
///
/// Scanning stops at the first `closed` event so that only the first
/// lifecycle counts for PRs that were reopened later. When the timeline
/// carries no close event the PR's own `closed_at` field is used.
pub(crate) fn derive_record(pull: &Pull, events: &[TimelineEvent], watch_label: &str) -> PrRecord {
    let mut review_requested_at = None;
    let mut reviewing_internally_at = None;
    let mut closed_at = None;

    for event in events {
        match event.event.as_deref() {
            Some("closed") => {
                closed_at = event.created_at;
                break;
            }
            Some("review_requested") if review_requested_at.is_none() => {
                review_requested_at = event.created_at;
            }
            Some("labeled") if reviewing_internally_at.is_none() => {
                if event
                    .label_name()
                    .is_some_and(|name| name.eq_ignore_ascii_case(watch_label))
                {
                    reviewing_internally_at = event.created_at;
                }
            }
            _ => {}
        }
    }

    PrRecord {
        pr_number: pull.number,
        head_repo: pull.head_repo_full_name(),
        created_at: pull.created_at,
        review_requested_at,
        reviewing_internally_at,
        closed_at: closed_at.or(pull.closed_at),
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for AccumulatePipeline<S, C> {
    type Raw = AccumulateBatch;
    type Output = AccumulateOutput;

    async fn extract(&self) -> Result<AccumulateBatch> {
        let existing = self.load_existing_table().await?;
        let known = existing.numbers();

        let pulls = self.client.list_pulls().await?;
        tracing::info!("Fetched {} PRs in total", pulls.len());

        let mut fresh = Vec::new();
        for pull in &pulls {
            if known.contains(&pull.number) {
                tracing::debug!("Skipping PR #{} as it's already processed", pull.number);
                continue;
            }
            tracing::info!("Processing PR #{}...", pull.number);
            let events = self.client.issue_timeline(pull.number).await?;
            let record = derive_record(pull, &events, self.config.watch_label());
            if let Some(latency) = record.landing_latency_hours() {
                tracing::info!(
                    "PR #{} latency from review requested to closed: {:.2} hours",
                    record.pr_number,
                    latency
                );
            }
            fresh.push(record);
        }

        Ok(AccumulateBatch { existing, fresh })
    }

    async fn transform(&self, batch: AccumulateBatch) -> Result<AccumulateOutput> {
        let AccumulateBatch { mut existing, fresh } = batch;
        let new_count = fresh.len();
        existing.extend(fresh);

        let csv = existing.to_csv()?;
        let meta = serde_json::to_vec_pretty(&ScrapeMeta {
            last_scrape: Utc::now(),
        })?;

        Ok(AccumulateOutput {
            csv,
            meta,
            new_count,
            total: existing.len(),
        })
    }

    async fn load(&self, output: AccumulateOutput) -> Result<String> {
        if output.new_count == 0 {
            tracing::info!("No new PRs to add");
        } else {
            self.storage.write_file(CSV_FILE, &output.csv).await?;
            tracing::info!(
                "Updated CSV file '{}' with {} new PR records ({} total)",
                CSV_FILE,
                output.new_count,
                output.total
            );
        }
        self.storage.write_file(META_FILE, &output.meta).await?;
        Ok(format!("{}/{}", self.config.output_path(), CSV_FILE))
    }
}
