use crate::core::accumulate::META_FILE;
use crate::core::table::{MonthCount, PrTable};
use crate::core::{ConfigProvider, Pipeline, Storage};
use crate::domain::model::ScrapeMeta;
use crate::render::{chart_err, load_filtered_table};
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use plotters::prelude::*;
use plotters::style::FontTransform;
use std::path::{Path, PathBuf};

pub const COUNTS_PLOT_FILE: &str = "pr_counts.png";

pub struct CountChart {
    pub counts: Vec<MonthCount>,
    pub total: u64,
    pub as_of: DateTime<Utc>,
}

/// Renders a bar chart of PRs opened per calendar month (UTC), annotated with
/// the last-scrape timestamp from the metadata sidecar.
pub struct CountChartPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
}

impl<S: Storage, C: ConfigProvider> CountChartPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }

    fn plot_path(&self) -> PathBuf {
        Path::new(self.config.output_path()).join(COUNTS_PLOT_FILE)
    }

    /// Timestamp of the last scrape, for chart annotation. A missing or
    /// malformed metadata file falls back to "now".
    async fn last_scrape(&self) -> DateTime<Utc> {
        match self.storage.read_file(META_FILE).await {
            Ok(bytes) => serde_json::from_slice::<ScrapeMeta>(&bytes)
                .map(|meta| meta.last_scrape)
                .unwrap_or_else(|e| {
                    tracing::warn!("Ignoring malformed metadata file: {}", e);
                    Utc::now()
                }),
            Err(_) => Utc::now(),
        }
    }
}

fn draw_count_chart(chart_data: &CountChart, filter_repo: &str, path: &Path) -> Result<()> {
    let counts = &chart_data.counts;
    // Widen the canvas as the month range grows so labels stay legible.
    let width = (counts.len() as u32 * 60).clamp(1000, 2400);

    let root = BitMapBackend::new(path, (width, 600)).into_drawing_area();
    root.fill(&WHITE).map_err(chart_err)?;

    let y_max = counts.iter().map(|c| c.count).max().unwrap_or(0) + 1;
    let title = format!(
        "{} PRs opened per month (n={}, data as of {} UTC)",
        filter_repo,
        chart_data.total,
        chart_data.as_of.format("%Y-%m-%d %H:%M:%S")
    );

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(90)
        .y_label_area_size(50)
        .build_cartesian_2d((0..counts.len()).into_segmented(), 0u32..y_max)
        .map_err(chart_err)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Month (YYYY-MM)")
        .y_desc("PR count")
        .x_labels(counts.len())
        .x_label_formatter(&|value| match value {
            SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => counts
                .get(*i)
                .map(|c| c.month.clone())
                .unwrap_or_default(),
            _ => String::new(),
        })
        .x_label_style(("sans-serif", 12).into_font().transform(FontTransform::Rotate90))
        .draw()
        .map_err(chart_err)?;

    chart
        .draw_series(counts.iter().enumerate().map(|(i, c)| {
            Rectangle::new(
                [(SegmentValue::Exact(i), 0), (SegmentValue::Exact(i + 1), c.count)],
                BLUE.mix(0.4).filled(),
            )
        }))
        .map_err(chart_err)?;

    root.present().map_err(chart_err)?;
    Ok(())
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for CountChartPipeline<S, C> {
    type Raw = (PrTable, DateTime<Utc>);
    type Output = CountChart;

    async fn extract(&self) -> Result<Self::Raw> {
        let table = load_filtered_table(&self.storage, &self.config).await?;
        let as_of = self.last_scrape().await;
        Ok((table, as_of))
    }

    async fn transform(&self, raw: Self::Raw) -> Result<CountChart> {
        let (table, as_of) = raw;
        let counts = table.counts_by_month();
        let total = counts.iter().map(|c| u64::from(c.count)).sum();
        Ok(CountChart {
            counts,
            total,
            as_of,
        })
    }

    async fn load(&self, chart_data: CountChart) -> Result<String> {
        let path = self.plot_path();
        if chart_data.counts.is_empty() {
            tracing::warn!("No data after filtering - no plot produced");
            return Ok(path.display().to_string());
        }
        draw_count_chart(&chart_data, self.config.filter_repo(), &path)?;
        tracing::info!("Plot saved as {}", path.display());
        Ok(path.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::accumulate::CSV_FILE;
    use crate::core::testutil::{MockConfig, MockStorage};
    use crate::domain::model::PrRecord;
    use tempfile::TempDir;

    fn csv_fixture() -> Vec<u8> {
        let records = vec![
            PrRecord {
                pr_number: 1,
                head_repo: "xlsynth/xlsynth".to_string(),
                created_at: Some("2024-01-01T00:00:00Z".parse().unwrap()),
                review_requested_at: None,
                reviewing_internally_at: None,
                closed_at: None,
            },
            PrRecord {
                pr_number: 2,
                head_repo: "xlsynth/xlsynth".to_string(),
                created_at: Some("2024-03-01T00:00:00Z".parse().unwrap()),
                review_requested_at: None,
                reviewing_internally_at: None,
                closed_at: None,
            },
        ];
        PrTable::from_records(records).to_csv().unwrap()
    }

    #[tokio::test]
    async fn test_transform_counts_and_total() {
        let storage = MockStorage::new();
        storage.put_file(CSV_FILE, &csv_fixture()).await;
        let meta = serde_json::json!({"last_scrape": "2024-04-01T00:00:00Z"});
        storage
            .put_file(META_FILE, meta.to_string().as_bytes())
            .await;

        let pipeline = CountChartPipeline::new(storage, MockConfig::default());
        let raw = pipeline.extract().await.unwrap();
        let chart = pipeline.transform(raw).await.unwrap();

        assert_eq!(chart.total, 2);
        assert_eq!(chart.counts.len(), 3); // Jan..Mar with a zero gap month
        assert_eq!(chart.counts[1].count, 0);
        assert_eq!(chart.as_of.to_rfc3339(), "2024-04-01T00:00:00+00:00");
    }

    #[tokio::test]
    async fn test_missing_meta_falls_back_to_now() {
        let storage = MockStorage::new();
        storage.put_file(CSV_FILE, &csv_fixture()).await;

        let pipeline = CountChartPipeline::new(storage, MockConfig::default());
        let before = Utc::now();
        let (_, as_of) = pipeline.extract().await.unwrap();
        assert!(as_of >= before);
    }

    #[tokio::test]
    async fn test_load_writes_png() {
        let temp_dir = TempDir::new().unwrap();
        let config = MockConfig {
            output_path: temp_dir.path().to_str().unwrap().to_string(),
            ..Default::default()
        };
        let pipeline = CountChartPipeline::new(MockStorage::new(), config);

        let chart = CountChart {
            counts: vec![
                MonthCount { month: "2024-01".to_string(), count: 3 },
                MonthCount { month: "2024-02".to_string(), count: 0 },
                MonthCount { month: "2024-03".to_string(), count: 5 },
            ],
            total: 8,
            as_of: Utc::now(),
        };
        pipeline.load(chart).await.unwrap();

        let written = std::fs::read(temp_dir.path().join(COUNTS_PLOT_FILE)).unwrap();
        assert_eq!(&written[..4], b"\x89PNG");
    }

    #[tokio::test]
    async fn test_load_skips_plot_when_no_counts() {
        let temp_dir = TempDir::new().unwrap();
        let config = MockConfig {
            output_path: temp_dir.path().to_str().unwrap().to_string(),
            ..Default::default()
        };
        let pipeline = CountChartPipeline::new(MockStorage::new(), config);

        let chart = CountChart {
            counts: Vec::new(),
            total: 0,
            as_of: Utc::now(),
        };
        pipeline.load(chart).await.unwrap();
        assert!(!temp_dir.path().join(COUNTS_PLOT_FILE).exists());
    }
}
