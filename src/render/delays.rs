use crate::core::table::DelaySeries;
use crate::core::{ConfigProvider, Pipeline, Storage};
use crate::render::{chart_err, load_filtered_table};
use crate::utils::error::Result;
use plotters::prelude::*;
use std::path::{Path, PathBuf};

pub const DELAYS_PLOT_FILE: &str = "pr_delays.png";

const SERIES_LABELS: [&str; 3] = [
    "Creation -> Review Requested",
    "Review Requested -> Reviewing Internally",
    "Reviewing Internally -> Closed",
];

/// Renders the lifecycle delay distribution as a box-and-whisker chart, one
/// box per inter-event hop. Same table in, same quartiles out.
pub struct DelayChartPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
}

impl<S: Storage, C: ConfigProvider> DelayChartPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }

    fn plot_path(&self) -> PathBuf {
        Path::new(self.config.output_path()).join(DELAYS_PLOT_FILE)
    }
}

fn draw_delay_chart(series: &DelaySeries, filter_repo: &str, path: &Path) -> Result<()> {
    // Empty series would have degenerate quartiles; draw only populated ones.
    let groups: Vec<(&str, &[f64])> = [
        (SERIES_LABELS[0], series.created_to_review.as_slice()),
        (SERIES_LABELS[1], series.review_to_label.as_slice()),
        (SERIES_LABELS[2], series.label_to_closed.as_slice()),
    ]
    .into_iter()
    .filter(|(_, values)| !values.is_empty())
    .collect();

    let labels: Vec<&str> = groups.iter().map(|(label, _)| *label).collect();
    let quartiles: Vec<Quartiles> = groups
        .iter()
        .map(|(_, values)| Quartiles::new(*values))
        .collect();

    let mut y_min = 0f32;
    let mut y_max = f32::MIN;
    for q in &quartiles {
        for v in q.values() {
            y_min = y_min.min(v);
            y_max = y_max.max(v);
        }
    }
    if y_max <= y_min {
        y_max = y_min + 1.0;
    }
    let pad = (y_max - y_min) * 0.05;

    let root = BitMapBackend::new(path, (1000, 600)).into_drawing_area();
    root.fill(&WHITE).map_err(chart_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("PR Lifecycle Delays for {}", filter_repo),
            ("sans-serif", 24),
        )
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(labels[..].into_segmented(), (y_min - pad)..(y_max + pad))
        .map_err(chart_err)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .y_desc("Delay (Hours)")
        .draw()
        .map_err(chart_err)?;

    chart
        .draw_series(
            labels
                .iter()
                .zip(quartiles.iter())
                .map(|(label, q)| Boxplot::new_vertical(SegmentValue::CenterOf(label), q)),
        )
        .map_err(chart_err)?;

    root.present().map_err(chart_err)?;
    Ok(())
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for DelayChartPipeline<S, C> {
    type Raw = crate::core::table::PrTable;
    type Output = DelaySeries;

    async fn extract(&self) -> Result<Self::Raw> {
        load_filtered_table(&self.storage, &self.config).await
    }

    async fn transform(&self, table: Self::Raw) -> Result<DelaySeries> {
        Ok(table.delay_series())
    }

    async fn load(&self, series: DelaySeries) -> Result<String> {
        let path = self.plot_path();
        if series.is_empty() {
            tracing::warn!("No delay data after filtering - no plot produced");
            return Ok(path.display().to_string());
        }
        draw_delay_chart(&series, self.config.filter_repo(), &path)?;
        tracing::info!("Plot saved as {}", path.display());
        Ok(path.display().to_string())
    }
}
