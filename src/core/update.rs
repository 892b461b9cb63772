use crate::core::accumulate::AccumulatePipeline;
use crate::core::etl::EtlEngine;
use crate::core::{ConfigProvider, Pipeline, Storage};
use crate::render::counts::CountChartPipeline;
use crate::render::delays::DelayChartPipeline;
use crate::render::links::LinksTablePipeline;
use crate::utils::error::Result;

/// Run the full batch: accumulate, then regenerate the charts and the README
/// links table — but only when accumulate actually added rows (or `force` is
/// set), so unchanged upstream data leaves the rendered artifacts untouched.
pub async fn run_update<S, C>(storage: S, config: C, force: bool) -> Result<()>
where
    S: Storage + Clone,
    C: ConfigProvider + Clone,
{
    let pipeline = AccumulatePipeline::new(storage.clone(), config.clone())?;
    let batch = pipeline.extract().await?;
    let output = pipeline.transform(batch).await?;
    let added = output.new_count;
    pipeline.load(output).await?;

    if added == 0 && !force {
        tracing::info!("No new PR data; charts and README left untouched");
        return Ok(());
    }

    EtlEngine::new(DelayChartPipeline::new(storage.clone(), config.clone()))
        .run()
        .await?;
    EtlEngine::new(CountChartPipeline::new(storage.clone(), config.clone()))
        .run()
        .await?;
    EtlEngine::new(LinksTablePipeline::new(storage, config))
        .run()
        .await?;

    tracing::info!("All steps completed successfully");
    Ok(())
}
