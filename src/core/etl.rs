use crate::core::Pipeline;
use crate::utils::error::Result;

/// Drives a pipeline through its three stages and returns the path of the
/// artifact the load stage produced.
pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("Extracting data...");
        let raw = self.pipeline.extract().await?;

        tracing::info!("Transforming data...");
        let output = self.pipeline.transform(raw).await?;

        tracing::info!("Loading data...");
        let artifact = self.pipeline.load(output).await?;
        tracing::info!("Output saved to: {}", artifact);

        Ok(artifact)
    }
}
