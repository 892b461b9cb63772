use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    /// Forge API base URL, e.g. `https://api.github.com`.
    fn api_base(&self) -> &str;
    /// Tracked upstream repository slug ("owner/name").
    fn repo(&self) -> &str;
    /// Head-repository slug the render stages filter to.
    fn filter_repo(&self) -> &str;
    /// Label whose application marks the start of internal review.
    fn watch_label(&self) -> &str;
    /// Directory holding the CSV table and generated artifacts.
    fn output_path(&self) -> &str;
    /// Bearer token for the forge API, if available.
    fn token(&self) -> Option<String>;
}

/// A batch stage: pull raw data in, shape it, persist the result.
///
/// Every subcommand of the tool is one implementation of this trait, driven
/// by [`crate::core::etl::EtlEngine`].
#[async_trait]
pub trait Pipeline: Send + Sync {
    type Raw: Send;
    type Output: Send;

    async fn extract(&self) -> Result<Self::Raw>;
    async fn transform(&self, raw: Self::Raw) -> Result<Self::Output>;
    async fn load(&self, output: Self::Output) -> Result<String>;
}
