use crate::domain::model::PageContent;
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn remove_file(&self, path: &str) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Turns document bytes into per-page text and table grids.
pub trait DocumentReader: Send + Sync + 'static {
    fn read_pages(&self, document_name: &str, bytes: &[u8]) -> Result<Vec<PageContent>>;
}

/// A remote text-completion capability: prompt in, raw text out.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Short label used in logs and error messages.
    fn name(&self) -> &str;

    async fn complete(&self, prompt: &str) -> Result<String>;
}
