pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "server")]
pub mod server;

pub use adapters::{LlmProvider, LocalStorage, PdfDocumentReader};
pub use config::AppConfig;
pub use core::pipeline::{ExtractionOptions, StatementPipeline};
pub use domain::model::ExtractionResult;
pub use utils::error::{PipelineError, Result};

/// Pipeline as wired by the binaries.
pub type DefaultPipeline = StatementPipeline<PdfDocumentReader, LlmProvider, LocalStorage>;

/// Builds the production pipeline from a validated configuration.
///
/// Fails when the provider's API key is not set.
pub fn build_pipeline(config: &AppConfig) -> Result<DefaultPipeline> {
    let settings = config.llm.resolve_settings()?;
    let provider = LlmProvider::from_settings(&settings)?;
    let reader = PdfDocumentReader::new(config.extraction.table_detection());
    let storage = LocalStorage::new(&config.staging.dir);

    Ok(StatementPipeline::new(
        reader,
        provider,
        storage,
        config.extraction.options(),
    ))
}
