use crate::core::normalize::normalize_response;
use crate::core::prompt::build_prompt;
use crate::core::table::{extract_table, RowFilter};
use crate::core::text::extract_text;
use crate::core::{CompletionProvider, DocumentReader, Storage};
use crate::domain::model::{ClassifiedDetails, ExtractionResult, PageContent, RawTable};
use crate::utils::error::{PipelineError, Result};
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Knobs of the deterministic extraction stage.
#[derive(Debug, Clone, Default)]
pub struct ExtractionOptions {
    pub row_filter: RowFilter,
}

/// Turns one bank statement into an [`ExtractionResult`].
///
/// A locally detected transactions table is authoritative and the model is
/// only asked for holder and account details. Without a table the model is
/// asked for everything. The decision is taken once per document.
pub struct StatementPipeline<R: DocumentReader, P: CompletionProvider, S: Storage> {
    reader: Arc<R>,
    provider: P,
    storage: S,
    options: ExtractionOptions,
}

impl<R: DocumentReader, P: CompletionProvider, S: Storage> StatementPipeline<R, P, S> {
    pub fn new(reader: R, provider: P, storage: S, options: ExtractionOptions) -> Self {
        Self {
            reader: Arc::new(reader),
            provider,
            storage,
            options,
        }
    }

    /// Processes an uploaded document through the staging area.
    ///
    /// The staged copy is removed whatever the outcome.
    pub async fn extract_upload(&self, filename: &str, bytes: &[u8]) -> Result<ExtractionResult> {
        let key = staging_key(filename);
        tracing::debug!(staged = %key, bytes = bytes.len(), "Staging upload");

        let result = async {
            self.storage.write_file(&key, bytes).await?;
            let staged = self.storage.read_file(&key).await?;
            self.extract_document(filename, staged).await
        }
        .await;

        if let Err(e) = self.storage.remove_file(&key).await {
            tracing::warn!(staged = %key, error = %e, "Failed to remove staged upload");
        }

        result
    }

    pub async fn extract_document(&self, name: &str, bytes: Vec<u8>) -> Result<ExtractionResult> {
        let span = tracing::info_span!("extract", document = %name, provider = %self.provider.name());

        async move {
            let pages = self.read_pages(name, bytes).await?;
            let table = extract_table(&pages, &self.options.row_filter);
            let text = extract_text(&pages);

            tracing::info!(
                pages = pages.len(),
                text_chars = text.len(),
                table_rows = table.as_ref().map(RawTable::len).unwrap_or(0),
                "📄 Document read"
            );

            match table {
                Some(table) => self.classify_with_table(&text, table).await,
                None => self.classify_everything(&text).await,
            }
        }
        .instrument(span)
        .await
    }

    /// PDF parsing is CPU-bound; it runs on the blocking pool.
    async fn read_pages(&self, name: &str, bytes: Vec<u8>) -> Result<Vec<PageContent>> {
        let reader = Arc::clone(&self.reader);
        let document = name.to_string();
        let span = tracing::Span::current();

        tokio::task::spawn_blocking(move || span.in_scope(|| reader.read_pages(&document, &bytes)))
            .await
            .map_err(|e| PipelineError::extraction(name, format!("reader task failed: {e}")))?
    }

    async fn classify_with_table(&self, text: &str, table: RawTable) -> Result<ExtractionResult> {
        tracing::info!(rows = table.len(), "Transactions table found, asking model for details only");

        let prompt = build_prompt(text, false);
        tracing::debug!(version = prompt.version(), "Built classification prompt");
        let details = self.provider.complete(prompt.as_str()).await?;

        let transactions_csv = table.to_csv()?;
        Ok(ExtractionResult::TableFound {
            account_and_bank_details: details,
            transactions: table.records(),
            transactions_csv,
        })
    }

    async fn classify_everything(&self, text: &str) -> Result<ExtractionResult> {
        tracing::warn!("No transactions table found, asking model for all details");

        let prompt = build_prompt(text, true);
        tracing::debug!(version = prompt.version(), "Built classification prompt");
        let raw = self.provider.complete(prompt.as_str()).await?;

        let all_details = match normalize_response(&raw) {
            Ok(parsed) => {
                tracing::info!(
                    account_holder = parsed.account_holder().is_some(),
                    bank_account = parsed.bank_account().is_some(),
                    transactions = parsed.transactions().map_or(0, Vec::len),
                    "Model response normalized"
                );
                ClassifiedDetails::Structured(parsed)
            }
            Err(e) => {
                tracing::warn!(error = %e, raw_chars = e.raw().len(), "Returning unparsed model response");
                ClassifiedDetails::Raw(e.into_raw())
            }
        };

        Ok(ExtractionResult::ModelOnly { all_details })
    }
}

/// Unique per-request staging name that keeps a readable hint of the upload.
fn staging_key(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let mut safe: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(100)
        .collect();
    if safe.trim_matches(['.', '_']).is_empty() {
        safe = "upload.pdf".to_string();
    }

    format!("{}_{}", Uuid::new_v4(), safe)
}
