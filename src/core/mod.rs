pub mod normalize;
pub mod pipeline;
pub mod prompt;
pub mod table;
pub mod text;

pub use crate::domain::model::{ExtractionResult, PageContent, RawTable, TransactionRecord};
pub use crate::domain::ports::{CompletionProvider, DocumentReader, Storage};
pub use crate::utils::error::Result;
