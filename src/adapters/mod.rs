// Adapters layer: concrete implementations of the domain ports (PDF reading,
// completion providers, staging storage).

pub mod chat_completions;
pub mod gemini;
pub mod pdf;
pub mod provider;
pub mod storage;

pub use pdf::{PdfDocumentReader, TableDetection};
pub use provider::LlmProvider;
pub use storage::LocalStorage;
