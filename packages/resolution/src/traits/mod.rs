//! Trait definitions for pipeline collaborators.
//!
//! Every external system the pipeline touches sits behind one of these
//! traits: the ECFS listing API, the document server, the web search
//! provider, the synthesis model, and storage. Production implementations
//! live alongside their traits; mocks for testing too.

pub mod documents;
pub mod searcher;
pub mod source;
pub mod store;
pub mod synthesizer;

pub use documents::{
    download_url, DocumentFetcher, HttpDocumentFetcher, MockDocumentFetcher, PlainTextExtractor,
    RateLimitedFetcher, TextExtractor,
};
pub use searcher::{
    entity_search_query, MockWebSearcher, SearchSnippet, TavilyWebSearcher, WebSearcher,
};
pub use source::{EcfsFilingSource, FilingSource, MockFilingSource};
pub use store::{AuditSink, EntityStore, FilingStore, PipelineStore};
pub use synthesizer::{EvidencePack, FilingEvidence, OpenAiSynthesizer, Synthesizer};
