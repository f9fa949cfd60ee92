//! Record Resolution and Evidence Fusion for FCC Numbering Filings
//!
//! A batch pipeline that turns raw ECFS filing records into deduplicated,
//! enriched company entities:
//!
//! 1. **Normalize** - dedupe raw items, apply the inclusion filter
//! 2. **Aggregate** - resolve company names and cluster filings into
//!    entities
//! 3. **Extract evidence** - pull contact and background fields out of
//!    application documents
//! 4. **Derive signals** - activity heuristics from filing metadata
//! 5. **Fuse** - web search plus LLM synthesis into validated enrichment
//! 6. **Rules** - deterministic post-fusion corrections, fully audited
//!
//! # Design Philosophy
//!
//! - Every external system sits behind a trait; the core owns validation
//!   of everything a collaborator returns
//! - Per-entity failures degrade that entity and land in the run report;
//!   a run never hard-stops for one bad record
//! - Stage outputs are durable before the next stage begins, so runs are
//!   cancellable and resumable
//!
//! # Usage
//!
//! ```rust,ignore
//! use resolution::{Pipeline, PipelineConfig, JsonFileStore, DEFAULT_QUERIES};
//! use resolution::traits::{
//!     EcfsFilingSource, HttpDocumentFetcher, OpenAiSynthesizer,
//!     PlainTextExtractor, TavilyWebSearcher,
//! };
//! use std::sync::Arc;
//!
//! let pipeline = Pipeline::new(
//!     JsonFileStore::open("data")?,
//!     HttpDocumentFetcher::new()?,
//!     PlainTextExtractor,
//!     Arc::new(TavilyWebSearcher::from_env()?),
//!     Arc::new(OpenAiSynthesizer::from_env()?),
//!     PipelineConfig::default(),
//! );
//!
//! let source = EcfsFilingSource::from_env()?;
//! let report = pipeline.run(&source, &DEFAULT_QUERIES).await?;
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Collaborator abstractions (source, fetcher, searcher,
//!   synthesizer, store) with production implementations and mocks
//! - [`types`] - Filing, entity, enrichment, and report types
//! - [`pipeline`] - The six stages and the runner that sequences them
//! - [`stores`] - Storage implementations (memory, JSON files)
//! - [`export`] - Flat CSV export for human review
//! - [`testing`] - Mock synthesizer for tests

pub mod error;
pub mod export;
pub mod pipeline;
pub mod security;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

pub use error::{PipelineError, Result};
pub use pipeline::{Pipeline, DEFAULT_QUERIES};
pub use stores::{JsonFileStore, MemoryStore};
pub use traits::{
    documents::{DocumentFetcher, HttpDocumentFetcher, PlainTextExtractor, TextExtractor},
    searcher::{SearchSnippet, WebSearcher},
    source::{EcfsFilingSource, FilingSource},
    store::{AuditSink, EntityStore, FilingStore, PipelineStore},
    synthesizer::{EvidencePack, OpenAiSynthesizer, Synthesizer},
};
pub use types::{
    config::PipelineConfig,
    enrichment::{
        Activity, Confidence, IndustrySegment, MarketPosition, Provenance, StructuredEnrichment,
        SynthesisCandidate,
    },
    entity::{Entity, ExtractedFields, FilerType, Personnel},
    filing::{DocumentRef, FilingRecord, RawFiling, SubmissionType},
    report::{Correction, Degradation, FailureKind, RunReport},
    signals::FilingSignals,
};
