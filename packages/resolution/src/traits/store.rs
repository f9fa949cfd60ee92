//! Storage traits for filings, entities, and the audit trail.
//!
//! The storage layer is split into focused traits:
//! - `FilingStore`: append-only filing records, keyed by submission id
//! - `EntityStore`: entity records, keyed by entity id, rewritable across runs
//! - `AuditSink`: append-only rule-engine corrections
//! - `PipelineStore`: composite trait combining all three
//!
//! Stage outputs are durable through these traits; re-running a stage
//! consults the store rather than ambient filesystem state.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::entity::Entity;
use crate::types::filing::FilingRecord;
use crate::types::report::Correction;

/// Append-only store for normalized filing records.
#[async_trait]
pub trait FilingStore: Send + Sync {
    /// Get a filing by submission id.
    async fn get_filing(&self, submission_id: &str) -> Result<Option<FilingRecord>>;

    /// Store a filing. Content is immutable per id, so last-write-wins
    /// is acceptable for duplicates.
    async fn store_filing(&self, filing: &FilingRecord) -> Result<()>;

    /// All stored filings, in insertion order.
    async fn all_filings(&self) -> Result<Vec<FilingRecord>>;

    /// Number of stored filings.
    async fn filing_count(&self) -> Result<usize>;
}

/// Store for entity records, rewritable in place across runs.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Get an entity by id.
    async fn get_entity(&self, entity_id: &str) -> Result<Option<Entity>>;

    /// Store or replace an entity.
    async fn store_entity(&self, entity: &Entity) -> Result<()>;

    /// All stored entities, in insertion order.
    async fn all_entities(&self) -> Result<Vec<Entity>>;

    /// Number of stored entities.
    async fn entity_count(&self) -> Result<usize>;

    /// Replace the entire entity collection (aggregation output).
    async fn replace_entities(&self, entities: &[Entity]) -> Result<()> {
        for entity in entities {
            self.store_entity(entity).await?;
        }
        Ok(())
    }
}

/// Append-only sink for rule-engine corrections.
///
/// Required for explainability: every field the rule engine overwrites
/// lands here before the overwrite is persisted.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Record a correction.
    async fn record(&self, correction: &Correction) -> Result<()>;

    /// All recorded corrections, in occurrence order.
    async fn corrections(&self) -> Result<Vec<Correction>>;
}

/// Composite storage trait used by the pipeline runner.
pub trait PipelineStore: FilingStore + EntityStore + AuditSink {}

// Blanket implementation: anything implementing all three is a PipelineStore
impl<T: FilingStore + EntityStore + AuditSink> PipelineStore for T {}
