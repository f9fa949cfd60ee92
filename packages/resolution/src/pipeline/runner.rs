//! Pipeline runner - sequences the stages and owns durability.
//!
//! Stage-sequential by design: each stage's entire output is persisted
//! through the store before the next stage begins, so a cancelled or
//! failed run resumes from the last durable stage instead of starting
//! over.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::error::{PipelineError, Result};
use crate::pipeline::{aggregate, evidence, fuse, normalize, rules, signals};
use crate::traits::documents::{DocumentFetcher, TextExtractor};
use crate::traits::searcher::WebSearcher;
use crate::traits::source::FilingSource;
use crate::traits::store::{AuditSink, EntityStore, FilingStore, PipelineStore};
use crate::traits::synthesizer::Synthesizer;
use crate::types::config::PipelineConfig;
use crate::types::entity::Entity;
use crate::types::report::RunReport;

/// The two listing queries whose union covers the filing population.
/// The first catches standard applications; the second catches edge cases
/// that cite the rule section directly.
pub const DEFAULT_QUERIES: [&str; 2] = ["\"Numbering Authorization Application\"", "52.15(g)"];

/// The full pipeline: stores plus every external collaborator.
pub struct Pipeline<S, F, X, W, Y> {
    store: S,
    fetcher: F,
    extractor: X,
    searcher: Arc<W>,
    synthesizer: Arc<Y>,
    config: PipelineConfig,
    cancel: CancellationToken,
}

impl<S, F, X, W, Y> Pipeline<S, F, X, W, Y>
where
    S: PipelineStore,
    F: DocumentFetcher,
    X: TextExtractor,
    W: WebSearcher + 'static,
    Y: Synthesizer + 'static,
{
    pub fn new(
        store: S,
        fetcher: F,
        extractor: X,
        searcher: Arc<W>,
        synthesizer: Arc<Y>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            fetcher,
            extractor,
            searcher,
            synthesizer,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that stops scheduling new per-entity work when cancelled.
    /// Completed work stays durable; the run is resumable.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Stage 1+2: list raw filings, dedupe, filter, persist records.
    #[instrument(skip_all)]
    pub async fn ingest(&self, source: &dyn FilingSource, queries: &[&str]) -> Result<RunReport> {
        let mut raw = Vec::new();
        for query in queries {
            let batch = source.list_filings(query).await?;
            info!(query, fetched = batch.len(), "listed filings");
            raw.extend(batch);
        }

        let (records, stats) = normalize::normalize_batch(raw);
        for record in &records {
            self.store.store_filing(record).await?;
        }

        let mut report = RunReport::new();
        report.raw_count = stats.raw_count;
        report.kept_count = stats.kept_count;
        report.rejected_count = stats.rejected_count + stats.malformed_count;
        report.duplicate_count = stats.duplicate_count;
        info!(
            kept = stats.kept_count,
            rejected = stats.rejected_count,
            "ingest complete"
        );
        Ok(report)
    }

    /// Stage 3: aggregate stored filings into the entity set.
    ///
    /// Replaces the stored entity collection; aggregation over the same
    /// filings is deterministic so this is idempotent.
    #[instrument(skip_all)]
    pub async fn aggregate(&self) -> Result<RunReport> {
        let filings = self.store.all_filings().await?;
        let (entities, stats) = aggregate::aggregate(filings);
        self.store.replace_entities(&entities).await?;

        let mut report = RunReport::new();
        report.excluded_government = stats.excluded_government;
        report.excluded_no_filer = stats.excluded_no_filer;
        report.entity_count = stats.entity_count;
        report.non_applicant_count = stats.non_applicant_count;
        info!(entities = stats.entity_count, "aggregation complete");
        Ok(report)
    }

    /// Stage 4: fetch documents and extract evidence fields per entity.
    #[instrument(skip_all)]
    pub async fn extract_evidence(&self) -> Result<RunReport> {
        let mut entities = self.load_entities().await?;
        let mut report = RunReport::new();

        // Entities with fields from a prior run keep them.
        let pending: Vec<&mut Entity> = entities
            .iter_mut()
            .filter(|e| e.extracted_fields.is_none())
            .collect();

        let degradations = stream::iter(pending.into_iter().map(|entity| {
            let fetcher = &self.fetcher;
            let extractor = &self.extractor;
            async move { evidence::extract_entity_evidence(entity, fetcher, extractor).await }
        }))
        .buffer_unordered(self.config.concurrency.max(1))
        .collect::<Vec<_>>()
        .await;

        for degradation in degradations.into_iter().flatten() {
            report.degradations.push(degradation);
        }

        for entity in &entities {
            self.store.store_entity(entity).await?;
        }
        info!(
            degraded = report.degradations.len(),
            "evidence extraction complete"
        );
        Ok(report)
    }

    /// Stage 5: derive filing signals.
    #[instrument(skip_all)]
    pub async fn derive_signals(&self) -> Result<()> {
        let mut entities = self.load_entities().await?;
        signals::derive_signals(
            &mut entities,
            chrono::Utc::now(),
            self.config.recency_window(),
        );
        for entity in &entities {
            self.store.store_entity(entity).await?;
        }
        Ok(())
    }

    /// Stage 6: evidence fusion with the search and synthesis
    /// collaborators.
    #[instrument(skip_all)]
    pub async fn fuse(&self) -> Result<RunReport> {
        let entities = self.load_entities().await?;
        let (entities, report) = fuse::fuse_entities(
            entities,
            Arc::clone(&self.searcher),
            Arc::clone(&self.synthesizer),
            &self.config,
            self.cancel.clone(),
        )
        .await?;

        for entity in &entities {
            self.store.store_entity(entity).await?;
        }
        info!(
            skipped = report.fusion_skipped,
            degraded = report.degradations.len(),
            "fusion complete"
        );
        Ok(report)
    }

    /// Stage 7: the post-fusion rule engine, corrections audited.
    #[instrument(skip_all)]
    pub async fn apply_rules(&self) -> Result<usize> {
        let mut entities = self.load_entities().await?;
        let corrections = rules::apply_rules_all(&mut entities);

        // Audit before persisting the overwrite.
        for correction in &corrections {
            self.store.record(correction).await?;
        }
        for entity in &entities {
            self.store.store_entity(entity).await?;
        }
        Ok(corrections.len())
    }

    /// Run every stage in order and produce the run report.
    pub async fn run(&self, source: &dyn FilingSource, queries: &[&str]) -> Result<RunReport> {
        let mut report = self.ingest(source, queries).await?;
        self.check_cancelled()?;
        report.absorb(self.aggregate().await?);
        self.check_cancelled()?;
        report.absorb(self.extract_evidence().await?);
        self.check_cancelled()?;
        self.derive_signals().await?;
        self.check_cancelled()?;
        report.absorb(self.fuse().await?);
        self.check_cancelled()?;
        self.apply_rules().await?;
        Ok(report)
    }

    async fn load_entities(&self) -> Result<Vec<Entity>> {
        self.store.all_entities().await
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        Ok(())
    }
}
