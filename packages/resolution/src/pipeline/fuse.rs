//! Evidence fusion - one search and one synthesis call per entity.
//!
//! The fusion adapter assembles an evidence pack (identity, extracted
//! fields, filing signals, search snippets) and hands it to the synthesis
//! collaborator. Both external calls run under per-call timeouts; a
//! failure degrades that one entity's enrichment to undetermined and the
//! run continues. Entities already enriched from a prior run are skipped
//! unless the config forces a refresh.

use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{PipelineError, Result};
use crate::traits::searcher::{entity_search_query, SearchSnippet, WebSearcher};
use crate::traits::synthesizer::{EvidencePack, Synthesizer};
use crate::types::config::PipelineConfig;
use crate::types::entity::Entity;
use crate::types::enrichment::StructuredEnrichment;
use crate::types::report::{FailureKind, RunReport};
use crate::types::signals::FilingSignals;

/// Fuse enrichment onto every applicant entity.
///
/// Entities are processed by a bounded worker pool; each entity's work is
/// independent. Cancellation stops scheduling new entities but entities
/// already being processed finish, so partial completion is resumable.
pub async fn fuse_entities<W, Y>(
    entities: Vec<Entity>,
    searcher: Arc<W>,
    synthesizer: Arc<Y>,
    config: &PipelineConfig,
    cancel: CancellationToken,
) -> Result<(Vec<Entity>, RunReport)>
where
    W: WebSearcher + 'static,
    Y: Synthesizer + 'static,
{
    let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1)));
    let config = Arc::new(config.clone());
    let mut handles = Vec::with_capacity(entities.len());

    for (index, entity) in entities.into_iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let semaphore = Arc::clone(&semaphore);
        let searcher = Arc::clone(&searcher);
        let synthesizer = Arc::clone(&synthesizer);
        let config = Arc::clone(&config);
        let cancel = cancel.clone();

        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire().await;
            if cancel.is_cancelled() {
                // Unprocessed entities pass through untouched so a re-run
                // picks them up.
                return (index, entity, RunReport::new());
            }
            let (entity, report) = fuse_one(entity, &*searcher, &*synthesizer, &config).await;
            (index, entity, report)
        }));
    }

    let mut indexed = Vec::with_capacity(handles.len());
    let mut report = RunReport::new();
    for handle in handles {
        let (index, entity, entity_report) = handle
            .await
            .map_err(|e| PipelineError::SynthesisUnavailable(format!("worker panicked: {e}")))?;
        report.absorb(entity_report);
        indexed.push((index, entity));
    }

    indexed.sort_by_key(|(index, _)| *index);
    Ok((indexed.into_iter().map(|(_, e)| e).collect(), report))
}

/// Process one entity: search, assemble, synthesize, validate.
async fn fuse_one<W, Y>(
    mut entity: Entity,
    searcher: &W,
    synthesizer: &Y,
    config: &PipelineConfig,
) -> (Entity, RunReport)
where
    W: WebSearcher,
    Y: Synthesizer,
{
    let mut report = RunReport::new();

    // The enrichable population is applicants only.
    if !entity.is_applicant() {
        return (entity, report);
    }

    if config.skip_enriched && entity.is_enriched() {
        report.fusion_skipped += 1;
        debug!(entity = %entity.entity_id, "already enriched, skipping fusion");
        return (entity, report);
    }

    let snippets = run_search(&entity, searcher, config, &mut report).await;

    let signals = entity
        .filing_signals
        .clone()
        .unwrap_or_else(|| FilingSignals::derive(&entity, chrono::Utc::now(), config.recency_window()));
    let pack = EvidencePack::assemble(&entity, &signals, snippets);
    let sources = pack.source_ids();

    let synthesis = timeout(config.synthesis_timeout(), synthesizer.synthesize(&pack)).await;
    let enrichment = match synthesis {
        Ok(Ok(candidate)) => StructuredEnrichment::from_candidate(candidate, sources),
        Ok(Err(PipelineError::SynthesisInvalid { reason })) => {
            warn!(entity = %entity.entity_id, %reason, "synthesis candidate invalid");
            report.degrade(FailureKind::SynthesisInvalid, &entity.entity_id, reason);
            StructuredEnrichment::undetermined()
        }
        Ok(Err(err)) => {
            warn!(entity = %entity.entity_id, error = %err, "synthesis failed");
            report.degrade(
                FailureKind::SynthesisUnavailable,
                &entity.entity_id,
                err.to_string(),
            );
            StructuredEnrichment::undetermined()
        }
        Err(_) => {
            warn!(entity = %entity.entity_id, "synthesis timed out");
            report.degrade(
                FailureKind::SynthesisUnavailable,
                &entity.entity_id,
                format!("timed out after {}s", config.synthesis_timeout_secs),
            );
            StructuredEnrichment::undetermined()
        }
    };

    entity.enrichment = Some(enrichment);
    (entity, report)
}

/// One search query per entity per run. Failures and timeouts are
/// equivalent to empty results, recorded in the report.
async fn run_search<W: WebSearcher>(
    entity: &Entity,
    searcher: &W,
    config: &PipelineConfig,
    report: &mut RunReport,
) -> Vec<SearchSnippet> {
    let query = entity_search_query(&entity.canonical_name);

    match timeout(
        config.search_timeout(),
        searcher.search_with_limit(&query, config.search_result_limit),
    )
    .await
    {
        Ok(Ok(snippets)) => snippets,
        Ok(Err(err)) => {
            warn!(entity = %entity.entity_id, error = %err, "web search failed");
            report.degrade(FailureKind::SearchFailed, &entity.entity_id, err.to_string());
            Vec::new()
        }
        Err(_) => {
            warn!(entity = %entity.entity_id, "web search timed out");
            report.degrade(
                FailureKind::SearchFailed,
                &entity.entity_id,
                format!("timed out after {}s", config.search_timeout_secs),
            );
            Vec::new()
        }
    }
}
