//! End-to-end pipeline tests over mock collaborators.

use std::sync::Arc;

use resolution::pipeline::aggregate::normalize_name;
use resolution::testing::MockSynthesizer;
use resolution::traits::documents::{MockDocumentFetcher, PlainTextExtractor};
use resolution::traits::searcher::MockWebSearcher;
use resolution::traits::source::MockFilingSource;
use resolution::traits::store::{AuditSink, EntityStore};
use resolution::types::filing::{RawDescribed, RawDocument, RawFiling, RawNamed, RawProceeding};
use resolution::{
    Entity, FailureKind, FilerType, MarketPosition, MemoryStore, Pipeline, PipelineConfig,
    Provenance, SynthesisCandidate, DEFAULT_QUERIES,
};

fn raw_filing(id: &str, description: &str, filer: Option<&str>) -> RawFiling {
    RawFiling {
        id_submission: Some(id.to_string()),
        date_received: Some("2024-03-01T10:00:00Z".to_string()),
        submissiontype: Some(RawDescribed {
            description: Some("APPLICATION".to_string()),
        }),
        proceedings: vec![RawProceeding {
            name: Some("24-0100".to_string()),
            description: Some(description.to_string()),
        }],
        filers: filer
            .map(|f| {
                vec![RawNamed {
                    name: Some(f.to_string()),
                }]
            })
            .unwrap_or_default(),
        ..Default::default()
    }
}

fn pipeline_with(
    synthesizer: MockSynthesizer,
    fetcher: MockDocumentFetcher,
    searcher: MockWebSearcher,
) -> Pipeline<MemoryStore, MockDocumentFetcher, PlainTextExtractor, MockWebSearcher, MockSynthesizer>
{
    Pipeline::new(
        MemoryStore::new(),
        fetcher,
        PlainTextExtractor,
        Arc::new(searcher),
        Arc::new(synthesizer),
        PipelineConfig::default(),
    )
}

#[tokio::test]
async fn ulec_scenario_resolves_and_normalizes() {
    let source = MockFilingSource::new().with_filings(
        DEFAULT_QUERIES[0],
        vec![raw_filing(
            "1",
            "Interconnected VoIP Numbering Authorization Application Filed By ULEC, LLC Pursuant To Section 52.15(g)(3)",
            None,
        )],
    );

    let pipeline = pipeline_with(
        MockSynthesizer::new(),
        MockDocumentFetcher::new(),
        MockWebSearcher::new(),
    );
    pipeline.run(&source, &DEFAULT_QUERIES[..1]).await.unwrap();

    let entities = pipeline.store().all_entities().await.unwrap();
    assert_eq!(entities.len(), 1);
    assert_eq!(entities[0].canonical_name, "ULEC, LLC");
    assert_eq!(entities[0].normalized_name, "ulec");
    assert_eq!(entities[0].filer_type, FilerType::Corporate);
    assert_eq!(entities[0].entity_id, Entity::derive_id("ulec"));
}

#[tokio::test]
async fn name_variants_aggregate_into_one_entity() {
    let source = MockFilingSource::new().with_filings(
        DEFAULT_QUERIES[0],
        vec![
            raw_filing(
                "1",
                "Interconnected VoIP Numbering Authorization Application Filed By Bandwidth.com, Inc. Pursuant To Section 52.15(g)",
                None,
            ),
            raw_filing(
                "2",
                "Interconnected VoIP Numbering Authorization Application Filed By BANDWIDTH.COM INC Pursuant To Section 52.15(g)",
                None,
            ),
        ],
    );

    let pipeline = pipeline_with(
        MockSynthesizer::new(),
        MockDocumentFetcher::new(),
        MockWebSearcher::new(),
    );
    pipeline.run(&source, &DEFAULT_QUERIES[..1]).await.unwrap();

    let entities = pipeline.store().all_entities().await.unwrap();
    assert_eq!(entities.len(), 1);
    assert!(entities[0].name_variants.contains("Bandwidth.com, Inc."));
    assert!(entities[0].name_variants.contains("BANDWIDTH.COM INC"));
}

#[tokio::test]
async fn degraded_entity_completes_run_as_undetermined() {
    // Zero usable documents, zero search results, failed synthesis.
    let mut filing = raw_filing(
        "1",
        "Interconnected VoIP Numbering Authorization Application Filed By Ghost Voice LLC Pursuant To 52.15(g)",
        None,
    );
    filing.documents = vec![RawDocument {
        filename: Some("application.pdf".to_string()),
        src: Some("https://www.fcc.gov/ecfs/document/1/1".to_string()),
    }];
    let source = MockFilingSource::new().with_filings(DEFAULT_QUERIES[0], vec![filing]);

    let pipeline = pipeline_with(
        MockSynthesizer::new().failing("model unavailable"),
        MockDocumentFetcher::new().with_failure("https://www.fcc.gov/ecfs/document/1/1"),
        MockWebSearcher::new(),
    );

    let report = pipeline
        .run(&source, &DEFAULT_QUERIES[..1])
        .await
        .expect("run completes despite degradations");

    assert_eq!(report.count(FailureKind::FetchFailed), 1);
    assert_eq!(report.count(FailureKind::SynthesisUnavailable), 1);

    let entities = pipeline.store().all_entities().await.unwrap();
    let enrichment = entities[0].enrichment.as_ref().unwrap();
    assert_eq!(enrichment.provenance, Provenance::Undetermined);
    assert_eq!(enrichment.market_position, MarketPosition::Unknown);
    assert!(report
        .degraded_subjects()
        .contains(&entities[0].entity_id.as_str()));
}

#[tokio::test]
async fn person_named_filer_clusters_with_filed_by_supplement() {
    // No "Filed By" in the application's own description, but a related
    // supplement carries it.
    let application = raw_filing(
        "1",
        "Interconnected VoIP Numbering Application",
        Some("Jeremy Mcpherson"),
    );
    let mut supplement = raw_filing(
        "2",
        "Interconnected VoIP Numbering Supplement Filed By Jeremy Mcpherson Pursuant To 52.15(g)",
        Some("Jeremy Mcpherson"),
    );
    supplement.submissiontype = Some(RawDescribed {
        description: Some("SUPPLEMENT".to_string()),
    });

    let source =
        MockFilingSource::new().with_filings(DEFAULT_QUERIES[0], vec![application, supplement]);

    let pipeline = pipeline_with(
        MockSynthesizer::new(),
        MockDocumentFetcher::new(),
        MockWebSearcher::new(),
    );
    pipeline.run(&source, &DEFAULT_QUERIES[..1]).await.unwrap();

    // The supplement's description resolves Corporate at aggregation, so
    // both filings land in the same cluster and the entity is Corporate.
    let entities = pipeline.store().all_entities().await.unwrap();
    assert_eq!(entities.len(), 1);
    assert_eq!(entities[0].filer_type, FilerType::Corporate);
}

#[tokio::test]
async fn synthesized_market_position_survives_rule_pass() {
    let source = MockFilingSource::new().with_filings(
        DEFAULT_QUERIES[0],
        vec![raw_filing(
            "1",
            "Interconnected VoIP Numbering Authorization Application Filed By Telnyx LLC Pursuant To 52.15(g)",
            None,
        )],
    );

    let pipeline = pipeline_with(
        MockSynthesizer::new().with_candidate(SynthesisCandidate {
            is_active: Some(true),
            industry_segment: Some("CPaaS".into()),
            market_position: Some("Enterprise".into()),
            enrichment_confidence: Some("High".into()),
            ..Default::default()
        }),
        MockDocumentFetcher::new(),
        MockWebSearcher::new(),
    );
    pipeline.run(&source, &DEFAULT_QUERIES[..1]).await.unwrap();

    let entities = pipeline.store().all_entities().await.unwrap();
    let enrichment = entities[0].enrichment.as_ref().unwrap();
    assert_eq!(enrichment.provenance, Provenance::Synthesized);
    assert_eq!(enrichment.market_position, MarketPosition::Enterprise);

    let corrections = pipeline.store().corrections().await.unwrap();
    assert!(corrections
        .iter()
        .all(|c| c.field != "market_position"));
}

#[tokio::test]
async fn document_evidence_flows_into_pack() {
    let mut filing = raw_filing(
        "1",
        "Interconnected VoIP Numbering Authorization Application Filed By ULEC, LLC Pursuant To 52.15(g)",
        None,
    );
    filing.documents = vec![RawDocument {
        filename: Some("application.txt".to_string()),
        src: Some("https://www.fcc.gov/ecfs/document/1/1".to_string()),
    }];
    let source = MockFilingSource::new().with_filings(DEFAULT_QUERIES[0], vec![filing]);

    let synthesizer = Arc::new(MockSynthesizer::new());
    let pipeline = Pipeline::new(
        MemoryStore::new(),
        MockDocumentFetcher::new().with_text(
            "https://www.fcc.gov/ecfs/document/1/1",
            "City: Austin\nState: TX\nEmail: ops@ulec.example.com",
        ),
        PlainTextExtractor,
        Arc::new(MockWebSearcher::new()),
        Arc::clone(&synthesizer),
        PipelineConfig::default(),
    );
    pipeline.run(&source, &DEFAULT_QUERIES[..1]).await.unwrap();

    let packs = synthesizer.received_packs();
    assert_eq!(packs.len(), 1);
    let parsed = packs[0].parsed_from_docs.as_ref().unwrap();
    assert_eq!(parsed.city.as_deref(), Some("Austin"));
    assert_eq!(parsed.email.as_deref(), Some("ops@ulec.example.com"));
    assert!(packs[0].source_ids().contains(&"fcc_documents".to_string()));
}

#[test]
fn normalization_determinism_examples() {
    assert_eq!(normalize_name("RGTN USA, Inc."), normalize_name("RGTN USA Inc."));
    assert_eq!(
        normalize_name("Mix Networks, Inc"),
        normalize_name("Mix Networks")
    );
    assert_eq!(normalize_name("ULEC, LLC"), "ulec");
}

mod normalization_properties {
    use super::normalize_name;
    use proptest::prelude::*;
    use resolution::Entity;

    fn base_name() -> impl Strategy<Value = String> {
        proptest::collection::vec("[A-Z][a-z]{2,8}", 1..4).prop_map(|words| words.join(" "))
    }

    proptest! {
        #[test]
        fn idempotent(name in base_name()) {
            let once = normalize_name(&name);
            prop_assert_eq!(normalize_name(&once), once);
        }

        #[test]
        fn suffix_and_punctuation_invariant(
            name in base_name(),
            suffix in prop::sample::select(vec!["LLC", "Inc", "Corp", "Ltd", "L.L.C.", "Inc.", "Co."]),
            comma in any::<bool>(),
        ) {
            let sep = if comma { ", " } else { " " };
            let decorated = format!("{name}{sep}{suffix}");
            prop_assert_eq!(normalize_name(&decorated), normalize_name(&name));
        }

        #[test]
        fn entity_id_stable(name in base_name()) {
            let key = normalize_name(&name);
            prop_assert_eq!(Entity::derive_id(&key), Entity::derive_id(&key));
        }
    }
}
