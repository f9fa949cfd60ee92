//! Test doubles and fixtures.
//!
//! `MockSynthesizer` tracks every evidence pack it receives so tests can
//! assert on call counts and pack contents. Mocks for the other
//! collaborators live alongside their traits.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use crate::error::{PipelineError, Result};
use crate::traits::synthesizer::{EvidencePack, Synthesizer};
use crate::types::enrichment::SynthesisCandidate;

/// Mock synthesizer returning a canned candidate.
#[derive(Default)]
pub struct MockSynthesizer {
    candidate: RwLock<Option<SynthesisCandidate>>,
    failure: RwLock<Option<String>>,
    calls: AtomicUsize,
    packs: RwLock<Vec<EvidencePack>>,
}

impl MockSynthesizer {
    /// Create a mock returning an empty candidate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return this candidate on every call.
    pub fn with_candidate(self, candidate: SynthesisCandidate) -> Self {
        *self.candidate.write().unwrap() = Some(candidate);
        self
    }

    /// Fail every call with `SynthesisUnavailable`.
    pub fn failing(self, reason: &str) -> Self {
        *self.failure.write().unwrap() = Some(reason.to_string());
        self
    }

    /// Number of synthesize calls received.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Evidence packs received, in call order.
    pub fn received_packs(&self) -> Vec<EvidencePack> {
        self.packs.read().unwrap().clone()
    }
}

#[async_trait]
impl Synthesizer for MockSynthesizer {
    async fn synthesize(&self, evidence: &EvidencePack) -> Result<SynthesisCandidate> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.packs.write().unwrap().push(evidence.clone());

        if let Some(reason) = self.failure.read().unwrap().as_ref() {
            return Err(PipelineError::SynthesisUnavailable(reason.clone()));
        }

        Ok(self
            .candidate
            .read()
            .unwrap()
            .clone()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::synthesizer::FilingEvidence;
    use chrono::Utc;

    fn pack() -> EvidencePack {
        EvidencePack {
            company_name: "ULEC, LLC".to_string(),
            aliases: vec![],
            fcc_filing: FilingEvidence {
                first_filing_date: Utc::now(),
                latest_filing_date: Utc::now(),
                total_filings: 1,
                docket_numbers: vec![],
                proceeding_types: vec![],
                has_supplements: false,
                recent_activity: true,
            },
            parsed_from_docs: None,
            web_search_results: vec![],
        }
    }

    #[tokio::test]
    async fn test_mock_tracks_calls() {
        let mock = MockSynthesizer::new().with_candidate(SynthesisCandidate {
            is_active: Some(true),
            ..Default::default()
        });

        let candidate = mock.synthesize(&pack()).await.unwrap();
        assert_eq!(candidate.is_active, Some(true));
        assert_eq!(mock.call_count(), 1);
        assert_eq!(mock.received_packs()[0].company_name, "ULEC, LLC");
    }

    #[tokio::test]
    async fn test_mock_failure_mode() {
        let mock = MockSynthesizer::new().failing("down");
        let err = mock.synthesize(&pack()).await.unwrap_err();
        assert!(matches!(err, PipelineError::SynthesisUnavailable(_)));
        assert_eq!(mock.call_count(), 1);
    }
}
