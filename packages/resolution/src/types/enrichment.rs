//! Structured enrichment - the validated output of evidence fusion.
//!
//! The synthesis collaborator is untrusted text generation: everything it
//! returns passes through [`StructuredEnrichment::from_candidate`], which
//! restricts categorical fields to their enumerated value sets. Values the
//! parser does not recognize are coerced to `Unknown`, never accepted
//! verbatim.

use serde::{Deserialize, Serialize};

/// Tri-state activity determination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Activity {
    Active,
    Inactive,
    #[default]
    Unknown,
}

impl Activity {
    fn from_bool(value: Option<bool>) -> Self {
        match value {
            Some(true) => Self::Active,
            Some(false) => Self::Inactive,
            None => Self::Unknown,
        }
    }
}

/// Primary industry segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum IndustrySegment {
    UCaaS,
    CCaaS,
    CPaaS,
    Carrier,
    Reseller,
    EnterpriseIt,
    Other,
    #[default]
    Unknown,
}

impl IndustrySegment {
    /// Parse a candidate string, coercing anything unrecognized to
    /// `Unknown`.
    pub fn coerce(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "ucaas" => Self::UCaaS,
            "ccaas" => Self::CCaaS,
            "cpaas" => Self::CPaaS,
            "carrier" => Self::Carrier,
            "reseller" => Self::Reseller,
            "enterprise it" => Self::EnterpriseIt,
            "other" => Self::Other,
            _ => Self::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::UCaaS => "UCaaS",
            Self::CCaaS => "CCaaS",
            Self::CPaaS => "CPaaS",
            Self::Carrier => "Carrier",
            Self::Reseller => "Reseller",
            Self::EnterpriseIt => "Enterprise IT",
            Self::Other => "Other",
            Self::Unknown => "Unknown",
        }
    }
}

/// Target market segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MarketPosition {
    Enterprise,
    MidMarket,
    Smb,
    Startup,
    #[default]
    Unknown,
}

impl MarketPosition {
    /// Parse a candidate string, coercing anything unrecognized to
    /// `Unknown`.
    pub fn coerce(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "enterprise" => Self::Enterprise,
            "mid-market" | "midmarket" | "mid market" => Self::MidMarket,
            "smb" => Self::Smb,
            "startup" => Self::Startup,
            _ => Self::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Enterprise => "Enterprise",
            Self::MidMarket => "Mid-Market",
            Self::Smb => "SMB",
            Self::Startup => "Startup",
            Self::Unknown => "Unknown",
        }
    }
}

/// Confidence in enrichment quality, based on evidence diversity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Confidence {
    High,
    Medium,
    #[default]
    Low,
}

impl Confidence {
    pub fn coerce(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "high" => Self::High,
            "medium" => Self::Medium,
            _ => Self::Low,
        }
    }
}

/// Which process produced an enrichment value.
///
/// State machine: `Undetermined -> Synthesized` (fusion succeeded) or
/// `Undetermined -> Rules` (a fill rule fired). `Synthesized` is never
/// downgraded by the rule engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Provenance {
    Synthesized,
    Rules,
    #[default]
    Undetermined,
}

/// Raw candidate returned by the synthesis collaborator, before
/// validation. Categorical fields are plain strings here on purpose.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SynthesisCandidate {
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub activity_signal: Option<String>,
    #[serde(default)]
    pub industry_segment: Option<String>,
    #[serde(default)]
    pub product_summary: Option<String>,
    #[serde(default)]
    pub market_position: Option<String>,
    #[serde(default)]
    pub enrichment_confidence: Option<String>,
}

/// Validated enrichment attached to an entity.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StructuredEnrichment {
    pub is_active: Activity,

    /// Evidence supporting the activity determination; must reference
    /// specific sources.
    pub activity_signal: Option<String>,

    pub industry_segment: IndustrySegment,

    /// 1-2 sentence description of what the company does.
    pub product_summary: Option<String>,

    pub market_position: MarketPosition,

    pub confidence: Confidence,

    pub provenance: Provenance,

    /// Evidence identifiers cited (e.g. "fcc_documents", search URLs).
    pub sources: Vec<String>,

    /// Which rule filled `market_position`, when provenance is Rules.
    pub rule_reason: Option<String>,
}

impl StructuredEnrichment {
    /// Validate and coerce an untrusted synthesis candidate.
    ///
    /// Unrecognized categorical values become `Unknown`; missing text
    /// fields become `None`. This never fails - garbage in, Unknown out.
    pub fn from_candidate(candidate: SynthesisCandidate, sources: Vec<String>) -> Self {
        Self {
            is_active: Activity::from_bool(candidate.is_active),
            activity_signal: candidate.activity_signal.filter(|s| !s.trim().is_empty()),
            industry_segment: candidate
                .industry_segment
                .as_deref()
                .map(IndustrySegment::coerce)
                .unwrap_or_default(),
            product_summary: candidate.product_summary.filter(|s| !s.trim().is_empty()),
            market_position: candidate
                .market_position
                .as_deref()
                .map(MarketPosition::coerce)
                .unwrap_or_default(),
            confidence: candidate
                .enrichment_confidence
                .as_deref()
                .map(Confidence::coerce)
                .unwrap_or_default(),
            provenance: Provenance::Synthesized,
            sources,
            rule_reason: None,
        }
    }

    /// An empty enrichment for entities whose fusion degraded.
    pub fn undetermined() -> Self {
        Self::default()
    }

    /// Whether any categorical value was actually recognized.
    pub fn has_signal(&self) -> bool {
        self.is_active != Activity::Unknown
            || self.industry_segment != IndustrySegment::Unknown
            || self.market_position != MarketPosition::Unknown
            || self.product_summary.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_known_values() {
        assert_eq!(IndustrySegment::coerce("UCaaS"), IndustrySegment::UCaaS);
        assert_eq!(
            IndustrySegment::coerce("enterprise it"),
            IndustrySegment::EnterpriseIt
        );
        assert_eq!(MarketPosition::coerce("Mid-Market"), MarketPosition::MidMarket);
        assert_eq!(Confidence::coerce("HIGH"), Confidence::High);
    }

    #[test]
    fn test_coerce_unknown_values() {
        // The collaborator is untrusted; invented categories never pass
        // through verbatim.
        assert_eq!(
            IndustrySegment::coerce("Telephony-as-a-Service"),
            IndustrySegment::Unknown
        );
        assert_eq!(MarketPosition::coerce("Galactic"), MarketPosition::Unknown);
    }

    #[test]
    fn test_from_candidate_coerces_everything() {
        let candidate = SynthesisCandidate {
            is_active: Some(true),
            activity_signal: Some("Recent FCC filing (2024)".into()),
            industry_segment: Some("Carrier".into()),
            product_summary: Some("   ".into()),
            market_position: Some("Planetary".into()),
            enrichment_confidence: Some("Medium".into()),
        };

        let enrichment =
            StructuredEnrichment::from_candidate(candidate, vec!["fcc_filings".into()]);

        assert_eq!(enrichment.is_active, Activity::Active);
        assert_eq!(enrichment.industry_segment, IndustrySegment::Carrier);
        assert_eq!(enrichment.market_position, MarketPosition::Unknown);
        assert_eq!(enrichment.product_summary, None); // blank text dropped
        assert_eq!(enrichment.confidence, Confidence::Medium);
        assert_eq!(enrichment.provenance, Provenance::Synthesized);
    }

    #[test]
    fn test_undetermined_has_no_signal() {
        let enrichment = StructuredEnrichment::undetermined();
        assert_eq!(enrichment.provenance, Provenance::Undetermined);
        assert!(!enrichment.has_signal());
    }
}
