//! Synthesis trait for LLM-backed enrichment.
//!
//! The synthesizer receives a serialized evidence pack and returns an
//! unvalidated [`SynthesisCandidate`]. Validation happens downstream in
//! [`StructuredEnrichment::from_candidate`]; implementations here only
//! need to get a candidate out of the model, not vouch for its contents.
//!
//! [`StructuredEnrichment::from_candidate`]: crate::types::enrichment::StructuredEnrichment::from_candidate

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::security::SecretString;
use crate::traits::searcher::SearchSnippet;
use crate::types::entity::{Entity, ExtractedFields};
use crate::types::enrichment::SynthesisCandidate;
use crate::types::signals::FilingSignals;

/// Filing-derived portion of the evidence pack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilingEvidence {
    pub first_filing_date: DateTime<Utc>,
    pub latest_filing_date: DateTime<Utc>,
    pub total_filings: usize,
    pub docket_numbers: Vec<String>,
    pub proceeding_types: Vec<String>,
    pub has_supplements: bool,
    pub recent_activity: bool,
}

/// Everything the synthesizer is allowed to see for one entity.
///
/// The pack is the whole context; the prompt instructs the model to
/// ground every assessment in it and nothing else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidencePack {
    pub company_name: String,
    pub aliases: Vec<String>,
    pub fcc_filing: FilingEvidence,
    pub parsed_from_docs: Option<ExtractedFields>,
    /// Capped at five results regardless of what the searcher returned.
    pub web_search_results: Vec<SearchSnippet>,
}

impl EvidencePack {
    /// Maximum search snippets carried into the pack.
    pub const MAX_SNIPPETS: usize = 5;

    /// Assemble the pack from an entity and its search results.
    pub fn assemble(entity: &Entity, signals: &FilingSignals, mut snippets: Vec<SearchSnippet>) -> Self {
        snippets.truncate(Self::MAX_SNIPPETS);
        Self {
            company_name: entity.canonical_name.clone(),
            aliases: entity.name_variants.iter().cloned().collect(),
            fcc_filing: FilingEvidence {
                first_filing_date: entity.first_filing_at,
                latest_filing_date: entity.last_filing_at,
                total_filings: signals.total_filings,
                docket_numbers: entity.dockets.iter().cloned().collect(),
                proceeding_types: entity.proceeding_descriptions.iter().cloned().collect(),
                has_supplements: signals.has_supplements,
                recent_activity: signals.recent_activity,
            },
            parsed_from_docs: entity.extracted_fields.clone(),
            web_search_results: snippets,
        }
    }

    /// Evidence identifiers the enrichment should cite as sources.
    pub fn source_ids(&self) -> Vec<String> {
        let mut sources = Vec::new();
        if self.parsed_from_docs.as_ref().is_some_and(|f| !f.is_empty()) {
            sources.push("fcc_documents".to_string());
        }
        if self.fcc_filing.total_filings > 0 {
            sources.push("fcc_filings".to_string());
        }
        sources.extend(
            self.web_search_results
                .iter()
                .take(3)
                .map(|s| s.url.clone()),
        );
        sources
    }
}

/// Synthesis collaborator.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Synthesize an enrichment candidate from the evidence pack.
    ///
    /// The returned candidate is untrusted; callers coerce it through the
    /// enrichment value sets before storing anything.
    async fn synthesize(&self, evidence: &EvidencePack) -> Result<SynthesisCandidate>;
}

/// JSON schema the model's structured output must satisfy.
fn candidate_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "is_active": {
                "type": "boolean",
                "description": "Is the company currently operating? Base on evidence."
            },
            "activity_signal": {
                "type": "string",
                "description": "Evidence supporting the is_active determination. Cite specific sources."
            },
            "industry_segment": {
                "type": "string",
                "enum": ["UCaaS", "CCaaS", "CPaaS", "Carrier", "Reseller", "Enterprise IT", "Other", "Unknown"],
                "description": "Primary industry segment"
            },
            "product_summary": {
                "type": "string",
                "description": "1-2 sentence description of what the company does"
            },
            "market_position": {
                "type": "string",
                "enum": ["Enterprise", "Mid-Market", "SMB", "Startup", "Unknown"],
                "description": "Target market segment"
            },
            "enrichment_confidence": {
                "type": "string",
                "enum": ["High", "Medium", "Low"],
                "description": "Confidence in enrichment quality based on evidence diversity"
            }
        },
        "required": [
            "is_active",
            "activity_signal",
            "industry_segment",
            "product_summary",
            "market_position",
            "enrichment_confidence"
        ],
        "additionalProperties": false
    })
}

const SYNTHESIS_SYSTEM: &str = "You are analyzing an IPES (Interconnected VoIP Provider) company \
that filed for numbering authorization with the FCC. Ground ALL assessments in the provided \
evidence. Use \"Unknown\" when evidence is insufficient. DO NOT hallucinate.";

fn build_prompt(evidence: &EvidencePack) -> Result<String> {
    let pack_json = serde_json::to_string_pretty(evidence)?;
    Ok(format!(
        r#"Based ONLY on the evidence provided below, determine:
1. Whether the company is likely still active
2. Their industry segment (UCaaS, CCaaS, CPaaS, Carrier, Reseller, Enterprise IT, or Other)
3. A brief product summary
4. Their market position (Enterprise, Mid-Market, SMB, Startup, or Unknown)
5. Your confidence level based on evidence quality

EVIDENCE PACK:
{pack_json}

RULES:
- Ground ALL assessments in the provided evidence
- Cite specific sources in activity_signal (e.g., "Recent FCC filing (2024)", "Company website found via search")
- Use "Unknown" when evidence is insufficient - DO NOT hallucinate
- Confidence levels:
  - High = Multiple confirming signals (recent web presence + recent filings + company details)
  - Medium = Some signals but incomplete picture
  - Low = FCC data only, no external confirmation"#
    ))
}

/// OpenAI-backed synthesizer using structured output.
#[derive(Clone)]
pub struct OpenAiSynthesizer {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl OpenAiSynthesizer {
    /// Create a new synthesizer with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: SecretString::new(api_key),
            model: "gpt-4o".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    /// Create from the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| PipelineError::Config("OPENAI_API_KEY not set".into()))?;
        Ok(Self::new(api_key))
    }

    /// Set the chat model (default: gpt-4o).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set a custom base URL (for Azure, proxies, etc.).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Get the current model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    async fn generate_structured(&self, system: &str, user: &str) -> Result<String> {
        #[derive(Serialize)]
        struct ChatMessage {
            role: String,
            content: String,
        }

        #[derive(Serialize)]
        struct JsonSchemaFormat {
            name: String,
            strict: bool,
            schema: serde_json::Value,
        }

        #[derive(Serialize)]
        struct ResponseFormat {
            #[serde(rename = "type")]
            format_type: String,
            json_schema: JsonSchemaFormat,
        }

        #[derive(Serialize)]
        struct StructuredRequest {
            model: String,
            messages: Vec<ChatMessage>,
            temperature: f32,
            response_format: ResponseFormat,
        }

        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<ChatChoice>,
        }

        #[derive(Deserialize)]
        struct ChatChoice {
            message: ChatResponseMessage,
        }

        #[derive(Deserialize)]
        struct ChatResponseMessage {
            content: String,
        }

        let request = StructuredRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            temperature: 0.0,
            response_format: ResponseFormat {
                format_type: "json_schema".to_string(),
                json_schema: JsonSchemaFormat {
                    name: "enrichment_result".to_string(),
                    strict: true,
                    schema: candidate_schema(),
                },
            },
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key.expose()))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| PipelineError::SynthesisUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(PipelineError::SynthesisUnavailable(format!(
                "OpenAI structured output error: {error_text}"
            )));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::SynthesisUnavailable(e.to_string()))?;

        chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| PipelineError::SynthesisUnavailable("empty response".into()))
    }
}

#[async_trait]
impl Synthesizer for OpenAiSynthesizer {
    async fn synthesize(&self, evidence: &EvidencePack) -> Result<SynthesisCandidate> {
        let prompt = build_prompt(evidence)?;
        let raw = self.generate_structured(SYNTHESIS_SYSTEM, &prompt).await?;

        // Models sometimes wrap output in a markdown code fence.
        let candidate: SynthesisCandidate = serde_json::from_str(&raw)
            .or_else(|_| {
                let json_str = raw
                    .trim()
                    .trim_start_matches("```json")
                    .trim_start_matches("```")
                    .trim_end_matches("```")
                    .trim();
                serde_json::from_str(json_str)
            })
            .map_err(|e| PipelineError::SynthesisInvalid {
                reason: format!("candidate did not parse: {e}"),
            })?;

        Ok(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_pack() -> EvidencePack {
        EvidencePack {
            company_name: "ULEC, LLC".to_string(),
            aliases: vec!["ULEC LLC".to_string()],
            fcc_filing: FilingEvidence {
                first_filing_date: Utc::now(),
                latest_filing_date: Utc::now(),
                total_filings: 3,
                docket_numbers: vec!["24-0100".to_string()],
                proceeding_types: vec![],
                has_supplements: false,
                recent_activity: true,
            },
            parsed_from_docs: None,
            web_search_results: vec![
                SearchSnippet::from_url("https://ulec.example.com").unwrap(),
                SearchSnippet::from_url("https://news.example.com/ulec").unwrap(),
                SearchSnippet::from_url("https://dir.example.com/ulec").unwrap(),
                SearchSnippet::from_url("https://extra.example.com/1").unwrap(),
            ],
        }
    }

    #[test]
    fn test_prompt_carries_evidence() {
        let pack = sample_pack();
        let prompt = build_prompt(&pack).unwrap();
        assert!(prompt.contains("ULEC, LLC"));
        assert!(prompt.contains("24-0100"));
        assert!(prompt.contains("DO NOT hallucinate"));
    }

    #[test]
    fn test_source_ids_order_and_cap() {
        let pack = sample_pack();
        let sources = pack.source_ids();
        // fcc_filings first (no parsed docs), then at most three URLs.
        assert_eq!(sources[0], "fcc_filings");
        assert_eq!(sources.len(), 4);
        assert!(sources[1].starts_with("https://ulec.example.com"));
    }

    #[test]
    fn test_schema_enumerates_segments() {
        let schema = candidate_schema();
        let segments = &schema["properties"]["industry_segment"]["enum"];
        assert!(segments.as_array().unwrap().len() == 8);
    }
}
