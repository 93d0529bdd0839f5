//! Content structuring: document text in, validated slide outline out.
//!
//! The pipeline only sees the [`SlideOracle`] trait. [`LlmOracle`] is the
//! built-in implementation on top of any `edgequake-llm` chat provider;
//! tests and callers with their own generator plug in a different one via
//! [`crate::config::DeckConfigBuilder::oracle`].
//!
//! ## Retry Strategy
//!
//! Transport errors and per-call timeouts are retried with exponential
//! backoff (`retry_backoff_ms * 2^(attempt-1)`). A response that arrives but
//! does not hold a valid outline is a contract violation and is returned at
//! once: asking again with the same prompt rarely fixes a malformed answer
//! and the caller is better served by a clear error.

use crate::config::{Audience, DeckConfig, Tone};
use crate::error::DeckError;
use crate::model::SlideSpec;
use crate::prompts::{outline_user_prompt, OUTLINE_SYSTEM_PROMPT};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info, warn};

/// Model used when a provider is named without one.
const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Everything the oracle needs for one outline.
#[derive(Debug, Clone, PartialEq)]
pub struct StructureRequest {
    pub document_text: String,
    pub audience: Audience,
    pub tone: Tone,
    pub instructions: String,
}

impl StructureRequest {
    pub fn from_config(document_text: impl Into<String>, config: &DeckConfig) -> Self {
        Self {
            document_text: document_text.into(),
            audience: config.audience,
            tone: config.tone,
            instructions: config.instructions.clone(),
        }
    }
}

/// Produces the ordered slide outline for a document.
///
/// The first returned spec is the title slide. Implementations return
/// [`DeckError::OracleContractViolation`] rather than an empty or malformed
/// outline; the pipeline re-checks with [`validate_outline`] regardless.
#[async_trait]
pub trait SlideOracle: Send + Sync {
    async fn generate(&self, request: &StructureRequest) -> Result<Vec<SlideSpec>, DeckError>;
}

/// Oracle backed by an LLM chat provider.
pub struct LlmOracle {
    provider: Arc<dyn LLMProvider>,
    temperature: f32,
    max_tokens: usize,
    max_retries: u32,
    retry_backoff_ms: u64,
    api_timeout_secs: u64,
}

impl LlmOracle {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &DeckConfig) -> Self {
        Self {
            provider,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
            api_timeout_secs: config.api_timeout_secs,
        }
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }
}

#[async_trait]
impl SlideOracle for LlmOracle {
    async fn generate(&self, request: &StructureRequest) -> Result<Vec<SlideSpec>, DeckError> {
        let start = Instant::now();
        let messages = vec![
            ChatMessage::system(OUTLINE_SYSTEM_PROMPT),
            ChatMessage::user(outline_user_prompt(
                &request.document_text,
                request.audience,
                request.tone,
                &request.instructions,
            )),
        ];
        let options = self.options();
        let per_call = Duration::from_secs(self.api_timeout_secs);

        let mut last_err: Option<String> = None;
        let mut last_was_timeout = false;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = self.retry_backoff_ms * 2u64.pow(attempt - 1);
                warn!(
                    "Outline: retry {}/{} after {}ms",
                    attempt, self.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            match timeout(per_call, self.provider.chat(&messages, Some(&options))).await {
                Ok(Ok(response)) => {
                    debug!(
                        "Outline: {} input tokens, {} output tokens, {:?}",
                        response.prompt_tokens,
                        response.completion_tokens,
                        start.elapsed()
                    );
                    let slides = parse_outline(&response.content)?;
                    info!("Outline: {} slides in {:?}", slides.len(), start.elapsed());
                    return Ok(slides);
                }
                Ok(Err(e)) => {
                    warn!("Outline: attempt {} failed: {}", attempt + 1, e);
                    last_err = Some(e.to_string());
                    last_was_timeout = false;
                }
                Err(_) => {
                    warn!(
                        "Outline: attempt {} timed out after {}s",
                        attempt + 1,
                        self.api_timeout_secs
                    );
                    last_was_timeout = true;
                }
            }
        }

        if last_was_timeout {
            return Err(DeckError::OracleTimeout {
                secs: self.api_timeout_secs,
            });
        }
        Err(DeckError::OracleFailed {
            retries: self.max_retries,
            detail: last_err.unwrap_or_else(|| "Unknown error".to_string()),
        })
    }
}

/// Parse a raw oracle reply: the JSON array spanning the first `[` to the
/// last `]`, validated item by item. Bullets are trimmed.
pub fn parse_outline(raw: &str) -> Result<Vec<SlideSpec>, DeckError> {
    let raw = raw.trim();
    let (start, end) = match (raw.find('['), raw.rfind(']')) {
        (Some(s), Some(e)) if s < e => (s, e),
        _ => return Err(violation("response does not contain a JSON array")),
    };

    let value: Value = serde_json::from_str(&raw[start..=end])
        .map_err(|e| violation(format!("response is not valid JSON: {}", e)))?;
    let items = value
        .as_array()
        .ok_or_else(|| violation("response must be a list of slides"))?;

    let slides = items
        .iter()
        .enumerate()
        .map(|(i, item)| parse_slide(i, item))
        .collect::<Result<Vec<_>, _>>()?;

    validate_outline(&slides)?;
    Ok(slides)
}

fn parse_slide(index: usize, item: &Value) -> Result<SlideSpec, DeckError> {
    let obj = item
        .as_object()
        .ok_or_else(|| violation(format!("slide {} is not an object", index + 1)))?;

    let title = match obj.get("title") {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(_) => return Err(violation(format!("slide {} title is not a string", index + 1))),
        None => return Err(violation(format!("slide {} has no title", index + 1))),
    };

    let bullets = match obj.get("bullets") {
        Some(Value::Null) => Vec::new(),
        Some(Value::Array(entries)) => entries
            .iter()
            .map(|b| {
                b.as_str().map(|s| s.trim().to_string()).ok_or_else(|| {
                    violation(format!("slide {} has a non-string bullet", index + 1))
                })
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => {
            return Err(violation(format!(
                "slide {} bullets must be an array of strings",
                index + 1
            )))
        }
        None => return Err(violation(format!("slide {} has no bullets", index + 1))),
    };

    let spec = SlideSpec::new(title, bullets);
    match obj.get("image_hint") {
        None | Some(Value::Null) => Ok(spec),
        Some(Value::String(hint)) if hint.trim().is_empty() => Ok(spec),
        Some(Value::String(hint)) => Ok(spec.with_hint(hint.trim())),
        Some(_) => Err(violation(format!(
            "slide {} image_hint is not a string",
            index + 1
        ))),
    }
}

/// Outline-level contract: at least one slide, every title non-empty.
pub fn validate_outline(slides: &[SlideSpec]) -> Result<(), DeckError> {
    if slides.is_empty() {
        return Err(violation("empty slide list"));
    }
    if let Some(i) = slides.iter().position(|s| s.title.trim().is_empty()) {
        return Err(violation(format!("slide {} has an empty title", i + 1)));
    }
    Ok(())
}

fn violation(detail: impl Into<String>) -> DeckError {
    DeckError::OracleContractViolation {
        detail: detail.into(),
    }
}

// ── Provider resolution ──────────────────────────────────────────────────

/// The oracle for a run: a pre-built one from the config, else an
/// [`LlmOracle`] over the resolved provider.
pub fn resolve_oracle(config: &DeckConfig) -> Result<Arc<dyn SlideOracle>, DeckError> {
    if let Some(ref oracle) = config.oracle {
        return Ok(Arc::clone(oracle));
    }
    let provider = resolve_provider(config)?;
    Ok(Arc::new(LlmOracle::new(provider, config)))
}

/// Resolve the LLM provider, most specific first:
///
/// 1. `config.provider`
/// 2. `config.provider_name` (+ `config.model`)
/// 3. `DOC2DECK_LLM_PROVIDER` + `DOC2DECK_MODEL`, when both are set
/// 4. `ProviderFactory::from_env()` auto-detection
pub fn resolve_provider(config: &DeckConfig) -> Result<Arc<dyn LLMProvider>, DeckError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("DOC2DECK_LLM_PROVIDER"),
        std::env::var("DOC2DECK_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| DeckError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, GEMINI_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

fn create_provider(name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, DeckError> {
    ProviderFactory::create_llm_provider(name, model).map_err(|e| {
        DeckError::ProviderNotConfigured {
            provider: name.to_string(),
            hint: format!("{e}"),
        }
    })
}
