//! Configuration types for deck generation.
//!
//! All run behaviour is controlled through [`DeckConfig`], built via its
//! [`DeckConfigBuilder`]. Matching thresholds and layout geometry live here
//! next to the oracle settings so two runs can be diffed field by field.

use crate::error::DeckError;
use crate::pipeline::layout::DeckTemplate;
use crate::pipeline::oracle::SlideOracle;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Configuration for one deck-generation run.
///
/// # Example
/// ```rust
/// use doc2deck::{Audience, DeckConfig, Tone};
///
/// let config = DeckConfig::builder()
///     .audience(Audience::Technical)
///     .tone(Tone::Concise)
///     .instructions("Focus on key metrics and include charts")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct DeckConfig {
    /// Who the deck is for. Default: General.
    pub audience: Audience,

    /// Register of the generated text. Default: Formal.
    pub tone: Tone,

    /// Free-text instructions forwarded verbatim to the oracle.
    pub instructions: String,

    /// Pre-constructed oracle. Takes precedence over every provider field.
    pub oracle: Option<Arc<dyn SlideOracle>>,

    /// Pre-constructed LLM provider for the built-in oracle.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// LLM provider name (e.g. "openai", "gemini", "ollama").
    pub provider_name: Option<String>,

    /// LLM model identifier. If None, uses the provider default.
    pub model: Option<String>,

    /// Sampling temperature for the outline request. Default: 0.3.
    pub temperature: f32,

    /// Maximum tokens the oracle may generate. Default: 4096.
    pub max_tokens: usize,

    /// Retry attempts on a transient oracle failure. Default: 3.
    ///
    /// Contract violations (unparseable or malformed outlines) are not
    /// retried; they end the run.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-oracle-call timeout in seconds. Default: 90.
    pub api_timeout_secs: u64,

    /// Timeout for the whole run in seconds. Default: none.
    pub run_timeout_secs: Option<u64>,

    /// Assets probed and persisted in parallel during harvest. Default: 4.
    pub concurrency: usize,

    /// Height of the text band searched above and below a page image, in
    /// document units. Default: 200.
    pub context_window: f64,

    /// Cap on geometric and keyword-sentence context, in characters. Default: 200.
    pub context_max_chars: usize,

    /// Length of the last-resort container-text prefix. Default: 150.
    pub fallback_chars: usize,

    /// Fuzzy scores must be strictly greater than this. Default: 0.3.
    pub fuzzy_threshold: f64,

    /// Added per shared domain keyword; uncapped, so scores may exceed 1.0.
    /// Default: 0.2.
    pub keyword_bonus: f64,

    /// Subtitle printed on the title slide. Default: "Document Summary".
    pub title_subtitle: String,

    /// Slide size and placeholder geometry.
    pub template: DeckTemplate,

    /// Progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            audience: Audience::default(),
            tone: Tone::default(),
            instructions: String::new(),
            oracle: None,
            provider: None,
            provider_name: None,
            model: None,
            temperature: 0.3,
            max_tokens: 4096,
            max_retries: 3,
            retry_backoff_ms: 500,
            api_timeout_secs: 90,
            run_timeout_secs: None,
            concurrency: 4,
            context_window: 200.0,
            context_max_chars: 200,
            fallback_chars: 150,
            fuzzy_threshold: 0.3,
            keyword_bonus: 0.2,
            title_subtitle: "Document Summary".to_string(),
            template: DeckTemplate::widescreen(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for DeckConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeckConfig")
            .field("audience", &self.audience)
            .field("tone", &self.tone)
            .field("instructions", &self.instructions)
            .field("oracle", &self.oracle.as_ref().map(|_| "<dyn SlideOracle>"))
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("provider_name", &self.provider_name)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("run_timeout_secs", &self.run_timeout_secs)
            .field("concurrency", &self.concurrency)
            .field("fuzzy_threshold", &self.fuzzy_threshold)
            .field("keyword_bonus", &self.keyword_bonus)
            .finish()
    }
}

impl DeckConfig {
    /// Create a new builder for `DeckConfig`.
    pub fn builder() -> DeckConfigBuilder {
        DeckConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`DeckConfig`].
#[derive(Debug)]
pub struct DeckConfigBuilder {
    config: DeckConfig,
}

impl DeckConfigBuilder {
    pub fn audience(mut self, audience: Audience) -> Self {
        self.config.audience = audience;
        self
    }

    pub fn tone(mut self, tone: Tone) -> Self {
        self.config.tone = tone;
        self
    }

    pub fn instructions(mut self, text: impl Into<String>) -> Self {
        self.config.instructions = text.into();
        self
    }

    pub fn oracle(mut self, oracle: Arc<dyn SlideOracle>) -> Self {
        self.config.oracle = Some(oracle);
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn run_timeout_secs(mut self, secs: u64) -> Self {
        self.config.run_timeout_secs = Some(secs);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn context_window(mut self, units: f64) -> Self {
        self.config.context_window = units;
        self
    }

    pub fn context_max_chars(mut self, n: usize) -> Self {
        self.config.context_max_chars = n;
        self
    }

    pub fn fallback_chars(mut self, n: usize) -> Self {
        self.config.fallback_chars = n;
        self
    }

    pub fn fuzzy_threshold(mut self, t: f64) -> Self {
        self.config.fuzzy_threshold = t;
        self
    }

    pub fn keyword_bonus(mut self, b: f64) -> Self {
        self.config.keyword_bonus = b;
        self
    }

    pub fn title_subtitle(mut self, s: impl Into<String>) -> Self {
        self.config.title_subtitle = s.into();
        self
    }

    pub fn template(mut self, template: DeckTemplate) -> Self {
        self.config.template = template;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<DeckConfig, DeckError> {
        let c = &self.config;
        if c.concurrency == 0 {
            return Err(DeckError::InvalidConfig("Concurrency must be ≥ 1".into()));
        }
        if !c.context_window.is_finite() || c.context_window < 0.0 {
            return Err(DeckError::InvalidConfig(format!(
                "Context window must be a non-negative number, got {}",
                c.context_window
            )));
        }
        if !(0.0..=1.0).contains(&c.fuzzy_threshold) {
            return Err(DeckError::InvalidConfig(format!(
                "Fuzzy threshold must be within 0–1, got {}",
                c.fuzzy_threshold
            )));
        }
        if !c.keyword_bonus.is_finite() || c.keyword_bonus < 0.0 {
            return Err(DeckError::InvalidConfig(format!(
                "Keyword bonus must be non-negative, got {}",
                c.keyword_bonus
            )));
        }
        if c.run_timeout_secs == Some(0) {
            return Err(DeckError::InvalidConfig("Run timeout must be ≥ 1s".into()));
        }
        c.template.validate()?;
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Intended audience for the generated deck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Audience {
    #[default]
    General,
    Executive,
    Technical,
}

impl fmt::Display for Audience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Audience::General => "General",
            Audience::Executive => "Executive",
            Audience::Technical => "Technical",
        })
    }
}

/// Tone of voice for the generated deck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Tone {
    #[default]
    Formal,
    Friendly,
    Concise,
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Tone::Formal => "Formal",
            Tone::Friendly => "Friendly",
            Tone::Concise => "Concise",
        })
    }
}
