//! Configuration for a document-extraction invocation.
//!
//! All behaviour is controlled through [`ExtractionConfig`], built via its
//! [`ExtractionConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share configs across invocations and to see, in one place,
//! everything that can change between two runs.
//!
//! The engine client handle lives here as well: a single read-only
//! `Arc<dyn EngineClient>` created once at process start. Injecting it
//! through the config (instead of a module-level global) keeps the pipeline
//! unit-testable with a mock engine.

use crate::engine::EngineClient;
use crate::error::ExtractError;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for receipt/invoice extraction.
///
/// Built via [`ExtractionConfig::builder()`] or
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use receipt2data::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .chat_model("mistral-small-latest")
///     .max_retries(1)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Model for the dedicated document-recognition endpoint.
    pub ocr_model: String,

    /// Model for completion calls (fallback transcription and structuring).
    pub chat_model: String,

    /// Sampling temperature for the structuring call. Default: 0.2.
    ///
    /// Low enough to stay faithful to the recognized text, high enough to
    /// cope with unusual layouts. Clamped to 0–2.
    pub temperature: f32,

    /// Nucleus sampling for the structuring call. Default: 0.9.
    pub top_p: f32,

    /// Retries per engine call after the first attempt. Default: 2.
    ///
    /// Applies within each attempt (primary or fallback); it never adds a
    /// second primary → fallback transition.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubling each retry. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-engine-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// DPI passed to the PDF raster utility. Range 72–400. Default: 200.
    pub raster_dpi: u32,

    /// Explicit path to the `pdftoppm` binary. Default: found via `PATH`.
    pub pdftoppm_path: Option<PathBuf>,

    /// Pre-constructed engine client. When `None`, the entry points fall
    /// back to [`crate::engine::MistralEngine::from_env`]; if that also
    /// yields nothing, results degrade to `success: false`.
    pub engine: Option<Arc<dyn EngineClient>>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            ocr_model: "mistral-ocr-2505".to_string(),
            chat_model: "mistral-small-latest".to_string(),
            temperature: 0.2,
            top_p: 0.9,
            max_retries: 2,
            retry_backoff_ms: 500,
            api_timeout_secs: 60,
            raster_dpi: 200,
            pdftoppm_path: None,
            engine: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("ocr_model", &self.ocr_model)
            .field("chat_model", &self.chat_model)
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("raster_dpi", &self.raster_dpi)
            .field("pdftoppm_path", &self.pdftoppm_path)
            .field("engine", &self.engine.as_ref().map(|e| e.name().to_string()))
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn ocr_model(mut self, model: impl Into<String>) -> Self {
        self.config.ocr_model = model.into();
        self
    }

    pub fn chat_model(mut self, model: impl Into<String>) -> Self {
        self.config.chat_model = model.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn top_p(mut self, p: f32) -> Self {
        self.config.top_p = p.clamp(0.0, 1.0);
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

    pub fn raster_dpi(mut self, dpi: u32) -> Self {
        self.config.raster_dpi = dpi.clamp(72, 400);
        self
    }

    pub fn pdftoppm_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdftoppm_path = Some(path.into());
        self
    }

    pub fn engine(mut self, engine: Arc<dyn EngineClient>) -> Self {
        self.config.engine = Some(engine);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ExtractError> {
        let c = &self.config;
        if c.ocr_model.is_empty() || c.chat_model.is_empty() {
            return Err(ExtractError::InvalidConfig(
                "model names must not be empty".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(ExtractError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}
