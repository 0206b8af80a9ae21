//! Recognition engine adapter: primary call, one fallback, never a panic.
//!
//! The decision tree is deliberately flat and tagged so it can be tested
//! without a network:
//!
//! ```text
//! Start ──▶ primary capability? ──no──▶ Fallback
//!              │yes
//!              ▼
//!        PrimaryCall (retry w/ backoff, per-call timeout)
//!              │ok                │err
//!              ▼                  ▼
//!        Succeeded(pages)      Fallback: multimodal chat transcription
//!                                 │ok            │err
//!                                 ▼              ▼
//!                          Succeeded(pages)   Failed(error)
//! ```
//!
//! A terminal `Failed` becomes a `success: false` result upstream — never a
//! thrown error, so one bad document cannot interrupt a batch of uploads.
//!
//! ## Retry strategy
//!
//! Engine APIs fail transiently under load. Each call gets
//! `max_retries` retries with exponential backoff
//! (`retry_backoff_ms * 2^attempt`) and a per-call timeout; the
//! primary → fallback transition still happens at most once.

use crate::config::ExtractionConfig;
use crate::engine::{
    ChatMessage, CompletionOptions, DocumentSource, EngineClient, EngineError, ImageData, Page,
};
use crate::prompts::TRANSCRIPTION_PROMPT;
use std::future::Future;
use std::sync::Arc;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// Which recognition path an attempt used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    Primary,
    Fallback,
}

/// Result of one recognition call.
#[derive(Debug, Clone)]
pub enum AttemptOutcome {
    Succeeded(Vec<Page>),
    Failed(String),
}

/// One recognition call: which path, and how it ended.
#[derive(Debug, Clone)]
pub struct Attempt {
    pub engine: EngineKind,
    pub outcome: AttemptOutcome,
    /// Model reported by the engine for this call, when known.
    pub model: Option<String>,
}

/// Everything the adapter needs to try both paths.
pub struct RecognitionSources {
    /// The document as the primary endpoint wants it (data URL).
    pub primary: DocumentSource,
    /// Image attachment for the fallback chat call. For image inputs this is
    /// the input itself; for PDFs, the pre-rasterized page.
    pub fallback_image: Option<ImageData>,
}

/// Full recognition record: at most two attempts, last one terminal.
#[derive(Debug, Clone)]
pub struct Recognition {
    pub attempts: Vec<Attempt>,
}

impl Recognition {
    /// The last attempt, which decides the overall outcome.
    pub fn terminal(&self) -> Option<&Attempt> {
        self.attempts.last()
    }

    /// Concatenated page text in ascending index order, blank-line separated.
    pub fn text(&self) -> String {
        match self.terminal().map(|a| &a.outcome) {
            Some(AttemptOutcome::Succeeded(pages)) => join_pages(pages),
            _ => String::new(),
        }
    }
}

/// Sort pages by index and join their non-empty markdown with blank lines.
pub fn join_pages(pages: &[Page]) -> String {
    let mut ordered: Vec<&Page> = pages.iter().collect();
    ordered.sort_by_key(|p| p.index);
    ordered
        .iter()
        .map(|p| p.markdown.as_str())
        .filter(|t| !t.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Run the recognition state machine.
pub async fn recognize(
    engine: &Arc<dyn EngineClient>,
    sources: &RecognitionSources,
    config: &ExtractionConfig,
) -> Recognition {
    let mut attempts = Vec::with_capacity(2);

    if engine.supports_document_ocr() {
        let outcome = call_with_retry(config, || {
            engine.process_document(&sources.primary, &config.ocr_model)
        })
        .await;

        match outcome {
            Ok(response) => {
                debug!(pages = response.pages.len(), "primary recognition succeeded");
                attempts.push(Attempt {
                    engine: EngineKind::Primary,
                    outcome: AttemptOutcome::Succeeded(response.pages),
                    model: response.model,
                });
                return Recognition { attempts };
            }
            Err(e) => {
                warn!(error = %e, "primary recognition failed; falling back");
                attempts.push(Attempt {
                    engine: EngineKind::Primary,
                    outcome: AttemptOutcome::Failed(e.to_string()),
                    model: None,
                });
            }
        }
    } else {
        debug!("primary recognition capability unavailable; using fallback");
    }

    attempts.push(fallback_attempt(engine, sources, config).await);
    Recognition { attempts }
}

/// Fallback path: one multimodal chat call that transcribes the image.
async fn fallback_attempt(
    engine: &Arc<dyn EngineClient>,
    sources: &RecognitionSources,
    config: &ExtractionConfig,
) -> Attempt {
    let Some(image) = sources.fallback_image.clone() else {
        return Attempt {
            engine: EngineKind::Fallback,
            outcome: AttemptOutcome::Failed(
                "no image available for fallback recognition".to_string(),
            ),
            model: None,
        };
    };

    let messages = [ChatMessage::user_with_image(TRANSCRIPTION_PROMPT, image)];
    let options = CompletionOptions {
        model: config.chat_model.clone(),
        temperature: config.temperature,
        top_p: Some(config.top_p),
        max_tokens: 4096,
        json_object: false,
    };

    let outcome = call_with_retry(config, || engine.chat(&messages, &options)).await;

    match outcome {
        Ok(response) => Attempt {
            engine: EngineKind::Fallback,
            outcome: AttemptOutcome::Succeeded(vec![Page {
                index: 0,
                markdown: response.content,
            }]),
            model: response.model,
        },
        Err(e) => Attempt {
            engine: EngineKind::Fallback,
            outcome: AttemptOutcome::Failed(e.to_string()),
            model: None,
        },
    }
}

/// Run an engine call under the configured timeout, retrying with
/// exponential backoff on any error.
pub async fn call_with_retry<T, F, Fut>(
    config: &ExtractionConfig,
    mut call: F,
) -> Result<T, EngineError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, EngineError>>,
{
    let per_call = Duration::from_secs(config.api_timeout_secs);
    let mut last_err = EngineError::EmptyResponse;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = config.retry_backoff_ms * 2u64.pow(attempt - 1);
            warn!(attempt, max = config.max_retries, backoff_ms = backoff, "retrying engine call");
            sleep(Duration::from_millis(backoff)).await;
        }

        match timeout(per_call, call()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => {
                warn!(attempt, error = %e, "engine call failed");
                last_err = e;
            }
            Err(_) => {
                warn!(attempt, secs = config.api_timeout_secs, "engine call timed out");
                last_err = EngineError::Timeout {
                    secs: config.api_timeout_secs,
                };
            }
        }
    }

    Err(last_err)
}
