//! Request orchestration
//!
//! Drives one analysis from client input to validated result:
//!
//! ```text
//! Received -> Sanitized -> CacheCheck -> CacheHit -> Respond
//!                                     -> CacheMiss -> Prompting -> Calling -> Parsing -> Validating
//!                                                     Valid   -> Cache + Respond
//!                                                     Invalid -> RePrompting -> Validating2
//!                                                                Valid   -> Cache + Respond
//!                                                                Invalid -> Fail
//! ```
//!
//! Only validated results reach the cache. Transport failures are retried
//! inside the upstream client; unusable model output gets exactly one
//! corrective re-prompt here.

use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;

use crate::analysis::sanitize::{clean, truncate};
use crate::analysis::{AnalysisResult, OutputError, build_prompt, build_reprompt, parse, validate};
use crate::cache::{CacheKey, ResponseCache};
use crate::config::LimitsConfig;
use crate::error::{AppError, AppResult};
use crate::metrics::{CacheLookup, Metrics, RequestOutcome};
use crate::middleware::RequestId;
use crate::upstream::{GenerateRequest, GenerationSettings, ModelReply, Upstream};

/// Upstream calls made when the first answer is unusable
const ATTEMPTS_WITH_REPROMPT: usize = 2;

/// Body of `POST /analyze`
///
/// Both fields are optional at the wire level so that a missing `text`
/// produces a validation error rather than a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisRequest {
    #[serde(default)]
    pub text: Option<String>,
    /// Page count declared by the client (e.g. of the source PDF)
    #[serde(default)]
    pub pages: Option<i64>,
}

impl AnalysisRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            pages: None,
        }
    }
}

/// A successful analysis
#[derive(Debug, Clone)]
pub struct Outcome {
    pub result: Arc<AnalysisResult>,
    /// Whether the result was served from the cache
    pub cached: bool,
}

/// Resume analysis orchestrator
///
/// Holds everything a request needs; cheap to share behind an `Arc`.
pub struct Analyzer {
    upstream: Arc<dyn Upstream>,
    cache: Arc<ResponseCache>,
    settings: GenerationSettings,
    limits: LimitsConfig,
    metrics: Metrics,
}

impl Analyzer {
    pub fn new(
        upstream: Arc<dyn Upstream>,
        cache: Arc<ResponseCache>,
        settings: GenerationSettings,
        limits: LimitsConfig,
        metrics: Metrics,
    ) -> Self {
        Self {
            upstream,
            cache,
            settings,
            limits,
            metrics,
        }
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    pub fn limits(&self) -> &LimitsConfig {
        &self.limits
    }

    /// Run one analysis, recording request metrics
    pub async fn analyze(
        &self,
        request: AnalysisRequest,
        request_id: RequestId,
    ) -> AppResult<Outcome> {
        let start = Instant::now();
        let result = self.run(request, request_id).await;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        match &result {
            Ok(outcome) => {
                self.metrics.record_request(RequestOutcome::Success);
                tracing::info!(
                    request_id = %request_id,
                    cached = outcome.cached,
                    total_score = outcome.result.total(),
                    comments = outcome.result.comments().len(),
                    elapsed_ms = elapsed_ms,
                    "Analysis completed"
                );
            }
            Err(e) => {
                self.metrics.record_request(RequestOutcome::from_error(e));
                tracing::warn!(
                    request_id = %request_id,
                    error = %e,
                    status = e.status().as_u16(),
                    elapsed_ms = elapsed_ms,
                    "Analysis failed"
                );
            }
        }
        self.metrics.record_analysis_duration(elapsed_ms);

        result
    }

    async fn run(&self, request: AnalysisRequest, request_id: RequestId) -> AppResult<Outcome> {
        let text = self.prepare(&request)?;
        let key = CacheKey::for_text(&text);

        if let Some(result) = self.cache.get(&key) {
            self.metrics.record_cache_lookup(CacheLookup::Hit);
            tracing::debug!(
                request_id = %request_id,
                cache_key = %key.short(),
                "Cache hit"
            );
            return Ok(Outcome {
                result,
                cached: true,
            });
        }
        self.metrics.record_cache_lookup(CacheLookup::Miss);
        tracing::debug!(
            request_id = %request_id,
            cache_key = %key.short(),
            text_length = text.chars().count(),
            "Cache miss, querying model"
        );

        let reply = self.call(build_prompt(&text)).await?;
        let result = match interpret(reply) {
            Ok(result) => result,
            Err(problem) => {
                tracing::warn!(
                    request_id = %request_id,
                    error = %problem,
                    "Model output unusable, re-prompting once"
                );
                self.metrics.record_reprompt();

                let reply = self
                    .call(build_reprompt(&text, &problem_summary(&problem)))
                    .await?;
                interpret(reply).map_err(|source| AppError::ModelOutput {
                    attempts: ATTEMPTS_WITH_REPROMPT,
                    source,
                })?
            }
        };

        let result = Arc::new(result);
        self.cache.put(key, Arc::clone(&result));
        Ok(Outcome {
            result,
            cached: false,
        })
    }

    /// Validate client input and produce the sanitized text
    ///
    /// Oversized input is rejected on its cleaned length; anything within
    /// the hard limit is truncated to the prompt budget.
    pub fn prepare(&self, request: &AnalysisRequest) -> AppResult<String> {
        let raw = request
            .text
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AppError::Validation("missing or empty 'text' field".to_string()))?;

        if let Some(pages) = request.pages {
            if pages < 0 {
                return Err(AppError::Validation(format!(
                    "'pages' must not be negative, got {pages}"
                )));
            }
            if pages > i64::from(self.limits.max_pages) {
                return Err(AppError::PayloadTooLarge(format!(
                    "resume has {pages} pages, the limit is {}",
                    self.limits.max_pages
                )));
            }
        }

        let cleaned = clean(raw);
        let length = cleaned.chars().count();
        if length > self.limits.max_request_chars {
            return Err(AppError::PayloadTooLarge(format!(
                "text is {length} characters after cleaning, the limit is {}",
                self.limits.max_request_chars
            )));
        }
        if cleaned.is_empty() {
            return Err(AppError::Validation(
                "'text' contains no readable content".to_string(),
            ));
        }

        if length > self.limits.max_input_chars {
            tracing::debug!(
                original_length = length,
                max_input_chars = self.limits.max_input_chars,
                "Truncating resume text"
            );
        }
        Ok(truncate(&cleaned, self.limits.max_input_chars))
    }

    async fn call(&self, prompt: String) -> AppResult<ModelReply> {
        let request = GenerateRequest::new(&self.settings, prompt);
        Ok(self.upstream.generate(&request).await?)
    }
}

fn interpret(reply: ModelReply) -> Result<AnalysisResult, OutputError> {
    let value = parse(reply)?;
    Ok(validate(&value)?)
}

/// The innermost message, which is what the model needs to hear
fn problem_summary(problem: &OutputError) -> String {
    match problem {
        OutputError::Parse(e) => e.to_string(),
        OutputError::Schema(e) => e.to_string(),
    }
}
