//! Generation Orchestrator
//!
//! ```text
//! request ─▶ prompt ─▶ invoke_bounded(timeout, cancel) ─▶ ValidationGate
//!                              ▲                               │
//!                              └──── one retry if transient ◀──┤
//!                                                              ▼
//!                           Success | FallbackRecovered | Blocked(error)
//!                                                              │
//!                             telemetry + alert sample (once) ◀┘
//! ```

use crate::fallback::{
    classify_intent, fallback_chat_text, fallback_draft, fallback_reason, recommendation,
};
use crate::prompts;
use crate::shaping::shape_draft;
use chrono::Utc;
use draftgate_core::{
    invoke_bounded, AdminSettings, CallFailure, ChatReply, ComplianceReport, DraftError,
    FallbackReason, GatewayError, GeneratedDraft, GenerationOutcome, GenerationRequest, ModelCall,
    ModelGateway, PipelineMode, RegeneratedParagraph, RequestContext, SettingsStore,
};
use draftgate_ops::{AlertEvaluator, Bucket, OutcomeSample, TelemetryAggregator};
use draftgate_policy::BiasDetector;
use draftgate_quality::{strip_inline_citations, ValidationGate};
use std::sync::Arc;
use std::time::Instant;

/// Owns the pipelines and the shared state they report into.
#[derive(Clone)]
pub struct GenerationOrchestrator {
    gateway: Arc<dyn ModelGateway>,
    gate: Arc<ValidationGate>,
    settings: Arc<SettingsStore>,
    telemetry: Arc<TelemetryAggregator>,
    alerts: Arc<AlertEvaluator>,
    bias: BiasDetector,
}

impl GenerationOrchestrator {
    pub fn new(gateway: Arc<dyn ModelGateway>, settings: Arc<SettingsStore>) -> Self {
        Self {
            gateway,
            gate: Arc::new(ValidationGate::default()),
            settings,
            telemetry: Arc::new(TelemetryAggregator::new()),
            alerts: Arc::new(AlertEvaluator::default()),
            bias: BiasDetector::new(),
        }
    }

    pub fn with_gate(mut self, gate: ValidationGate) -> Self {
        self.gate = Arc::new(gate);
        self
    }

    pub fn with_telemetry(mut self, telemetry: Arc<TelemetryAggregator>) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn with_alerts(mut self, alerts: Arc<AlertEvaluator>) -> Self {
        self.alerts = alerts;
        self
    }

    pub fn gateway(&self) -> &Arc<dyn ModelGateway> {
        &self.gateway
    }

    pub fn gate(&self) -> &ValidationGate {
        &self.gate
    }

    pub fn settings(&self) -> &Arc<SettingsStore> {
        &self.settings
    }

    pub fn telemetry(&self) -> &Arc<TelemetryAggregator> {
        &self.telemetry
    }

    pub fn alerts(&self) -> &Arc<AlertEvaluator> {
        &self.alerts
    }

    // === Draft / interactive-longform ===

    pub async fn generate(
        &self,
        ctx: &RequestContext,
        request: &GenerationRequest,
    ) -> GenerationOutcome {
        self.generate_with(self.gateway.as_ref(), ctx, request).await
    }

    /// Same as [`generate`](Self::generate) with an explicit gateway.
    pub async fn generate_with(
        &self,
        gateway: &dyn ModelGateway,
        ctx: &RequestContext,
        request: &GenerationRequest,
    ) -> GenerationOutcome {
        let started = Instant::now();
        let mode = request.mode.pipeline();
        let emotion = request.emotion_key();

        if request.keyword.trim().is_empty() {
            let err = DraftError::RequestInvalid {
                detail: "keyword must not be empty".to_string(),
            };
            self.finalize(mode, emotion.as_deref(), Err(&err), false, None);
            return GenerationOutcome::Blocked(err);
        }

        let settings = self.settings.get();
        let call = prompts::draft_call(request, self.gate.citation_pool());

        let first = self.attempt_draft(gateway, &call, request, &settings, ctx).await;
        let (result, retried) = match first {
            Err(err) if err.is_transient() && !ctx.is_cancelled() => {
                tracing::debug!(
                    trace_id = %ctx.trace_id,
                    mode = %mode,
                    reason = err.code(),
                    "retrying transient failure"
                );
                let second = self.attempt_draft(gateway, &call, request, &settings, ctx).await;
                (keep_first_if_cancelled(err, second), true)
            }
            other => (other, false),
        };

        let profile = self.gate.profile(request.mode);
        let outcome = match result {
            Ok(draft) => GenerationOutcome::Success(shape_draft(
                draft,
                request.keyword.trim(),
                profile,
                settings.title_max_length,
            )),
            Err(err) => match fallback_reason(&err)
                .and_then(|reason| fallback_draft(request, self.gate.screener()).map(|d| (reason, d)))
            {
                Some((reason, draft)) => {
                    tracing::warn!(
                        trace_id = %ctx.trace_id,
                        mode = %mode,
                        reason = err.code(),
                        "serving fallback draft"
                    );
                    GenerationOutcome::FallbackRecovered {
                        draft: shape_draft(
                            draft,
                            request.keyword.trim(),
                            profile,
                            settings.title_max_length,
                        ),
                        reason,
                    }
                }
                None => GenerationOutcome::Blocked(err),
            },
        };

        let latency = Some(started.elapsed().as_millis() as u64);
        match &outcome {
            GenerationOutcome::Success(_) => {
                self.finalize(mode, emotion.as_deref(), Ok(Bucket::Success), retried, latency)
            }
            GenerationOutcome::FallbackRecovered { reason, .. } => {
                let ai_error = matches!(reason, FallbackReason::ModelEmpty);
                self.record(mode, emotion.as_deref(), Bucket::FallbackRecoveries, retried);
                if let Some(ms) = latency {
                    self.alerts.record(OutcomeSample::failure(Utc::now(), ms, ai_error));
                }
            }
            GenerationOutcome::Blocked(err) => {
                self.finalize(mode, emotion.as_deref(), Err(err), retried, latency)
            }
        }

        tracing::info!(
            trace_id = %ctx.trace_id,
            mode = %mode,
            gateway = gateway.name(),
            outcome = outcome.label(),
            retried,
            "draft generation finalized"
        );
        outcome
    }

    async fn attempt_draft(
        &self,
        gateway: &dyn ModelGateway,
        call: &ModelCall,
        request: &GenerationRequest,
        settings: &AdminSettings,
        ctx: &RequestContext,
    ) -> Result<GeneratedDraft, DraftError> {
        let raw = self.call_model(gateway, call, settings, ctx).await?;
        self.gate.validate(&raw, request).into_result()
    }

    async fn call_model(
        &self,
        gateway: &dyn ModelGateway,
        call: &ModelCall,
        settings: &AdminSettings,
        ctx: &RequestContext,
    ) -> Result<String, DraftError> {
        invoke_bounded(gateway, call, settings.model_timeout(), &ctx.cancel)
            .await
            .map_err(|failure| match failure {
                CallFailure::Timeout(_) => DraftError::ModelTimeout {
                    timeout_ms: settings.model_timeout_ms,
                },
                CallFailure::Cancelled => DraftError::Cancelled,
                CallFailure::Gateway(GatewayError::KeyMissing) => DraftError::KeyMissing,
                CallFailure::Gateway(e) => DraftError::ModelError {
                    detail: e.to_string(),
                },
            })
    }

    // === Paragraph regeneration ===

    pub async fn regenerate_paragraph(
        &self,
        ctx: &RequestContext,
        request: &GenerationRequest,
        paragraphs: &[String],
        paragraph_index: i64,
    ) -> Result<RegeneratedParagraph, DraftError> {
        self.regenerate_paragraph_with(self.gateway.as_ref(), ctx, request, paragraphs, paragraph_index)
            .await
    }

    pub async fn regenerate_paragraph_with(
        &self,
        gateway: &dyn ModelGateway,
        ctx: &RequestContext,
        request: &GenerationRequest,
        paragraphs: &[String],
        paragraph_index: i64,
    ) -> Result<RegeneratedParagraph, DraftError> {
        let started = Instant::now();
        let mode = PipelineMode::ParagraphRegeneration;
        let emotion = request.emotion_key();

        let index = match usize::try_from(paragraph_index) {
            Ok(i) if i < paragraphs.len() => i,
            _ => {
                let err = DraftError::ParagraphInvalid {
                    index: paragraph_index,
                    len: paragraphs.len(),
                };
                self.finalize(mode, emotion.as_deref(), Err(&err), false, None);
                return Err(err);
            }
        };

        let settings = self.settings.get();
        let call = prompts::paragraph_call(request, paragraphs, index);

        let first = self.attempt_paragraph(gateway, &call, &settings, ctx).await;
        let (result, retried) = match first {
            Err(err) if err.is_transient() && !ctx.is_cancelled() => {
                tracing::debug!(trace_id = %ctx.trace_id, reason = err.code(), "retrying paragraph");
                let second = self.attempt_paragraph(gateway, &call, &settings, ctx).await;
                (keep_first_if_cancelled(err, second), true)
            }
            other => (other, false),
        };

        let latency = Some(started.elapsed().as_millis() as u64);
        match result {
            Ok(paragraph) => {
                self.finalize(mode, emotion.as_deref(), Ok(Bucket::Success), retried, latency);
                Ok(RegeneratedParagraph {
                    paragraph,
                    paragraph_index: index,
                })
            }
            Err(err) => {
                self.finalize(mode, emotion.as_deref(), Err(&err), retried, latency);
                Err(err)
            }
        }
    }

    async fn attempt_paragraph(
        &self,
        gateway: &dyn ModelGateway,
        call: &ModelCall,
        settings: &AdminSettings,
        ctx: &RequestContext,
    ) -> Result<String, DraftError> {
        let raw = self.call_model(gateway, call, settings, ctx).await?;
        self.gate.validate_paragraph(&raw)
    }

    // === Chat ===

    /// Conversational assist. Model failures fall back to canned advice;
    /// bias advisories never block.
    pub async fn chat(&self, ctx: &RequestContext, message: &str) -> Result<ChatReply, DraftError> {
        self.chat_with(self.gateway.as_ref(), ctx, message).await
    }

    pub async fn chat_with(
        &self,
        gateway: &dyn ModelGateway,
        ctx: &RequestContext,
        message: &str,
    ) -> Result<ChatReply, DraftError> {
        let started = Instant::now();
        let mode = PipelineMode::Chat;

        if message.trim().is_empty() {
            let err = DraftError::RequestInvalid {
                detail: "message must not be empty".to_string(),
            };
            self.finalize(mode, None, Err(&err), false, None);
            return Err(err);
        }

        let intent = classify_intent(message);
        let advice = self.bias.detect(message);
        let settings = self.settings.get();
        let call = prompts::chat_call(message);

        // `failure` carries the ai_error flag of a fallback reply
        let (text, failure) = match self.call_model(gateway, &call, &settings, ctx).await {
            Err(DraftError::Cancelled) => return Err(DraftError::Cancelled),
            Ok(raw) if !raw.trim().is_empty() => (strip_inline_citations(&raw), None),
            Ok(_) => (fallback_chat_text(intent).to_string(), Some(true)),
            Err(err) => {
                tracing::warn!(trace_id = %ctx.trace_id, reason = err.code(), "chat model failed");
                (fallback_chat_text(intent).to_string(), Some(is_ai_error(&err)))
            }
        };

        let latency = started.elapsed().as_millis() as u64;
        match failure {
            None => {
                self.record(mode, None, Bucket::Success, false);
                self.alerts.record(OutcomeSample::success(Utc::now(), latency));
            }
            Some(ai_error) => {
                self.record(mode, None, Bucket::FallbackRecoveries, false);
                self.alerts
                    .record(OutcomeSample::failure(Utc::now(), latency, ai_error));
            }
        }

        Ok(ChatReply {
            text,
            intent,
            recommendation: recommendation(intent).to_string(),
            bias_warning: advice.as_ref().map(|a| a.warning.clone()),
            neutral_prompt: advice.map(|a| a.neutral_prompt),
        })
    }

    // === Compliance check / interactive spec ===

    pub fn compliance_check(&self, content: &str) -> ComplianceReport {
        let report = self.gate.screener().screen(content);
        self.record(PipelineMode::ComplianceCheck, None, Bucket::Success, false);
        tracing::debug!(risk = %report.risk_level, flags = report.flags.len(), "compliance check");
        report
    }

    /// Interactive stories are produced from a structured spec elsewhere;
    /// raw generation here is always refused.
    pub fn generate_interactive_spec(&self, payload: &serde_json::Value) -> DraftError {
        let err = DraftError::InteractiveSpecOnly;
        tracing::debug!(
            has_markup = payload.to_string().contains('<'),
            "interactive article request refused"
        );
        self.finalize(PipelineMode::InteractiveSpec, None, Err(&err), false, None);
        err
    }

    // === Telemetry ===

    fn record(&self, mode: PipelineMode, emotion: Option<&str>, bucket: Bucket, retried: bool) {
        self.telemetry.record_outcome(mode, emotion, bucket, retried);
    }

    /// Record a finalized outcome exactly once. Cancelled requests are not
    /// recorded. A latency sample is kept only for outcomes that reached the
    /// model path.
    fn finalize(
        &self,
        mode: PipelineMode,
        emotion: Option<&str>,
        outcome: Result<Bucket, &DraftError>,
        retried: bool,
        latency_ms: Option<u64>,
    ) {
        let (bucket, sample) = match outcome {
            Ok(bucket) => (bucket, latency_ms.map(|ms| OutcomeSample::success(Utc::now(), ms))),
            Err(err) => {
                let Some(bucket) = Bucket::for_error(err) else {
                    tracing::debug!(mode = %mode, "cancelled request not recorded");
                    return;
                };
                if !err.is_input_error() {
                    tracing::warn!(mode = %mode, code = err.code(), "request blocked");
                }
                let ai_error = is_ai_error(err);
                let sample = latency_ms
                    .filter(|_| !err.is_input_error())
                    .map(|ms| OutcomeSample::failure(Utc::now(), ms, ai_error));
                (bucket, sample)
            }
        };

        self.record(mode, emotion, bucket, retried);
        if let Some(sample) = sample {
            self.alerts.record(sample);
        }
    }
}

/// Empty output, timeouts and transport/upstream failures. Missing
/// credentials are a configuration problem, not a model error.
fn is_ai_error(err: &DraftError) -> bool {
    matches!(
        err,
        DraftError::ModelEmpty | DraftError::ModelTimeout { .. } | DraftError::ModelError { .. }
    )
}

/// A retry interrupted by cancellation settles on the first attempt's error.
fn keep_first_if_cancelled<T>(
    first: DraftError,
    second: Result<T, DraftError>,
) -> Result<T, DraftError> {
    match second {
        Err(DraftError::Cancelled) => Err(first),
        other => other,
    }
}
