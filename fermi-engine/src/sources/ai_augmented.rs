//! AI-augmented estimates
//!
//! Asks a generative model for a structured guess `{value, unit, confidence,
//! rationale}`. Raw model confidence is mapped through a calibration envelope
//! (raw [0.6, 0.9] -> calibrated [0.4, 0.7] by default) before it reaches the
//! candidate. Output that violates the schema is retried at most once, then the
//! source reports a malformed response.

use crate::error::{ModelError, SourceError};
use crate::types::{BenchmarkCandidate, Confidence, SourceKind, TargetProfile};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

/// Generative model returning schema-shaped JSON
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Model identifier used for provenance
    fn name(&self) -> &str;

    /// Generate structured output conforming to `schema`
    async fn generate(&self, prompt: &str, schema: &serde_json::Value) -> Result<serde_json::Value, ModelError>;
}

/// Linear calibration of raw model confidence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceEnvelope {
    pub raw_min: f64,
    pub raw_max: f64,
    pub calibrated_min: f64,
    pub calibrated_max: f64,
}

impl Default for ConfidenceEnvelope {
    fn default() -> Self {
        Self {
            raw_min: 0.6,
            raw_max: 0.9,
            calibrated_min: 0.4,
            calibrated_max: 0.7,
        }
    }
}

impl ConfidenceEnvelope {
    /// Clamp `raw` into the raw envelope and map it onto the calibrated one
    pub fn calibrate(&self, raw: Confidence) -> Confidence {
        let span = self.raw_max - self.raw_min;
        if !raw.is_finite() || span <= 0.0 {
            return self.calibrated_min;
        }
        let t = (raw.clamp(self.raw_min, self.raw_max) - self.raw_min) / span;
        self.calibrated_min + t * (self.calibrated_max - self.calibrated_min)
    }
}

/// Structured guess requested from the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelGuess {
    pub value: f64,
    pub unit: String,
    pub confidence: f64,
    #[serde(default)]
    pub rationale: Option<String>,
}

impl ModelGuess {
    fn validate(&self) -> Result<(), ModelError> {
        if !self.value.is_finite() {
            return Err(ModelError::SchemaViolation("value is not a finite number".to_string()));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(ModelError::SchemaViolation(format!(
                "confidence {} outside [0, 1]",
                self.confidence
            )));
        }
        Ok(())
    }
}

/// JSON schema for `ModelGuess`
pub fn guess_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "value": { "type": "number" },
            "unit": { "type": "string" },
            "confidence": { "type": "number", "minimum": 0, "maximum": 1 },
            "rationale": { "type": "string" }
        },
        "required": ["value", "unit", "confidence"],
        "additionalProperties": false
    })
}

pub fn build_prompt(target: &TargetProfile, quantity: &str) -> String {
    let price = target
        .price
        .map_or_else(|| "unknown".to_string(), |p| p.to_string());
    format!(
        "Estimate the following quantity with a Fermi-style guess.\n\
         Quantity: {}\n\
         Target: {} (product type: {}, consumer type: {}, price: {}, essential: {})\n\
         Answer with a single number, its unit, your confidence in [0, 1], and a one-sentence rationale.",
        quantity, target.name, target.product_type, target.consumer_type, price, target.is_essential
    )
}

#[derive(Clone)]
pub struct AiAugmentedSource {
    model: Arc<dyn GenerativeModel>,
    envelope: ConfidenceEnvelope,
    max_retries: u32,
}

impl AiAugmentedSource {
    pub fn new(model: Arc<dyn GenerativeModel>, envelope: ConfidenceEnvelope) -> Self {
        Self {
            model,
            envelope,
            max_retries: 1,
        }
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub async fn estimate(&self, target: &TargetProfile, quantity: &str) -> Result<Vec<BenchmarkCandidate>, SourceError> {
        let prompt = build_prompt(target, quantity);
        let schema = guess_schema();

        let mut last_violation = String::new();
        for attempt in 0..=self.max_retries {
            let output = match self.model.generate(&prompt, &schema).await {
                Ok(output) => output,
                Err(ModelError::SchemaViolation(msg)) => {
                    warn!(model = self.model.name(), attempt, "Schema violation: {}", msg);
                    last_violation = msg;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let guess = serde_json::from_value::<ModelGuess>(output)
                .map_err(|e| ModelError::SchemaViolation(e.to_string()))
                .and_then(|g| g.validate().map(|_| g));

            match guess {
                Ok(guess) => {
                    let calibrated = self.envelope.calibrate(guess.confidence);
                    debug!(
                        model = self.model.name(),
                        value = guess.value,
                        raw_confidence = guess.confidence,
                        calibrated,
                        "Model guess accepted"
                    );
                    return Ok(vec![self.candidate(target, quantity, guess, calibrated)]);
                }
                Err(e) => {
                    warn!(model = self.model.name(), attempt, "Malformed model output: {}", e);
                    last_violation = e.to_string();
                }
            }
        }

        Err(SourceError::MalformedResponse(last_violation))
    }

    fn candidate(&self, target: &TargetProfile, quantity: &str, guess: ModelGuess, calibrated: Confidence) -> BenchmarkCandidate {
        let mut candidate = BenchmarkCandidate::for_target(
            target,
            format!("model estimate: {}", quantity),
            guess.value,
            format!("model:{}", self.model.name()),
            SourceKind::AiAugmented,
        )
        .with_confidence(calibrated)
        .with_context("unit", guess.unit)
        .with_context("raw_confidence", guess.confidence);
        if let Some(rationale) = guess.rationale {
            candidate = candidate.with_context("rationale", rationale);
        }
        candidate
    }
}

impl std::fmt::Debug for AiAugmentedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiAugmentedSource")
            .field("model", &self.model.name())
            .field("envelope", &self.envelope)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays canned responses in order
    struct ScriptedModel {
        responses: Mutex<Vec<Result<serde_json::Value, ModelError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedModel {
        fn new(mut responses: Vec<Result<serde_json::Value, ModelError>>) -> Self {
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl GenerativeModel for ScriptedModel {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, _prompt: &str, _schema: &serde_json::Value) -> Result<serde_json::Value, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(ModelError::Api("script exhausted".to_string())))
        }
    }

    fn target() -> TargetProfile {
        TargetProfile::new("Meal kit", "physical", "B2C").with_price(30.0)
    }

    #[test]
    fn test_envelope_calibration() {
        let envelope = ConfidenceEnvelope::default();
        assert!((envelope.calibrate(0.6) - 0.4).abs() < 1e-12);
        assert!((envelope.calibrate(0.9) - 0.7).abs() < 1e-12);
        assert!((envelope.calibrate(0.75) - 0.55).abs() < 1e-12);
        assert!((envelope.calibrate(0.99) - 0.7).abs() < 1e-12, "Clamped above");
        assert!((envelope.calibrate(0.1) - 0.4).abs() < 1e-12, "Clamped below");
    }

    #[tokio::test]
    async fn test_valid_guess_becomes_candidate() {
        let model = Arc::new(ScriptedModel::new(vec![Ok(json!({
            "value": 120000.0, "unit": "subscribers", "confidence": 0.9, "rationale": "Comparable to peers"
        }))]));
        let source = AiAugmentedSource::new(model.clone(), ConfidenceEnvelope::default());

        let candidates = source.estimate(&target(), "monthly subscribers").await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].value, 120000.0);
        assert!((candidates[0].confidence - 0.7).abs() < 1e-12);
        assert_eq!(candidates[0].source, "model:scripted");
        assert_eq!(candidates[0].product_type, "physical");
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_schema_violation_retried_once() {
        let model = Arc::new(ScriptedModel::new(vec![
            Err(ModelError::SchemaViolation("missing unit".to_string())),
            Ok(json!({"value": 5.0, "unit": "stores", "confidence": 0.6})),
        ]));
        let source = AiAugmentedSource::new(model.clone(), ConfidenceEnvelope::default());

        let candidates = source.estimate(&target(), "store count").await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(model.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_repeated_malformed_output_gives_up() {
        let model = Arc::new(ScriptedModel::new(vec![
            Ok(json!({"value": "lots"})),
            Ok(json!({"value": 1.0, "unit": "x", "confidence": 7.0})),
            Ok(json!({"value": 1.0, "unit": "x", "confidence": 0.7})),
        ]));
        let source = AiAugmentedSource::new(model.clone(), ConfidenceEnvelope::default());

        let result = source.estimate(&target(), "anything").await;
        assert!(matches!(result, Err(SourceError::MalformedResponse(_))));
        assert_eq!(model.calls.load(Ordering::SeqCst), 2, "At most one retry");
    }

    #[tokio::test]
    async fn test_transport_error_not_retried() {
        let model = Arc::new(ScriptedModel::new(vec![Err(ModelError::Transport("reset".to_string()))]));
        let source = AiAugmentedSource::new(model.clone(), ConfidenceEnvelope::default());

        let result = source.estimate(&target(), "anything").await;
        assert!(matches!(result, Err(SourceError::Network(_))));
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }
}
