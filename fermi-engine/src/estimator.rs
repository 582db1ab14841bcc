//! Estimation pipeline
//!
//! **Flow:** validate target → collect evidence (parallel) → classify →
//! aggregate → assemble document.
//!
//! A malformed target is the only error surfaced to the caller. Every other
//! failure degrades the result (fewer candidates, lower confidence) and is
//! recorded in the document.

use crate::aggregator::Aggregator;
use crate::collector::{CollectorSettings, EvidenceCollector};
use crate::comparability::ComparabilityEngine;
use crate::config::EngineConfig;
use crate::document::{DocumentBuilder, EstimationDocument};
use crate::error::EstimationResult;
use crate::sources::{build_sources, EvidenceSource};
use crate::types::{ConfidenceLevel, TargetProfile};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

/// One estimation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimationRequest {
    /// Document id; generated when absent
    #[serde(default)]
    pub id: Option<String>,
    /// Free-text description of the quantity to estimate
    pub description: String,
    pub target: TargetProfile,
    #[serde(default)]
    pub logic_steps: Vec<String>,
}

impl EstimationRequest {
    pub fn new(description: impl Into<String>, target: TargetProfile) -> Self {
        Self {
            id: None,
            description: description.into(),
            target,
            logic_steps: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_logic_steps(mut self, steps: Vec<String>) -> Self {
        self.logic_steps = steps;
        self
    }
}

/// Pipeline progress events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EstimationEvent {
    Started {
        id: String,
        sources: usize,
    },
    EvidenceCollected {
        id: String,
        candidates: usize,
        failed_sources: usize,
    },
    Classified {
        id: String,
        adopted: usize,
        referenced: usize,
        rejected: usize,
    },
    Aggregated {
        id: String,
        value: Option<f64>,
        confidence: ConfidenceLevel,
        converged: bool,
    },
    DocumentReady {
        id: String,
    },
}

pub struct Estimator {
    collector: EvidenceCollector,
    engine: ComparabilityEngine,
    aggregator: Aggregator,
    builder: DocumentBuilder,
    event_tx: Option<mpsc::Sender<EstimationEvent>>,
}

impl Estimator {
    pub fn new(
        collector: EvidenceCollector,
        engine: ComparabilityEngine,
        aggregator: Aggregator,
        builder: DocumentBuilder,
    ) -> Self {
        Self {
            collector,
            engine,
            aggregator,
            builder,
            event_tx: None,
        }
    }

    /// Estimator over explicit sources with default policies
    pub fn with_sources(sources: Vec<EvidenceSource>, settings: CollectorSettings) -> Self {
        Self::new(
            EvidenceCollector::new(sources, settings),
            ComparabilityEngine::default(),
            Aggregator::default(),
            DocumentBuilder::default(),
        )
    }

    /// Build sources and policies from configuration
    pub fn from_config(config: &EngineConfig) -> EstimationResult<Self> {
        let sources = build_sources(&config.sources)?;
        info!(sources = sources.len(), "Estimator configured");

        let engine = ComparabilityEngine::new(config.comparability.clone());
        Ok(Self::new(
            EvidenceCollector::new(sources, config.collector_settings()),
            engine.clone(),
            Aggregator::new(config.aggregation.clone()),
            DocumentBuilder::new(engine, config.engine.rejected_sample_size),
        ))
    }

    /// Attach a progress channel
    pub fn with_events(mut self, event_tx: mpsc::Sender<EstimationEvent>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    pub fn source_count(&self) -> usize {
        self.collector.count()
    }

    pub async fn estimate(&self, request: &EstimationRequest) -> EstimationResult<EstimationDocument> {
        self.estimate_with_cancel(request, &CancellationToken::new()).await
    }

    /// Run the full pipeline. Cancelling `cancel` stops pending sources; the
    /// document is still produced from whatever evidence arrived.
    pub async fn estimate_with_cancel(
        &self,
        request: &EstimationRequest,
        cancel: &CancellationToken,
    ) -> EstimationResult<EstimationDocument> {
        request.target.validate()?;
        let target = request.target.normalized();

        let id = request
            .id
            .clone()
            .unwrap_or_else(|| format!("EST_{}", Uuid::new_v4().simple()));
        info!(id = %id, description = %request.description, "Estimation started");

        self.emit_event(EstimationEvent::Started {
            id: id.clone(),
            sources: self.collector.count(),
        })
        .await;

        // Phase 1: evidence
        let evidence = self
            .collector
            .collect(&target, &request.description, cancel)
            .await;
        self.emit_event(EstimationEvent::EvidenceCollected {
            id: id.clone(),
            candidates: evidence.candidates.len(),
            failed_sources: evidence.failed_sources(),
        })
        .await;

        // Phase 2: comparability
        let filtered = self.engine.filter_candidates(&target, &evidence.candidates);
        let counts = filtered.counts();
        self.emit_event(EstimationEvent::Classified {
            id: id.clone(),
            adopted: counts.adopted,
            referenced: counts.referenced,
            rejected: counts.rejected,
        })
        .await;

        // Phase 3: aggregation
        let aggregate = self.aggregator.aggregate(&filtered, evidence.any_failure());
        self.emit_event(EstimationEvent::Aggregated {
            id: id.clone(),
            value: aggregate.value,
            confidence: aggregate.confidence,
            converged: aggregate.convergence.converged,
        })
        .await;

        // Phase 4: document
        let document = self.builder.from_aggregate(
            &id,
            &request.description,
            &target,
            &request.logic_steps,
            &filtered,
            &aggregate,
            evidence.reports,
        );

        info!(
            id = %id,
            value = ?document.value(),
            confidence = %document.confidence(),
            adopted = counts.adopted,
            referenced = counts.referenced,
            rejected = counts.rejected,
            "Estimation complete"
        );
        self.emit_event(EstimationEvent::DocumentReady { id }).await;

        Ok(document)
    }

    /// Emit event if channel configured
    async fn emit_event(&self, event: EstimationEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event).await;
        }
    }
}
