//! Parallel evidence collection
//!
//! Queries every registered source concurrently (bounded by
//! `max_concurrency`) with a per-source timeout. A failing, slow or cancelled
//! source contributes no candidates and never blocks the others; its outcome is
//! recorded in a `SourceReport`.
//!
//! Candidates are returned in source registration order regardless of
//! completion order, so downstream scoring is deterministic.

use crate::error::SourceError;
use crate::sources::EvidenceSource;
use crate::types::{BenchmarkCandidate, SourceKind, TargetProfile};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Concurrency and timeout settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectorSettings {
    pub max_concurrency: usize,
    /// Timeout for sources that leave the process
    pub network_timeout: Duration,
    /// Timeout for in-memory sources
    pub in_memory_timeout: Duration,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            network_timeout: Duration::from_millis(3000),
            in_memory_timeout: Duration::from_millis(50),
        }
    }
}

/// Outcome of querying one source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceStatus {
    Completed { candidates: usize },
    Empty,
    TimedOut,
    Failed { reason: String },
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceReport {
    pub source: String,
    pub kind: SourceKind,
    #[serde(flatten)]
    pub status: SourceStatus,
    pub elapsed_ms: u64,
}

impl SourceReport {
    /// Timed out or failed (cancellation is not a failure)
    pub fn is_failure(&self) -> bool {
        matches!(self.status, SourceStatus::TimedOut | SourceStatus::Failed { .. })
    }
}

/// Candidates from all sources plus one report per source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectedEvidence {
    pub candidates: Vec<BenchmarkCandidate>,
    pub reports: Vec<SourceReport>,
}

impl CollectedEvidence {
    pub fn any_failure(&self) -> bool {
        self.reports.iter().any(SourceReport::is_failure)
    }

    pub fn failed_sources(&self) -> usize {
        self.reports.iter().filter(|r| r.is_failure()).count()
    }
}

pub struct EvidenceCollector {
    sources: Vec<Arc<EvidenceSource>>,
    settings: CollectorSettings,
}

impl EvidenceCollector {
    pub fn new(sources: Vec<EvidenceSource>, settings: CollectorSettings) -> Self {
        Self {
            sources: sources.into_iter().map(Arc::new).collect(),
            settings,
        }
    }

    pub fn count(&self) -> usize {
        self.sources.len()
    }

    pub fn settings(&self) -> &CollectorSettings {
        &self.settings
    }

    /// Timeout applied to `source`
    pub fn timeout_for(&self, source: &EvidenceSource) -> Duration {
        if source.kind().is_remote() {
            self.settings.network_timeout
        } else {
            self.settings.in_memory_timeout
        }
    }

    /// Query all sources and gather their candidates.
    ///
    /// Cancellation stops pending sources; candidates already produced are kept.
    pub async fn collect(
        &self,
        target: &TargetProfile,
        quantity: &str,
        cancel: &CancellationToken,
    ) -> CollectedEvidence {
        let outcomes: Vec<(Vec<BenchmarkCandidate>, SourceReport)> = stream::iter(self.sources.iter())
            .map(|source| {
                let timeout = self.timeout_for(source);
                async move { run_source(source, target, quantity, timeout, cancel).await }
            })
            .buffered(self.settings.max_concurrency.max(1))
            .collect()
            .await;

        let mut evidence = CollectedEvidence::default();
        for (candidates, report) in outcomes {
            evidence.candidates.extend(candidates);
            evidence.reports.push(report);
        }

        info!(
            sources = self.sources.len(),
            candidates = evidence.candidates.len(),
            failed = evidence.failed_sources(),
            "Evidence collection complete"
        );

        evidence
    }
}

async fn run_source(
    source: &EvidenceSource,
    target: &TargetProfile,
    quantity: &str,
    timeout: Duration,
    cancel: &CancellationToken,
) -> (Vec<BenchmarkCandidate>, SourceReport) {
    let name = source.name();
    let kind = source.kind();
    let started = Instant::now();

    let outcome = if cancel.is_cancelled() {
        Err(SourceError::Cancelled)
    } else {
        tokio::select! {
            _ = cancel.cancelled() => Err(SourceError::Cancelled),
            result = tokio::time::timeout(timeout, source.try_produce(target, quantity)) => {
                result.unwrap_or(Err(SourceError::Timeout(timeout)))
            }
        }
    };

    let elapsed_ms = started.elapsed().as_millis() as u64;
    let (candidates, status) = match outcome {
        Ok(candidates) => {
            let total = candidates.len();
            let candidates: Vec<_> = candidates
                .into_iter()
                .filter(|c| c.value.is_finite())
                .map(|c| BenchmarkCandidate { source_kind: kind, ..c })
                .collect();
            if candidates.len() < total {
                warn!(source = %name, dropped = total - candidates.len(), "Dropped non-finite candidate values");
            }

            if candidates.is_empty() {
                debug!(source = %name, elapsed_ms, "Source produced no candidates");
                (candidates, SourceStatus::Empty)
            } else {
                debug!(source = %name, count = candidates.len(), elapsed_ms, "Source completed");
                let count = candidates.len();
                (candidates, SourceStatus::Completed { candidates: count })
            }
        }
        Err(SourceError::Timeout(limit)) => {
            warn!(source = %name, timeout_ms = limit.as_millis() as u64, "Source timed out (isolated)");
            (Vec::new(), SourceStatus::TimedOut)
        }
        Err(SourceError::Cancelled) => {
            warn!(source = %name, "Source cancelled");
            (Vec::new(), SourceStatus::Cancelled)
        }
        Err(e) => {
            warn!(source = %name, error = %e, "Source failed (isolated)");
            (Vec::new(), SourceStatus::Failed { reason: e.to_string() })
        }
    };

    let report = SourceReport {
        source: name,
        kind,
        status,
        elapsed_ms,
    };
    (candidates, report)
}
