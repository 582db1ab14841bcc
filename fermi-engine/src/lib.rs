//! fermi-engine: comparability-scored Fermi estimation
//!
//! Gathers evidence for a quantity from several independent sources, keeps
//! only evidence that is genuinely comparable to the target, aggregates it into
//! a value with a confidence label and error range, and records every decision
//! in an audit document.
//!
//! ```rust,ignore
//! use fermi_engine::{EngineConfig, EstimationRequest, Estimator, TargetProfile};
//!
//! let estimator = Estimator::from_config(&EngineConfig::default())?;
//! let target = TargetProfile::new("Cafe staffing", "service", "B2C");
//! let document = estimator
//!     .estimate(&EstimationRequest::new("minimum hourly wage", target))
//!     .await?;
//! println!("{}", document.to_json()?);
//! ```

pub mod aggregator;
pub mod collector;
pub mod comparability;
pub mod config;
pub mod document;
pub mod error;
pub mod estimator;
pub mod sources;
pub mod types;

pub use crate::aggregator::{Aggregate, AggregationPolicy, Aggregator, CentralTendency, ErrorRange};
pub use crate::collector::{CollectedEvidence, CollectorSettings, EvidenceCollector, SourceReport, SourceStatus};
pub use crate::comparability::{ComparabilityEngine, ComparabilityPolicy, ComparabilityResult, FilteredCandidates};
pub use crate::config::EngineConfig;
pub use crate::document::{generate_estimation_doc, DocumentBuilder, EstimationDocument};
pub use crate::error::{EstimationError, EstimationResult, ModelError, SourceError};
pub use crate::estimator::{EstimationEvent, EstimationRequest, Estimator};
pub use crate::sources::EvidenceSource;
pub use crate::types::{
    BenchmarkCandidate, CandidateRole, ConfidenceLevel, Decision, SourceKind, TargetProfile,
};
