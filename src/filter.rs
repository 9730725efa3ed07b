//! Candidate filter pipeline
//!
//! Predicates run in a fixed order and stop at the first rejection:
//!
//! 1. [`FilterStage::Blocklist`]: either side of the transfer is blocked
//! 2. [`FilterStage::RouterParticipation`]: neither side is a known router
//! 3. [`FilterStage::ValueWindow`]: `asset_value` outside the inclusive window
//!
//! Each stage can be switched off. Filtering never mutates a candidate and
//! the output keeps the input order.
//!
//! # Examples
//!
//! ```rust
//! use bigdecimal::BigDecimal;
//! use txfinder::filter::{CandidateFilterPipeline, ValueWindow};
//!
//! let window = ValueWindow::percent(BigDecimal::from(52_800), "0.02".parse().unwrap()).unwrap();
//! assert_eq!(window.lo(), BigDecimal::from(51_744));
//! assert_eq!(window.hi(), BigDecimal::from(53_856));
//!
//! let pipeline = CandidateFilterPipeline::builder()
//!     .value_window(window)
//!     .build();
//! assert!(pipeline.apply(&[]).is_empty());
//! ```

use bigdecimal::{BigDecimal, One, Zero};
use serde::Serialize;
use tracing::debug;

use crate::errors::ConfigurationError;
use crate::types::address_set::{AddressBlockSet, RouterSet};
use crate::types::candidate::Candidate;

/// A predicate of the pipeline, in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterStage {
    Blocklist,
    RouterParticipation,
    ValueWindow,
}

impl std::fmt::Display for FilterStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FilterStage::Blocklist => "blocklist",
            FilterStage::RouterParticipation => "router_participation",
            FilterStage::ValueWindow => "value_window",
        };
        f.write_str(name)
    }
}

/// Inclusive window around a target amount
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValueWindow {
    /// `target * (1 - pct) ..= target * (1 + pct)`, `pct` as a fraction
    Percent { target: BigDecimal, pct: BigDecimal },
    /// `target - tol ..= target + tol`
    Absolute { target: BigDecimal, tol: BigDecimal },
}

impl ValueWindow {
    /// Percentage window; `pct` is a fraction (`0.02` for 2%).
    pub fn percent(target: BigDecimal, pct: BigDecimal) -> Result<Self, ConfigurationError> {
        validate_target(&target)?;
        if pct < BigDecimal::zero() {
            return Err(ConfigurationError::invalid_parameter(
                "pct_tolerance",
                format!("must be >= 0, got {pct}"),
            ));
        }
        Ok(ValueWindow::Percent { target, pct })
    }

    /// Absolute window of `tol` on either side of `target`.
    pub fn absolute(target: BigDecimal, tol: BigDecimal) -> Result<Self, ConfigurationError> {
        validate_target(&target)?;
        if tol < BigDecimal::zero() {
            return Err(ConfigurationError::invalid_parameter(
                "abs_tolerance",
                format!("must be >= 0, got {tol}"),
            ));
        }
        Ok(ValueWindow::Absolute { target, tol })
    }

    pub fn lo(&self) -> BigDecimal {
        match self {
            ValueWindow::Percent { target, pct } => target * (BigDecimal::one() - pct),
            ValueWindow::Absolute { target, tol } => target - tol,
        }
    }

    pub fn hi(&self) -> BigDecimal {
        match self {
            ValueWindow::Percent { target, pct } => target * (BigDecimal::one() + pct),
            ValueWindow::Absolute { target, tol } => target + tol,
        }
    }

    pub fn contains(&self, value: &BigDecimal) -> bool {
        self.lo() <= *value && *value <= self.hi()
    }
}

fn validate_target(target: &BigDecimal) -> Result<(), ConfigurationError> {
    if *target <= BigDecimal::zero() {
        return Err(ConfigurationError::invalid_parameter(
            "target",
            format!("must be > 0, got {target}"),
        ));
    }
    Ok(())
}

/// Ordered, toggleable chain of candidate predicates
///
/// Build with [`CandidateFilterPipeline::builder`]; stages that are not
/// configured are skipped.
#[derive(Debug, Clone, Default)]
pub struct CandidateFilterPipeline {
    blocklist: Option<AddressBlockSet>,
    routers: Option<RouterSet>,
    window: Option<ValueWindow>,
}

impl CandidateFilterPipeline {
    pub fn builder() -> CandidateFilterPipelineBuilder {
        CandidateFilterPipelineBuilder::default()
    }

    /// The first stage that rejects `candidate`, or `None` if it passes.
    pub fn rejection_reason(&self, candidate: &Candidate) -> Option<FilterStage> {
        if let Some(blocklist) = &self.blocklist {
            if blocklist.contains(&candidate.from_addr) || blocklist.contains(&candidate.to_addr) {
                return Some(FilterStage::Blocklist);
            }
        }

        if let Some(routers) = &self.routers {
            if !routers.participates(candidate) {
                return Some(FilterStage::RouterParticipation);
            }
        }

        if let Some(window) = &self.window {
            if !window.contains(&candidate.asset_value) {
                return Some(FilterStage::ValueWindow);
            }
        }

        None
    }

    pub fn passes(&self, candidate: &Candidate) -> bool {
        self.rejection_reason(candidate).is_none()
    }

    /// The ordered subsequence of `candidates` that passes every enabled stage.
    pub fn apply(&self, candidates: &[Candidate]) -> Vec<Candidate> {
        let mut rejected = [0usize; 3];
        let mut kept = Vec::new();

        for candidate in candidates {
            match self.rejection_reason(candidate) {
                None => kept.push(candidate.clone()),
                Some(stage) => rejected[stage as usize] += 1,
            }
        }

        debug!(
            input = candidates.len(),
            kept = kept.len(),
            blocklisted = rejected[FilterStage::Blocklist as usize],
            no_router = rejected[FilterStage::RouterParticipation as usize],
            out_of_window = rejected[FilterStage::ValueWindow as usize],
            "Filtered candidates"
        );

        kept
    }

    pub fn value_window(&self) -> Option<&ValueWindow> {
        self.window.as_ref()
    }

    pub fn enabled_stages(&self) -> Vec<FilterStage> {
        let mut stages = Vec::new();
        if self.blocklist.is_some() {
            stages.push(FilterStage::Blocklist);
        }
        if self.routers.is_some() {
            stages.push(FilterStage::RouterParticipation);
        }
        if self.window.is_some() {
            stages.push(FilterStage::ValueWindow);
        }
        stages
    }
}

/// Builder for [`CandidateFilterPipeline`]
#[derive(Debug, Default)]
pub struct CandidateFilterPipelineBuilder {
    pipeline: CandidateFilterPipeline,
}

impl CandidateFilterPipelineBuilder {
    pub fn blocklist(mut self, blocklist: AddressBlockSet) -> Self {
        self.pipeline.blocklist = Some(blocklist);
        self
    }

    /// Require a router on either side of the transfer
    pub fn require_router(mut self, routers: RouterSet) -> Self {
        self.pipeline.routers = Some(routers);
        self
    }

    pub fn value_window(mut self, window: ValueWindow) -> Self {
        self.pipeline.window = Some(window);
        self
    }

    pub fn build(self) -> CandidateFilterPipeline {
        self.pipeline
    }
}
