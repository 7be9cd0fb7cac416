use std::collections::HashSet;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::core::error::DispatchError;
use crate::core::run_spec::{ExtraFlag, InteractionType, RunSpec};

/// Seconds added to the start delay of each subsequent session
pub const DELAY_STEP_SECS: u64 = 2;

/// Launch order of the standard plan. Session `i` runs on GPU `i`.
const STANDARD_ORDER: [InteractionType; 7] = [
    InteractionType::ExpectedHessians,
    InteractionType::Hessians,
    InteractionType::HessiansTimesInputs,
    InteractionType::ShapleySampling,
    InteractionType::ContextualDecomposition,
    InteractionType::IntegratedHessians,
    InteractionType::NeuralInteractionDetection,
];

/// Ordered set of runs sharing one dataset
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunPlan {
    /// Dataset passed to every run
    pub dataset: String,
    /// Runs, in launch order
    pub specs: Vec<RunSpec>,
}

impl RunPlan {
    /// The seven-run benchmark sweep: one session per interaction type,
    /// one GPU each, starts staggered by two seconds. Only the integrated
    /// hessians run trains its interaction model.
    pub fn standard(dataset: &str) -> Self {
        let specs = STANDARD_ORDER
            .iter()
            .enumerate()
            .map(|(index, &interaction_type)| {
                let spec = RunSpec::new(
                    index,
                    interaction_type,
                    index as u32,
                    index as u64 * DELAY_STEP_SECS,
                );
                if interaction_type == InteractionType::IntegratedHessians {
                    spec.with_flag(ExtraFlag::TrainInteractionModel)
                } else {
                    spec
                }
            })
            .collect();

        Self {
            dataset: dataset.to_string(),
            specs,
        }
    }

    /// Load a plan from a JSON file. The result is not validated.
    pub fn from_json_file(path: &Path) -> Result<Self, DispatchError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            std::io::Error::new(
                e.kind(),
                format!("Failed to read plan file '{}': {}", path.display(), e),
            )
        })?;
        let plan: RunPlan = serde_json::from_str(&content).map_err(|e| {
            DispatchError::SerializationError(format!(
                "Failed to parse plan file '{}': {}", path.display(), e
            ))
        })?;
        debug!("Loaded plan with {} runs from {}", plan.specs.len(), path.display());
        Ok(plan)
    }

    pub fn to_json_pretty(&self) -> Result<String, DispatchError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check the invariants every plan must hold before anything is launched
    pub fn validate(&self) -> Result<(), DispatchError> {
        if self.dataset.trim().is_empty() {
            return Err(DispatchError::ValidationError("Dataset name is empty".to_string()));
        }
        if self.specs.is_empty() {
            return Err(DispatchError::ValidationError("Plan contains no runs".to_string()));
        }

        let mut sessions = HashSet::new();
        let mut devices = HashSet::new();
        let mut previous_delay = 0;

        for spec in &self.specs {
            if spec.session_name.is_empty() {
                return Err(DispatchError::ValidationError(
                    "Session name is empty".to_string()
                ));
            }
            // tmux rewrites these in session names and reads them as target separators
            if spec
                .session_name
                .chars()
                .any(|c| c == '.' || c == ':' || c.is_whitespace())
            {
                return Err(DispatchError::ValidationError(format!(
                    "Session name '{}' must not contain '.', ':' or whitespace",
                    spec.session_name
                )));
            }
            if !sessions.insert(spec.session_name.as_str()) {
                return Err(DispatchError::ValidationError(format!(
                    "Duplicate session name: {}", spec.session_name
                )));
            }
            if !spec.suffix_matches() {
                return Err(DispatchError::ValidationError(format!(
                    "Session '{}' does not end with '_{}' for interaction type {}",
                    spec.session_name,
                    spec.interaction_type.session_suffix(),
                    spec.interaction_type
                )));
            }
            if !devices.insert(spec.device_id) {
                return Err(DispatchError::ValidationError(format!(
                    "Device {} assigned to more than one session (second: {})",
                    spec.device_id, spec.session_name
                )));
            }
            if spec.start_delay_secs < previous_delay {
                return Err(DispatchError::ValidationError(format!(
                    "Start delay of '{}' ({}s) is earlier than the previous session ({}s)",
                    spec.session_name, spec.start_delay_secs, previous_delay
                )));
            }
            previous_delay = spec.start_delay_secs;
        }

        Ok(())
    }
}
