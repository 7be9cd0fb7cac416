use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::error::DispatchError;

/// Feature-interaction attribution method evaluated by the benchmark script
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    IntegratedHessians,
    ExpectedHessians,
    Hessians,
    HessiansTimesInputs,
    ShapleySampling,
    ContextualDecomposition,
    NeuralInteractionDetection,
}

impl InteractionType {
    /// Every interaction type, in the order the benchmark script documents them
    pub const ALL: [InteractionType; 7] = [
        InteractionType::IntegratedHessians,
        InteractionType::ExpectedHessians,
        InteractionType::Hessians,
        InteractionType::HessiansTimesInputs,
        InteractionType::ShapleySampling,
        InteractionType::ContextualDecomposition,
        InteractionType::NeuralInteractionDetection,
    ];

    /// Literal passed to `--interaction_type`
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionType::IntegratedHessians => "integrated_hessians",
            InteractionType::ExpectedHessians => "expected_hessians",
            InteractionType::Hessians => "hessians",
            InteractionType::HessiansTimesInputs => "hessians_times_inputs",
            InteractionType::ShapleySampling => "shapley_sampling",
            InteractionType::ContextualDecomposition => "contextual_decomposition",
            InteractionType::NeuralInteractionDetection => "neural_interaction_detection",
        }
    }

    /// Short suffix used in session names, e.g. `s5_ih`
    pub fn session_suffix(&self) -> &'static str {
        match self {
            InteractionType::IntegratedHessians => "ih",
            InteractionType::ExpectedHessians => "eh",
            InteractionType::Hessians => "h",
            InteractionType::HessiansTimesInputs => "hti",
            InteractionType::ShapleySampling => "ss",
            InteractionType::ContextualDecomposition => "cd",
            InteractionType::NeuralInteractionDetection => "nid",
        }
    }
}

impl Display for InteractionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for InteractionType {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InteractionType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| DispatchError::ValidationError(format!(
                "Unknown interaction type: {}", s
            )))
    }
}

/// Optional flags appended after the core benchmark arguments
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ExtraFlag {
    /// Train the interaction model before attributing
    TrainInteractionModel,
}

impl ExtraFlag {
    pub fn as_arg(&self) -> &'static str {
        match self {
            ExtraFlag::TrainInteractionModel => "--train_interaction_model",
        }
    }
}

/// One benchmark run: which method, on which GPU, after how long
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSpec {
    /// Multiplexer session name
    pub session_name: String,
    /// Attribution method under test
    pub interaction_type: InteractionType,
    /// GPU index handed to `--visible_devices`
    pub device_id: u32,
    /// Seconds the session sleeps before starting the benchmark
    pub start_delay_secs: u64,
    /// Additional flags, empty for most runs
    #[serde(default)]
    pub extra_flags: Vec<ExtraFlag>,
}

impl RunSpec {
    /// Build a spec whose session name is derived from its position and method
    pub fn new(index: usize, interaction_type: InteractionType, device_id: u32, start_delay_secs: u64) -> Self {
        Self {
            session_name: format!("s{}_{}", index, interaction_type.session_suffix()),
            interaction_type,
            device_id,
            start_delay_secs,
            extra_flags: Vec::new(),
        }
    }

    pub fn with_flag(mut self, flag: ExtraFlag) -> Self {
        if !self.extra_flags.contains(&flag) {
            self.extra_flags.push(flag);
        }
        self
    }

    #[cfg(test)]
    pub fn has_flag(&self, flag: ExtraFlag) -> bool {
        self.extra_flags.contains(&flag)
    }

    /// Whether the session name ends with this run's method suffix
    pub fn suffix_matches(&self) -> bool {
        self.session_name
            .rsplit_once('_')
            .map(|(_, suffix)| suffix == self.interaction_type.session_suffix())
            .unwrap_or(false)
    }

    /// Arguments for the benchmark script, excluding the script path itself
    pub fn script_args(&self, dataset: &str) -> Vec<String> {
        let mut args = vec![
            "--dataset".to_string(),
            dataset.to_string(),
            "--interaction_type".to_string(),
            self.interaction_type.as_str().to_string(),
            "--visible_devices".to_string(),
            self.device_id.to_string(),
        ];
        args.extend(self.extra_flags.iter().map(|flag| flag.as_arg().to_string()));
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_every_literal() {
        for interaction_type in InteractionType::ALL {
            let parsed: InteractionType = interaction_type.as_str().parse().unwrap();
            assert_eq!(parsed, interaction_type);
        }
        assert!("Hessians".parse::<InteractionType>().is_err());
        assert!("gradients".parse::<InteractionType>().is_err());
    }

    #[test]
    fn test_session_suffixes_are_unique() {
        let mut suffixes: Vec<_> = InteractionType::ALL.iter().map(|t| t.session_suffix()).collect();
        suffixes.sort();
        suffixes.dedup();
        assert_eq!(suffixes.len(), 7);
    }

    #[test]
    fn test_serde_uses_cli_literal() {
        let json = serde_json::to_string(&InteractionType::HessiansTimesInputs).unwrap();
        assert_eq!(json, "\"hessians_times_inputs\"");
        let flag = serde_json::to_string(&ExtraFlag::TrainInteractionModel).unwrap();
        assert_eq!(flag, "\"train_interaction_model\"");
    }

    #[test]
    fn test_script_args() {
        let spec = RunSpec::new(5, InteractionType::IntegratedHessians, 5, 10)
            .with_flag(ExtraFlag::TrainInteractionModel);
        assert_eq!(spec.session_name, "s5_ih");
        assert_eq!(
            spec.script_args("simulated"),
            vec![
                "--dataset", "simulated",
                "--interaction_type", "integrated_hessians",
                "--visible_devices", "5",
                "--train_interaction_model",
            ]
        );
    }

    // Adding the same flag twice does not duplicate it on the command line
    #[test]
    fn test_with_flag_is_idempotent() {
        let spec = RunSpec::new(0, InteractionType::Hessians, 0, 0)
            .with_flag(ExtraFlag::TrainInteractionModel)
            .with_flag(ExtraFlag::TrainInteractionModel);
        assert_eq!(spec.extra_flags.len(), 1);
    }

    #[test]
    fn test_suffix_matches() {
        let mut spec = RunSpec::new(3, InteractionType::ShapleySampling, 3, 6);
        assert!(spec.suffix_matches());
        spec.session_name = "s3_hti".to_string();
        assert!(!spec.suffix_matches());
        spec.session_name = "nosuffix".to_string();
        assert!(!spec.suffix_matches());
    }
}
