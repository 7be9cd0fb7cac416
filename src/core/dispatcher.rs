use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::DispatcherConfig;
use crate::core::error::DispatchError;
use crate::core::launcher::{LaunchRequest, SessionLauncher};
use crate::core::plan::RunPlan;
use crate::core::run_spec::RunSpec;

/// The Run Dispatcher opens one detached session per run in a plan and
/// starts the benchmark script in it. It never waits on or inspects the
/// benchmark itself.
pub struct Dispatcher {
    /// Session backend
    launcher: Arc<dyn SessionLauncher>,
    /// Interpreter, script and session options
    config: DispatcherConfig,
}

/// Result of handing one run to the launcher
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LaunchOutcome {
    /// Session name
    pub session: String,
    /// GPU index of the run
    pub device_id: u32,
    /// Delay the session waits before starting
    pub start_delay_secs: u64,
    /// Whether the session was created and the command sent
    pub launched: bool,
    /// Launcher error, if any
    pub error: Option<String>,
}

/// Summary of one dispatch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchReport {
    /// Unique identifier for this dispatch
    pub id: Uuid,
    /// Dataset shared by every run
    pub dataset: String,
    /// When the first launch was issued
    pub started_at: DateTime<Utc>,
    /// When the last launch returned
    pub finished_at: DateTime<Utc>,
    /// One entry per run, in plan order
    pub outcomes: Vec<LaunchOutcome>,
}

impl DispatchReport {
    pub fn all_launched(&self) -> bool {
        self.outcomes.iter().all(|o| o.launched)
    }

    pub fn failures(&self) -> Vec<&LaunchOutcome> {
        self.outcomes.iter().filter(|o| !o.launched).collect()
    }
}

/// Whether a planned session is currently open
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionStatus {
    pub session: String,
    pub running: bool,
}

impl Dispatcher {
    pub fn new(launcher: Arc<dyn SessionLauncher>, config: DispatcherConfig) -> Self {
        Self { launcher, config }
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Build the launch request for one run of `dataset`
    pub fn launch_request(&self, spec: &RunSpec, dataset: &str) -> LaunchRequest {
        let mut args = Vec::with_capacity(8);
        args.push(self.config.script.clone());
        args.extend(spec.script_args(dataset));

        LaunchRequest::new(
            &spec.session_name,
            &self.config.python,
            args,
            spec.start_delay_secs,
            self.config.hold_open,
        )
    }

    /// Validate the plan and return the requests a dispatch would issue
    pub fn preview(&self, plan: &RunPlan) -> Result<Vec<LaunchRequest>, DispatchError> {
        self.config.validate()?;
        plan.validate()?;
        Ok(plan
            .specs
            .iter()
            .map(|spec| self.launch_request(spec, &plan.dataset))
            .collect())
    }

    /// Launch every run of the plan, in order.
    ///
    /// Only an invalid plan or config is returned as an error. A session
    /// that fails to open is logged and recorded in the report, and the
    /// remaining runs are still launched.
    pub async fn dispatch(&self, plan: &RunPlan) -> Result<DispatchReport, DispatchError> {
        let requests = self.preview(plan)?;
        let id = Uuid::new_v4();
        let started_at = Utc::now();
        info!("Dispatch {}: launching {} runs on dataset '{}'", id, requests.len(), plan.dataset);

        let mut outcomes = Vec::with_capacity(requests.len());
        for (spec, request) in plan.specs.iter().zip(&requests) {
            debug!("{}: {}", request.session_name, request.shell_line);
            let result = self.launcher.launch(request).await;
            let error = match result {
                Ok(()) => {
                    info!(
                        "Started session {} ({} on GPU {}, delay {}s)",
                        spec.session_name, spec.interaction_type, spec.device_id, spec.start_delay_secs
                    );
                    None
                }
                Err(e) => {
                    error!("Failed to start session {}: {}", spec.session_name, e);
                    Some(e.to_string())
                }
            };
            outcomes.push(LaunchOutcome {
                session: spec.session_name.clone(),
                device_id: spec.device_id,
                start_delay_secs: spec.start_delay_secs,
                launched: error.is_none(),
                error,
            });
        }

        let report = DispatchReport {
            id,
            dataset: plan.dataset.clone(),
            started_at,
            finished_at: Utc::now(),
            outcomes,
        };
        let failed = report.failures().len();
        if failed > 0 {
            warn!("Dispatch {}: {} of {} sessions failed to start", id, failed, report.outcomes.len());
        } else {
            info!("Dispatch {}: all {} sessions started", id, report.outcomes.len());
        }
        Ok(report)
    }

    /// Report which sessions of the plan are still open
    pub async fn status(&self, plan: &RunPlan) -> Result<Vec<SessionStatus>, DispatchError> {
        let mut statuses = Vec::with_capacity(plan.specs.len());
        for spec in &plan.specs {
            let running = self.launcher.session_exists(&spec.session_name).await?;
            statuses.push(SessionStatus {
                session: spec.session_name.clone(),
                running,
            });
        }
        Ok(statuses)
    }
}
