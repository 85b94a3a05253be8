//! Per-run artifact records under a record directory.
//!
//! Each run gets `<record_dir>/<run_id>/` holding the plan, every execution
//! pass, every verdict and the final payload as pretty JSON.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, warn};

use crate::orchestrator::{RunEvent, RunObserver};

/// Timestamp-based run identifier, e.g. `20250101T120000.123Z`.
pub fn new_run_id() -> String {
    Utc::now().format("%Y%m%dT%H%M%S%.3fZ").to_string()
}

#[derive(Debug, Clone)]
pub struct RunPaths {
    pub dir: PathBuf,
    pub plan_path: PathBuf,
    pub execution_path: PathBuf,
    pub verification_path: PathBuf,
    pub retry_execution_path: PathBuf,
    pub reverification_path: PathBuf,
    pub payload_path: PathBuf,
}

impl RunPaths {
    pub fn new(record_dir: &Path, run_id: &str) -> Self {
        let dir = record_dir.join(run_id);
        Self {
            plan_path: dir.join("plan.json"),
            execution_path: dir.join("execution.json"),
            verification_path: dir.join("verification.json"),
            retry_execution_path: dir.join("retry_execution.json"),
            reverification_path: dir.join("reverification.json"),
            payload_path: dir.join("payload.json"),
            dir,
        }
    }

    fn execution(&self, round: u32) -> &Path {
        if round == 0 {
            &self.execution_path
        } else {
            &self.retry_execution_path
        }
    }

    fn verification(&self, round: u32) -> &Path {
        if round == 0 {
            &self.verification_path
        } else {
            &self.reverification_path
        }
    }
}

/// [`RunObserver`] that writes run artifacts to disk.
///
/// Write failures are logged and swallowed so recording never aborts a run.
#[derive(Debug, Clone)]
pub struct RunRecorder {
    run_id: String,
    paths: RunPaths,
}

impl RunRecorder {
    /// Create the run directory for a fresh run id under `record_dir`.
    pub fn create(record_dir: &Path) -> Result<Self> {
        Self::with_run_id(record_dir, &new_run_id())
    }

    pub fn with_run_id(record_dir: &Path, run_id: &str) -> Result<Self> {
        let paths = RunPaths::new(record_dir, run_id);
        fs::create_dir_all(&paths.dir)
            .with_context(|| format!("create run record dir {}", paths.dir.display()))?;
        Ok(Self {
            run_id: run_id.to_string(),
            paths,
        })
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn paths(&self) -> &RunPaths {
        &self.paths
    }

    fn record<T: Serialize>(&self, path: &Path, value: &T) {
        match write_json(path, value) {
            Ok(()) => debug!(path = %path.display(), "run artifact written"),
            Err(err) => {
                let reason = format!("{err:#}");
                warn!(reason = %reason, "failed to write run artifact");
            }
        }
    }
}

impl RunObserver for RunRecorder {
    fn on_event(&self, event: &RunEvent<'_>) {
        match *event {
            RunEvent::PhaseEntered(_) => {}
            RunEvent::Planned(plan) => self.record(&self.paths.plan_path, plan),
            RunEvent::Executed { round, execution } => {
                self.record(self.paths.execution(round), execution);
            }
            RunEvent::Verified {
                round,
                verification,
            } => self.record(self.paths.verification(round), verification),
            RunEvent::Finished(payload) => self.record(&self.paths.payload_path, payload),
        }
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(value).context("serialize run artifact")?;
    buf.push('\n');
    fs::write(path, buf).with_context(|| format!("write {}", path.display()))
}
