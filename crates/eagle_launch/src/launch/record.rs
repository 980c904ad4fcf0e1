//! Launch Record - what was started, and how it ended

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use super::compose::Invocation;
use super::runner::LaunchOutcome;

pub const RECORD_FILE: &str = "launch_record.json";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LaunchRecord {
    pub profile: String,
    pub nproc: usize,
    pub program: String,
    /// API keys are masked.
    pub argv: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub started_at: String,
    #[serde(default)]
    pub finished_at: Option<String>,
    #[serde(default)]
    pub exit_code: Option<i32>,
}

impl LaunchRecord {
    pub fn start(invocation: &Invocation) -> Self {
        Self {
            profile: invocation.profile.clone(),
            nproc: invocation.nproc,
            program: invocation.program.clone(),
            argv: invocation.masked_argv(),
            env: invocation.env.iter().cloned().collect(),
            started_at: chrono::Local::now().to_rfc3339(),
            finished_at: None,
            exit_code: None,
        }
    }

    pub fn finish(&mut self, outcome: &LaunchOutcome) {
        self.finished_at = Some(chrono::Local::now().to_rfc3339());
        self.exit_code = Some(outcome.exit_code());
    }

    pub fn path(output_dir: &Path) -> PathBuf {
        output_dir.join(RECORD_FILE)
    }

    /// Writes `launch_record.json`, creating the output directory if needed.
    pub fn save(&self, output_dir: &Path) -> Result<()> {
        fs::create_dir_all(output_dir)
            .with_context(|| format!("Failed to create {}", output_dir.display()))?;
        let path = Self::path(output_dir);
        let file =
            File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    #[cfg(test)]
    pub fn load(output_dir: &Path) -> Result<Self> {
        let path = Self::path(output_dir);
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(serde_json::from_str(&raw)?)
    }
}
