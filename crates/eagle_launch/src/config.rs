//! Launch Profile
//!
//! The static half of a launch: every literal a launcher script would hardcode.
//! A profile is combined with a project root and a process count to produce an
//! [`Invocation`](crate::launch::Invocation).

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// A path that is either anchored at the project root or passed through as-is.
///
/// Hub model ids (`Qwen/Qwen3-4B`) and absolute paths are `Literal`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum PathSpec {
    Root(PathBuf),
    Literal(String),
}

impl PathSpec {
    pub fn root(rel: impl Into<PathBuf>) -> Self {
        PathSpec::Root(rel.into())
    }

    pub fn literal(value: impl Into<String>) -> Self {
        PathSpec::Literal(value.into())
    }

    pub fn resolve(&self, root: &Path) -> String {
        match self {
            PathSpec::Root(rel) => root.join(rel).to_string_lossy().into_owned(),
            PathSpec::Literal(value) => value.clone(),
        }
    }
}

/// Global batch size for the draft model.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GlobalBatch {
    /// micro-batch size × process count
    #[default]
    Derived,
    Fixed(usize),
}

/// Tensor-parallel degree handed to the trainer.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum TpSize {
    Fixed(usize),
    /// One shard per worker process.
    MatchProcesses,
}

impl Default for TpSize {
    fn default() -> Self {
        TpSize::Fixed(1)
    }
}

/// Distributed runner (`torchrun`) settings.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RunnerSpec {
    pub program: String,
    /// Single-host rendezvous (`--standalone`).
    #[serde(default = "default_true")]
    pub standalone: bool,
}

impl Default for RunnerSpec {
    fn default() -> Self {
        Self {
            program: "torchrun".to_string(),
            standalone: true,
        }
    }
}

/// Compiled-kernel cache exported to the child only.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CacheEnv {
    pub var: String,
    pub dir: PathSpec,
}

impl Default for CacheEnv {
    fn default() -> Self {
        Self {
            var: "TORCHINDUCTOR_CACHE_DIR".to_string(),
            dir: PathSpec::root("cache/compiled_kernels"),
        }
    }
}

/// Hyperparameters and paths forwarded to the training entry point.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TrainSettings {
    // Paths
    pub target_model_path: PathSpec,
    pub draft_model_config: PathSpec,
    pub train_data_path: PathSpec,
    pub output_dir: PathSpec,
    pub cache_dir: PathSpec,
    // Dataset
    #[serde(default)]
    pub build_dataset_num_proc: Option<usize>,
    // Schedule
    pub num_epochs: usize,
    pub batch_size: usize,
    #[serde(default)]
    pub draft_micro_batch_size: Option<usize>,
    #[serde(default)]
    pub draft_global_batch_size: GlobalBatch,
    #[serde(default)]
    pub tp_size: TpSize,
    pub learning_rate: f64,
    pub max_length: usize,
    // Model
    pub chat_template: String,
    pub embedding_key: String,
    pub ttt_length: usize,
}

/// Experiment tracking. The API key is read from `api_key_env` at launch time
/// and never stored in a profile.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Tracking {
    pub report_to: String,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub run_name: Option<String>,
    #[serde(default)]
    pub api_key_env: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LaunchProfile {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Worker processes when none is given on the command line.
    pub default_nproc: usize,
    #[serde(default)]
    pub runner: RunnerSpec,
    pub entry_point: PathSpec,
    #[serde(default)]
    pub cache_env: CacheEnv,
    pub train: TrainSettings,
    #[serde(default)]
    pub tracking: Option<Tracking>,
    /// Appended verbatim after the composed flags.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl LaunchProfile {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read profile {}", path.display()))?;
        let profile: LaunchProfile = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse profile {}", path.display()))?;
        profile
            .validate(profile.default_nproc)
            .with_context(|| format!("Invalid profile {}", path.display()))?;
        Ok(profile)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json_pretty()?)
            .with_context(|| format!("Failed to write profile {}", path.display()))
    }

    /// Draft global batch for `nproc` workers. `None` when the profile does not
    /// set a draft micro-batch size, or the product overflows (rejected by
    /// [`validate`](Self::validate)).
    pub fn global_batch(&self, nproc: usize) -> Option<usize> {
        let micro = self.train.draft_micro_batch_size?;
        match self.train.draft_global_batch_size {
            GlobalBatch::Derived => micro.checked_mul(nproc),
            GlobalBatch::Fixed(n) => Some(n),
        }
    }

    pub fn tp_size(&self, nproc: usize) -> usize {
        match self.train.tp_size {
            TpSize::Fixed(n) => n,
            TpSize::MatchProcesses => nproc,
        }
    }

    /// Checks the arithmetic the launcher itself is responsible for.
    /// Paths are left to the trainer.
    pub fn validate(&self, nproc: usize) -> Result<()> {
        if nproc == 0 {
            bail!("Process count must be at least 1");
        }
        if self.default_nproc == 0 {
            bail!("default_nproc must be at least 1");
        }
        if self.runner.program.is_empty() {
            bail!("Runner program is empty");
        }
        if let TpSize::Fixed(0) = self.train.tp_size {
            bail!("tp_size must be at least 1");
        }

        match (
            self.train.draft_micro_batch_size,
            self.train.draft_global_batch_size,
        ) {
            (Some(0), _) => bail!("draft_micro_batch_size must be at least 1"),
            (None, GlobalBatch::Fixed(_)) => {
                bail!("A fixed draft_global_batch_size requires draft_micro_batch_size")
            }
            (Some(micro), GlobalBatch::Derived) => {
                if micro.checked_mul(nproc).is_none() {
                    bail!(
                        "draft global batch overflows: micro batch {} x {} processes",
                        micro,
                        nproc
                    );
                }
            }
            (Some(micro), GlobalBatch::Fixed(global)) => {
                if global == 0 || global % micro != 0 || global % nproc != 0 {
                    bail!(
                        "draft_global_batch_size {} must be a multiple of micro batch {} and process count {}",
                        global,
                        micro,
                        nproc
                    );
                }
            }
            _ => {}
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}
