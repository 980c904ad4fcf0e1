//! Launch Arguments - CLI configuration for a single launch

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use crate::config::LaunchProfile;
use crate::presets::Preset;

/// Arguments shared by `run` and `show`.
#[derive(Args, Debug, Clone)]
pub struct LaunchArgs {
    /// Worker processes (same as --nproc)
    #[arg(value_name = "NPROC", value_parser = clap::value_parser!(u32).range(1..))]
    pub nproc_positional: Option<u32>,

    /// Worker processes per node
    #[arg(long, conflicts_with = "nproc_positional", value_parser = clap::value_parser!(u32).range(1..))]
    pub nproc: Option<u32>,

    /// Built-in profile
    #[arg(long, value_enum, default_value_t = Preset::default())]
    pub preset: Preset,

    /// JSON profile (replaces --preset)
    #[arg(long, conflicts_with = "preset")]
    pub profile: Option<PathBuf>,

    /// Project root (skips detection)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Location to resolve the project root from (defaults to this executable)
    #[arg(long)]
    pub launcher_path: Option<PathBuf>,

    /// Override the runner program (default: torchrun)
    #[arg(long)]
    pub runner: Option<String>,

    /// Extra arguments appended to the entry point
    #[arg(last = true)]
    pub extra: Vec<String>,
}

impl LaunchArgs {
    pub fn nproc(&self) -> Option<usize> {
        self.nproc.or(self.nproc_positional).map(|n| n as usize)
    }

    pub fn load_profile(&self) -> Result<LaunchProfile> {
        let mut profile = match &self.profile {
            Some(path) => LaunchProfile::load(path)?,
            None => self.preset.profile(),
        };
        if let Some(runner) = &self.runner {
            profile.runner.program = runner.clone();
        }
        Ok(profile)
    }
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub launch: LaunchArgs,

    /// Write launch_record.json into the output directory
    #[arg(long, action)]
    pub record: bool,
}
