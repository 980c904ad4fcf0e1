use crate::launch::{LaunchArgs, RunArgs};
use crate::presets::Preset;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "EAGLE-3 draft model training launcher", long_about = None)]
pub struct Cli {
    /// Directory for the daily rolling log file
    #[arg(long, global = true, default_value = "logs")]
    pub log_dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Launch a training job and wait for it
    Run(RunArgs),

    /// Print the command `run` would execute
    Show(LaunchArgs),

    /// List built-in presets
    Presets,

    /// Write a preset as an editable JSON profile
    Export(ExportArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    #[arg(long, value_enum, default_value_t = Preset::default())]
    pub preset: Preset,

    /// Output file (stdout if omitted)
    #[arg(long)]
    pub output: Option<PathBuf>,
}
