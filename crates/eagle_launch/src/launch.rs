//! Launch Module - one training job, start to finish
//!
//! - args: CLI arguments for `run` / `show`
//! - compose: profile + root + process count -> Invocation
//! - runner: spawn, wait, forward termination signals
//! - record: optional JSON record next to the job's outputs

pub mod args;
pub mod compose;
pub mod record;
pub mod runner;

pub use args::{LaunchArgs, RunArgs};
pub use compose::Invocation;
pub use record::LaunchRecord;
pub use runner::LaunchOutcome;

use anyhow::Result;
use std::path::Path;
use tracing::{debug, warn};

use crate::root;

/// Resolve → configure env → compose args. Nothing is spawned.
pub fn prepare(args: &LaunchArgs) -> Result<Invocation> {
    let profile = args.load_profile()?;
    let nproc = args.nproc().unwrap_or(profile.default_nproc);
    let root = root::detect_root(args.root.as_deref(), args.launcher_path.as_deref())?;
    debug!("Project root: {}", root.display());
    Invocation::compose(&profile, &root, nproc, &args.extra, |var| {
        std::env::var(var).ok()
    })
}

/// Print the command `run` would execute.
pub fn show(args: LaunchArgs) -> Result<()> {
    let invocation = prepare(&args)?;
    println!("{}", invocation.render_shell());
    Ok(())
}

/// Launch and wait. The outcome carries the runner's exit status.
pub fn run(args: RunArgs) -> Result<LaunchOutcome> {
    let invocation = prepare(&args.launch)?;

    let mut record = args.record.then(|| LaunchRecord::start(&invocation));
    if let Some(r) = &record {
        save_record(r, &invocation.output_dir);
    }

    let outcome = runner::spawn_and_wait(&invocation)?;

    if let Some(r) = record.as_mut() {
        r.finish(&outcome);
        save_record(r, &invocation.output_dir);
    }
    Ok(outcome)
}

fn save_record(record: &LaunchRecord, output_dir: &str) {
    if let Err(e) = record.save(Path::new(output_dir)) {
        warn!("Failed to write launch record: {:#}", e);
    }
}
