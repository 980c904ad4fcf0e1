use anyhow::Result;
use eagle_launch::launch::{self, LaunchArgs, LaunchRecord, RunArgs};
use eagle_launch::presets::Preset;
use std::path::{Path, PathBuf};

fn launch_args(root: &Path, preset: Preset, nproc: Option<u32>, runner: &str) -> LaunchArgs {
    LaunchArgs {
        nproc_positional: None,
        nproc,
        preset,
        profile: None,
        root: Some(root.to_path_buf()),
        launcher_path: None,
        runner: Some(runner.to_string()),
        extra: Vec::new(),
    }
}

#[test]
fn test_prepare_resolves_against_root() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let root = dir.path().canonicalize()?;
    let args = launch_args(&root, Preset::Qwen3_4b, None, "torchrun");

    let invocation = launch::prepare(&args)?;
    assert_eq!(invocation.nproc, 1);
    assert_eq!(
        invocation.output_dir,
        root.join("outputs/qwen3-4b-eagle3").to_string_lossy()
    );
    assert_eq!(
        invocation.env[0].1,
        root.join("cache/compiled_kernels").to_string_lossy()
    );
    // The launcher's own environment is left alone.
    assert!(std::env::var_os("TORCHINDUCTOR_CACHE_DIR").is_none());
    Ok(())
}

#[test]
fn test_profile_file_replaces_preset() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut profile = Preset::Qwen3_4b.profile();
    profile.name = "custom".to_string();
    profile.default_nproc = 2;
    let path = dir.path().join("custom.json");
    profile.save(&path)?;

    let mut args = launch_args(dir.path(), Preset::Qwen3_4b, None, "torchrun");
    args.profile = Some(path);
    let invocation = launch::prepare(&args)?;
    assert_eq!(invocation.profile, "custom");
    assert_eq!(invocation.nproc, 2);
    Ok(())
}

#[test]
fn test_launcher_path_sets_root() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let root = dir.path().canonicalize()?;
    let mut args = launch_args(&root, Preset::Qwen3_4b, None, "torchrun");
    args.root = None;
    args.launcher_path = Some(root.join("examples").join("run_qwen3_4b_eagle3_online.sh"));

    let invocation = launch::prepare(&args)?;
    assert_eq!(
        PathBuf::from(&invocation.entry_point),
        root.join("scripts/train_eagle3_online.py")
    );
    Ok(())
}

// Every test that forks lives here so script writes never race another spawn.
#[cfg(unix)]
#[test]
fn test_run_passes_exit_code_through() -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir()?;
    let root = dir.path().canonicalize()?;
    let log = root.join("runner_log");
    std::fs::create_dir_all(&log)?;

    let script = root.join("fake_torchrun.sh");
    std::fs::write(
        &script,
        format!(
            "#!/bin/sh\n\
             echo run >> '{log}/calls.txt'\n\
             printf '%s\\n' \"$@\" > '{log}/argv.txt'\n\
             printf '%s\\n' \"$TORCHINDUCTOR_CACHE_DIR\" > '{log}/env.txt'\n\
             exit 1\n",
            log = log.display()
        ),
    )?;
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755))?;

    let args = RunArgs {
        launch: launch_args(
            &root,
            Preset::Qwen3_4bSwanlab,
            Some(4),
            &script.to_string_lossy(),
        ),
        record: true,
    };
    let outcome = launch::run(args)?;
    assert_eq!(outcome.exit_code(), 1);

    // No retry.
    let calls = std::fs::read_to_string(log.join("calls.txt"))?;
    assert_eq!(calls.lines().count(), 1);

    let argv = std::fs::read_to_string(log.join("argv.txt"))?;
    let argv: Vec<&str> = argv.lines().collect();
    assert_eq!(&argv[..3], ["--standalone", "--nproc_per_node", "4"]);
    let global = argv
        .iter()
        .position(|a| *a == "--draft-global-batch-size")
        .map(|i| argv[i + 1]);
    assert_eq!(global, Some("64"));

    let env = std::fs::read_to_string(log.join("env.txt"))?;
    assert_eq!(
        env.trim_end(),
        root.join("cache/compiled_kernels").to_string_lossy()
    );

    let record_path = LaunchRecord::path(&root.join("outputs/qwen3-4b-eagle3-ultrachat"));
    let record: LaunchRecord = serde_json::from_str(&std::fs::read_to_string(record_path)?)?;
    assert_eq!(record.exit_code, Some(1));
    assert_eq!(record.nproc, 4);

    // An unwritable record is only a warning; the runner still runs.
    let blocked = root.join("outputs/qwen3-4b-eagle3");
    std::fs::create_dir_all(root.join("outputs"))?;
    std::fs::write(&blocked, b"not a directory")?;
    let args = RunArgs {
        launch: launch_args(&root, Preset::Qwen3_4b, None, &script.to_string_lossy()),
        record: true,
    };
    let outcome = launch::run(args)?;
    assert_eq!(outcome.exit_code(), 1);
    let calls = std::fs::read_to_string(log.join("calls.txt"))?;
    assert_eq!(calls.lines().count(), 2);
    assert!(blocked.is_file());

    // A runner that cannot be started is a launcher error, not an exit code.
    let missing = RunArgs {
        launch: launch_args(&root, Preset::Qwen3_4b, None, "/nonexistent/torchrun"),
        record: false,
    };
    assert!(launch::run(missing).is_err());
    Ok(())
}
