use anyhow::Result;
use clap::Parser;
use eagle_launch::cli::{Cli, Commands, ExportArgs};
use eagle_launch::launch;
use eagle_launch::presets::Preset;
use tracing_appender::rolling::{RollingFileAppender, Rotation};

/// Launcher-side failures (root, profile, spawn). Runner failures pass through.
const LAUNCHER_FAILURE: i32 = 2;

fn main() {
    let cli = Cli::parse();

    // 1. Setup File Logging (console only if the log directory is unusable)
    let (file_layer, guard, file_log_error) = match RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("eagle_launch.log")
        .build(&cli.log_dir)
    {
        Ok(file_appender) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false);
            (Some(layer), Some(guard), None)
        }
        Err(e) => (None, None, Some(e)),
    };

    // 2. Setup Console Logging
    let env_filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(tracing::Level::INFO.into())
        .from_env_lossy();

    // 3. Combine Subscribers
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)) // Stderr
        .with(file_layer) // File
        .init();

    if let Some(e) = file_log_error {
        tracing::warn!(
            "File logging disabled, cannot use {}: {}",
            cli.log_dir.display(),
            e
        );
    }

    // 4. Setup Panic Hook
    std::panic::set_hook(Box::new(|panic_info| {
        let payload = panic_info.payload();
        let msg = if let Some(s) = payload.downcast_ref::<&str>() {
            *s
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.as_str()
        } else {
            "Unknown panic"
        };

        let location = panic_info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_default();
        tracing::error!(target: "panic", "🔥 CRASH detected at {}: {}", location, msg);
        eprintln!("🔥 CRASH detected at {}: {}", location, msg);
    }));

    let code = match dispatch(cli.command) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            LAUNCHER_FAILURE
        }
    };

    // Flush the file log before exiting.
    drop(guard);
    std::process::exit(code);
}

fn dispatch(command: Commands) -> Result<i32> {
    match command {
        Commands::Run(args) => Ok(launch::run(args)?.exit_code()),
        Commands::Show(args) => launch::show(args).map(|_| 0),
        Commands::Presets => {
            list_presets();
            Ok(0)
        }
        Commands::Export(args) => export(args).map(|_| 0),
    }
}

fn list_presets() {
    for preset in Preset::all() {
        let profile = preset.profile();
        println!(
            "{:<20} nproc={:<3} {}",
            preset.name(),
            profile.default_nproc,
            preset.display_name()
        );
    }
}

fn export(args: ExportArgs) -> Result<()> {
    let profile = args.preset.profile();
    match args.output {
        Some(path) => {
            profile.save(&path)?;
            tracing::info!("✅ Profile written to {}", path.display());
        }
        None => println!("{}", profile.to_json_pretty()?),
    }
    Ok(())
}
