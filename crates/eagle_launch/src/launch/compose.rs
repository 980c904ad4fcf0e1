//! Invocation - the composed runner command line

use anyhow::Result;
use std::path::Path;
use std::process::Command;
use tracing::warn;

use crate::config::LaunchProfile;

const MASK: &str = "****";

/// Everything needed to start the runner. Built once, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub profile: String,
    pub program: String,
    pub nproc: usize,
    /// `--standalone --nproc_per_node N`
    pub runner_args: Vec<String>,
    pub entry_point: String,
    /// Ordered flag/value pairs for the entry point.
    pub flags: Vec<(String, String)>,
    pub extra_args: Vec<String>,
    /// Applied to the child only.
    pub env: Vec<(String, String)>,
    pub output_dir: String,
}

impl Invocation {
    /// `secret` resolves environment variable names (tracking API keys).
    pub fn compose<F>(
        profile: &LaunchProfile,
        root: &Path,
        nproc: usize,
        extra: &[String],
        secret: F,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        profile.validate(nproc)?;
        let train = &profile.train;

        let mut runner_args = Vec::new();
        if profile.runner.standalone {
            runner_args.push("--standalone".to_string());
        }
        runner_args.push("--nproc_per_node".to_string());
        runner_args.push(nproc.to_string());

        let output_dir = train.output_dir.resolve(root);

        let mut flags = FlagList::default();
        flags.push("--target-model-path", train.target_model_path.resolve(root));
        flags.push("--draft-model-config", train.draft_model_config.resolve(root));
        flags.push("--train-data-path", train.train_data_path.resolve(root));
        flags.push("--output-dir", output_dir.clone());
        flags.push_opt("--build-dataset-num-proc", train.build_dataset_num_proc);
        flags.push("--num-epochs", train.num_epochs);
        flags.push("--batch-size", train.batch_size);
        if let (Some(micro), Some(global)) =
            (train.draft_micro_batch_size, profile.global_batch(nproc))
        {
            flags.push("--draft-micro-batch-size", micro);
            flags.push("--draft-global-batch-size", global);
        }
        flags.push("--tp-size", profile.tp_size(nproc));
        flags.push("--learning-rate", format!("{:e}", train.learning_rate));
        flags.push("--max-length", train.max_length);
        flags.push("--chat-template", &train.chat_template);
        flags.push("--cache-dir", train.cache_dir.resolve(root));
        flags.push("--embedding-key", &train.embedding_key);
        flags.push("--ttt-length", train.ttt_length);

        if let Some(tracking) = &profile.tracking {
            let backend = &tracking.report_to;
            flags.push("--report-to", backend);
            flags.push_opt(&format!("--{backend}-project"), tracking.project.as_ref());
            flags.push_opt(&format!("--{backend}-name"), tracking.run_name.as_ref());
            if let Some(var) = &tracking.api_key_env {
                match secret(var) {
                    Some(key) => flags.push(&format!("--{backend}-key"), key),
                    None => warn!("{} is not set; launching without a {} key", var, backend),
                }
            }
        }

        let mut extra_args = profile.extra_args.clone();
        extra_args.extend(extra.iter().cloned());

        Ok(Self {
            profile: profile.name.clone(),
            program: profile.runner.program.clone(),
            nproc,
            runner_args,
            entry_point: profile.entry_point.resolve(root),
            flags: flags.0,
            extra_args,
            env: vec![(
                profile.cache_env.var.clone(),
                profile.cache_env.dir.resolve(root),
            )],
            output_dir,
        })
    }

    /// Arguments after the program name, in order.
    pub fn argv(&self) -> Vec<String> {
        self.argv_with(|_, value| value.to_string())
    }

    /// Same as [`argv`](Self::argv) with API keys replaced by a mask.
    pub fn masked_argv(&self) -> Vec<String> {
        self.argv_with(mask_secret)
    }

    fn argv_with(&self, value: impl Fn(&str, &str) -> String) -> Vec<String> {
        let mut argv = self.runner_args.clone();
        argv.push(self.entry_point.clone());
        for (flag, v) in &self.flags {
            argv.push(flag.clone());
            argv.push(value(flag, v));
        }
        argv.extend(self.extra_args.iter().cloned());
        argv
    }

    pub fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(self.argv());
        for (key, value) in &self.env {
            command.env(key, value);
        }
        command
    }

    /// Copy-pasteable shell rendering, one flag per line. Keys are masked.
    pub fn render_shell(&self) -> String {
        let mut lines = Vec::new();
        for (key, value) in &self.env {
            lines.push(format!("{}={}", key, shell_quote(value)));
        }
        let mut head = vec![shell_quote(&self.program)];
        head.extend(self.runner_args.iter().map(|a| shell_quote(a)));
        lines.push(head.join(" "));
        lines.push(format!("    {}", shell_quote(&self.entry_point)));
        for (flag, value) in &self.flags {
            lines.push(format!(
                "    {} {}",
                flag,
                shell_quote(&mask_secret(flag, value))
            ));
        }
        for arg in &self.extra_args {
            lines.push(format!("    {}", shell_quote(arg)));
        }
        lines.join(" \\\n")
    }
}

#[derive(Default)]
struct FlagList(Vec<(String, String)>);

impl FlagList {
    fn push(&mut self, flag: &str, value: impl ToString) {
        self.0.push((flag.to_string(), value.to_string()));
    }

    fn push_opt(&mut self, flag: &str, value: Option<impl ToString>) {
        if let Some(v) = value {
            self.push(flag, v);
        }
    }
}

fn mask_secret(flag: &str, value: &str) -> String {
    if flag.ends_with("-key") && flag != "--embedding-key" {
        MASK.to_string()
    } else {
        value.to_string()
    }
}

pub fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./:=@%+,".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}
