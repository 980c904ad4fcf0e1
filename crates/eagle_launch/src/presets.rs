//! Launch Presets - Built-in profiles for known training jobs

use crate::config::{
    CacheEnv, GlobalBatch, LaunchProfile, PathSpec, RunnerSpec, TpSize, Tracking, TrainSettings,
};
use clap::ValueEnum;

const ENTRY_POINT: &str = "scripts/train_eagle3_online.py";

/// Built-in launch profiles.
///
/// The two Qwen3-4B presets are separate experiments (different data, batch
/// layout and parallelism); neither replaces the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Preset {
    /// Qwen3-4B on ShareGPT, single process, no tensor parallelism
    #[default]
    #[value(name = "qwen3-4b")]
    Qwen3_4b,
    /// Qwen3-4B on UltraChat, tensor-parallel across all workers, SwanLab tracking
    #[value(name = "qwen3-4b-swanlab")]
    Qwen3_4bSwanlab,
}

impl Preset {
    pub fn name(&self) -> &'static str {
        match self {
            Preset::Qwen3_4b => "qwen3-4b",
            Preset::Qwen3_4bSwanlab => "qwen3-4b-swanlab",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Preset::Qwen3_4b => "Qwen3-4B EAGLE-3 (ShareGPT)",
            Preset::Qwen3_4bSwanlab => "Qwen3-4B EAGLE-3 (UltraChat + SwanLab)",
        }
    }

    /// All presets for iteration
    pub fn all() -> &'static [Preset] {
        &[Preset::Qwen3_4b, Preset::Qwen3_4bSwanlab]
    }

    pub fn profile(&self) -> LaunchProfile {
        match self {
            Preset::Qwen3_4b => LaunchProfile {
                name: self.name().to_string(),
                description: self.display_name().to_string(),
                default_nproc: 1,
                runner: RunnerSpec::default(),
                entry_point: PathSpec::root(ENTRY_POINT),
                cache_env: CacheEnv::default(),
                train: TrainSettings {
                    target_model_path: PathSpec::literal("Qwen/Qwen3-4B"),
                    draft_model_config: PathSpec::root("configs/qwen3-4b-eagle3.json"),
                    train_data_path: PathSpec::root("cache/dataset/sharegpt.jsonl"),
                    output_dir: PathSpec::root("outputs/qwen3-4b-eagle3"),
                    cache_dir: PathSpec::root("cache"),
                    build_dataset_num_proc: None,
                    num_epochs: 10,
                    batch_size: 1,
                    draft_micro_batch_size: None,
                    draft_global_batch_size: GlobalBatch::Derived,
                    tp_size: TpSize::Fixed(1),
                    learning_rate: 1e-4,
                    max_length: 2048,
                    chat_template: "qwen".to_string(),
                    embedding_key: "model.embed_tokens.weight".to_string(),
                    ttt_length: 7,
                },
                tracking: None,
                extra_args: Vec::new(),
            },
            Preset::Qwen3_4bSwanlab => LaunchProfile {
                name: self.name().to_string(),
                description: self.display_name().to_string(),
                default_nproc: 4,
                runner: RunnerSpec::default(),
                entry_point: PathSpec::root(ENTRY_POINT),
                cache_env: CacheEnv::default(),
                train: TrainSettings {
                    target_model_path: PathSpec::literal("Qwen/Qwen3-4B"),
                    draft_model_config: PathSpec::root("configs/qwen3-4b-eagle3.json"),
                    train_data_path: PathSpec::root("cache/dataset/ultrachat.jsonl"),
                    output_dir: PathSpec::root("outputs/qwen3-4b-eagle3-ultrachat"),
                    cache_dir: PathSpec::root("cache"),
                    build_dataset_num_proc: Some(64),
                    num_epochs: 10,
                    batch_size: 1,
                    draft_micro_batch_size: Some(16),
                    draft_global_batch_size: GlobalBatch::Derived,
                    tp_size: TpSize::MatchProcesses,
                    learning_rate: 1e-4,
                    max_length: 4096,
                    chat_template: "qwen".to_string(),
                    embedding_key: "model.embed_tokens.weight".to_string(),
                    ttt_length: 7,
                },
                tracking: Some(Tracking {
                    report_to: "swanlab".to_string(),
                    project: None,
                    run_name: Some("qwen3-4b-eagle3-ultrachat".to_string()),
                    api_key_env: Some("SWANLAB_API_KEY".to_string()),
                }),
                extra_args: Vec::new(),
            },
        }
    }
}
