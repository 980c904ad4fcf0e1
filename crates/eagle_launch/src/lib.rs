pub mod cli;
pub mod config;
pub mod launch;
pub mod presets;
pub mod root;
