//! Configuration management for sound-displayer.
//!
//! Settings live in a TOML file in the user's config directory. The file is
//! created with defaults the first time the application runs.

pub mod file;

pub use file::{config_path, AudioConfig, DisplayConfig, DisplayerConfig};
