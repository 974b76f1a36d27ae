//! Configuration loading
//!
//! Loads [`focusledger_domain::Config`] from environment variables or files.

pub mod loader;

pub use loader::{load, load_from_env, load_from_file, discover_config_path};
