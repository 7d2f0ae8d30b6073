//! Configuration system for VMH.
//!
//! - Built-in defaults matching the stock VistA container layout
//! - Optional TOML file (`--config`, `VMH_CONFIG`, or the per-user default)
//! - `VMH_*` environment overrides with source tracking

pub mod env;
pub mod settings;
pub mod source;

pub use env::{EnvError, EnvParser};
pub use settings::{
    ConfigError, ImportSettings, LoadedConfig, VistaSettings, VmhConfig, WorkdirPatchSettings,
    default_config_path, load_config,
};
pub use source::{ConfigSource, ConfigValueSource, Sourced};

#[cfg(test)]
pub(crate) fn env_test_lock() -> std::sync::MutexGuard<'static, ()> {
    use std::sync::{Mutex, OnceLock};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
