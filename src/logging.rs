//! Logging initialization utilities.

use env_logger::Env;

/// Initialize logging, falling back to `level` when `RUST_LOG` is unset.
pub fn init_with_default(level: &str) {
    let env = Env::default().default_filter_or(level);
    let _ = env_logger::Builder::from_env(env).try_init();
}
