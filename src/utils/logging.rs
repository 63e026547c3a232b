//! Logging helpers: env_logger bootstrap for embedding binaries and tests,
//! plus conditional macros gated on a module-level `ENABLE_LOGS` flag.
//!
//! Chatty modules (ingest, the pipeline) declare
//! `const ENABLE_LOGS: bool = true;` and use the macros so their output can
//! be silenced per module without touching the global filter.

/// Initialize env_logger once (reads RUST_LOG). Safe to call repeatedly.
pub fn init() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .try_init();
}

/// Macro for conditional info logging.
/// Checks the `ENABLE_LOGS` const in the calling module.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

/// Macro for conditional warn logging.
/// Checks the `ENABLE_LOGS` const in the calling module.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

/// Macro for conditional error logging.
/// Checks the `ENABLE_LOGS` const in the calling module.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}
