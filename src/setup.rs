//! # Logger setup
//!
use env_logger::Builder;
use log::LevelFilter;

/// Init the logger at `Info` level, `RUST_LOG` still applies on top
pub fn init() {
    let mut builder = Builder::from_default_env();
    builder.filter(None, LevelFilter::Info).init();
}

/// Same as [`init`] but does not fail if a logger is already installed (useful in tests)
pub fn try_init() -> bool {
    Builder::from_default_env()
        .filter(None, LevelFilter::Debug)
        .is_test(true)
        .try_init()
        .is_ok()
}
