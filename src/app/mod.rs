mod logging;

pub use logging::{init_logging, install_panic_hook, log_panic, LOG_FILTER_ENV};
