pub mod app;
pub mod config;
pub mod display;
pub mod flag;
pub mod gateway;
pub mod health;
pub mod instance;
pub mod keypad;
mod lock;
pub mod notify;
pub mod reconciler;
pub mod runtime;
pub mod snapshot;
pub mod state;

pub(crate) use lock::lock_or_recover;
pub use app::{init_logging, install_panic_hook, log_panic};
pub use state::{ArmPoll, ArmState, Command, DisplayState, Notification};
