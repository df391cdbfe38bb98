//! Command-line parsing and validation helpers.

mod defaults;
#[cfg(test)]
mod tests;
mod validation;

use clap::Parser;
use std::path::PathBuf;

use defaults::{default_lock_file, default_log_file, default_snapshot_dir};
pub use defaults::{
    DEFAULT_CADENCE_MS, DEFAULT_CAPTURE_CMD, DEFAULT_FLAG_FILE, DEFAULT_KEYPAD_DEVICE,
    DEFAULT_PIN, DEFAULT_QUIT_TOKEN, DEFAULT_REFRESH_TOKEN, DEFAULT_WEBHOOK_URL, MAX_CADENCE_MS,
    MIN_CADENCE_MS,
};

/// CLI options for armpad. Run-only options are checked by [`AppConfig::validate`]
/// unless `--kill` is given.
#[derive(Debug, Parser, Clone)]
#[command(about = "armpad: PIN keypad arm/disarm controller", author, version)]
pub struct AppConfig {
    /// Output debugging information on the console
    #[arg(short = 'd', long = "debug", env = "ARMPAD_DEBUG", default_value_t = false)]
    pub debug: bool,

    /// Signal the running instance to shut down, then exit
    #[arg(short = 'k', long = "kill", default_value_t = false)]
    pub kill: bool,

    /// evdev node of the keypad (grabbed exclusively)
    #[arg(long, env = "ARMPAD_KEYPAD", default_value = DEFAULT_KEYPAD_DEVICE)]
    pub keypad_device: PathBuf,

    /// Digit sequence that toggles the arm state
    #[arg(long, env = "ARMPAD_PIN", hide_env_values = true, default_value = DEFAULT_PIN)]
    pub pin: String,

    /// Key sequence that stops armpad
    #[arg(long, default_value = DEFAULT_QUIT_TOKEN)]
    pub quit_token: String,

    /// Key sequence that forces a panel refresh
    #[arg(long, default_value = DEFAULT_REFRESH_TOKEN)]
    pub refresh_token: String,

    /// Minimum length of one polling cycle (milliseconds)
    #[arg(long = "cadence-ms", default_value_t = DEFAULT_CADENCE_MS)]
    pub cadence_ms: u64,

    /// File receiving `True`/`False` every cycle for other scripts
    #[arg(long, default_value = DEFAULT_FLAG_FILE)]
    pub flag_file: PathBuf,

    /// Single-instance lock file (also used by --kill)
    #[arg(long, default_value_os_t = default_lock_file())]
    pub lock_file: PathBuf,

    /// Log file (rotated when it grows past 5 MiB)
    #[arg(long, env = "ARMPAD_LOG_FILE", default_value_os_t = default_log_file())]
    pub log_file: PathBuf,

    /// Log panel frames instead of drawing them on the terminal
    #[arg(long, default_value_t = false)]
    pub headless: bool,

    /// Do not refresh the gateway session after a failed poll
    #[arg(long = "no-reconnect", default_value_t = false)]
    pub no_reconnect: bool,

    /// Base station API root
    #[arg(long, env = "ARMPAD_GATEWAY_URL")]
    pub gateway_url: Option<String>,

    /// Base station account
    #[arg(long, env = "ARMPAD_GATEWAY_USER")]
    pub gateway_user: Option<String>,

    /// Base station password
    #[arg(long, env = "ARMPAD_GATEWAY_PASSWORD", hide_env_values = true)]
    pub gateway_password: Option<String>,

    /// Webhook trigger root
    #[arg(long, env = "ARMPAD_WEBHOOK_URL", default_value = DEFAULT_WEBHOOK_URL)]
    pub webhook_url: String,

    /// Webhook key; notifications are skipped without one
    #[arg(long, env = "ARMPAD_WEBHOOK_KEY", hide_env_values = true)]
    pub webhook_key: Option<String>,

    /// Snapshot command; `{file}` is replaced by the output path. Rotate here for a
    /// sideways camera, e.g. `raspistill -n -rot 270 -o {file}`
    #[arg(long, default_value = DEFAULT_CAPTURE_CMD)]
    pub capture_cmd: String,

    /// Upload root for snapshots (HTTP PUT)
    #[arg(long, env = "ARMPAD_UPLOAD_URL")]
    pub upload_url: Option<String>,

    /// Public root of uploaded snapshots (defaults to the upload root)
    #[arg(long)]
    pub public_url: Option<String>,

    /// Scratch directory for snapshots before upload
    #[arg(long, default_value_os_t = default_snapshot_dir())]
    pub snapshot_dir: PathBuf,
}
