use std::env;
use std::path::PathBuf;

pub const DEFAULT_KEYPAD_DEVICE: &str = "/dev/input/event0";
pub const DEFAULT_PIN: &str = "1234";
pub const DEFAULT_QUIT_TOKEN: &str = "SLASHSLASH";
pub const DEFAULT_REFRESH_TOKEN: &str = "DOT";
pub const DEFAULT_CADENCE_MS: u64 = 2_000;
pub const MIN_CADENCE_MS: u64 = 100;
pub const MAX_CADENCE_MS: u64 = 60_000;
pub const DEFAULT_FLAG_FILE: &str = "arlo_armed";
pub const DEFAULT_WEBHOOK_URL: &str = "https://maker.ifttt.com/trigger";
pub const DEFAULT_CAPTURE_CMD: &str = "libcamera-still -n -o {file}";
pub(super) const MAX_PIN_DIGITS: usize = 16;
pub(super) const MAX_TOKEN_CHARS: usize = 32;

pub(super) fn default_lock_file() -> PathBuf {
    env::temp_dir().join("armpad.lock")
}

pub(super) fn default_log_file() -> PathBuf {
    env::temp_dir().join("armpad.log")
}

pub(super) fn default_snapshot_dir() -> PathBuf {
    env::temp_dir()
}
