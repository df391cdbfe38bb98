use crate::config::AppConfig;
use anyhow::{anyhow, Result};
use std::{
    fs,
    io::{self, Write},
    panic,
    path::PathBuf,
    sync::{Mutex, OnceLock},
};
use tracing_subscriber::{
    filter::LevelFilter, fmt, fmt::time::UtcTime, layer::SubscriberExt,
    util::SubscriberInitExt, EnvFilter, Layer,
};

const LOG_MAX_BYTES: u64 = 5 * 1024 * 1024;
/// Overrides the level filters when set, `RUST_LOG` syntax.
pub const LOG_FILTER_ENV: &str = "ARMPAD_LOG";
static LOG_STATE: OnceLock<Mutex<Option<LogWriter>>> = OnceLock::new();

struct LogWriter {
    path: PathBuf,
    file: fs::File,
    max_bytes: u64,
    bytes_written: u64,
}

impl LogWriter {
    fn new(path: PathBuf, max_bytes: u64) -> io::Result<Self> {
        let mut bytes_written = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        if bytes_written > max_bytes {
            let _ = fs::remove_file(&path);
            bytes_written = 0;
        }
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        Ok(Self {
            path,
            file,
            max_bytes,
            bytes_written,
        })
    }

    fn rotate_if_needed(&mut self, next_len: usize) {
        if self.bytes_written.saturating_add(next_len as u64) <= self.max_bytes {
            return;
        }
        if let Ok(file) = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)
        {
            self.file = file;
            self.bytes_written = 0;
        }
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.rotate_if_needed(bytes.len());
        self.file.write_all(bytes)?;
        self.bytes_written = self.bytes_written.saturating_add(bytes.len() as u64);
        Ok(())
    }
}

fn log_state() -> &'static Mutex<Option<LogWriter>> {
    LOG_STATE.get_or_init(|| Mutex::new(None))
}

/// Handle handed to the fmt layer; every write goes to the shared rotating file.
struct LogFileHandle;

impl Write for LogFileHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // Not lock_or_recover: that helper logs, which would re-enter this writer.
        let mut state = log_state()
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(writer) = state.as_mut() {
            writer.write_bytes(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut state = log_state()
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match state.as_mut() {
            Some(writer) => writer.file.flush(),
            None => Ok(()),
        }
    }
}

/// `level` for everything, then any `directives` on top so they can raise or lower it.
fn level_filter(level: LevelFilter, directives: Option<&str>) -> EnvFilter {
    let combined = match directives.map(str::trim) {
        Some(extra) if !extra.is_empty() => format!("{level},{extra}"),
        _ => level.to_string(),
    };
    EnvFilter::builder().parse_lossy(combined)
}

/// Install the log sinks: the rotating file always, the console as well with `--debug`.
pub fn init_logging(config: &AppConfig) -> Result<()> {
    let writer = LogWriter::new(config.log_file.clone(), LOG_MAX_BYTES).map_err(|err| {
        anyhow!(
            "failed to open log file {}: {err}",
            config.log_file.display()
        )
    })?;
    *log_state()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(writer);

    let level = if config.debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let directives = std::env::var(LOG_FILTER_ENV).ok();

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_timer(UtcTime::rfc_3339())
        .with_writer(|| LogFileHandle)
        .with_filter(level_filter(level, directives.as_deref()));
    let console_layer = config.debug.then(|| {
        fmt::layer()
            .with_writer(io::stderr)
            .with_filter(level_filter(LevelFilter::DEBUG, directives.as_deref()))
    });

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|err| anyhow!("failed to install log subscriber: {err}"))?;
    Ok(())
}

/// Record a panic through the log sink before the default hook prints it.
pub fn log_panic(info: &panic::PanicHookInfo<'_>) {
    let location = info
        .location()
        .map(|loc| format!("{}:{}", loc.file(), loc.line()))
        .unwrap_or_else(|| "unknown".to_string());
    let payload = if let Some(text) = info.payload().downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = info.payload().downcast_ref::<String>() {
        text.clone()
    } else {
        "non-string panic payload".to_string()
    };
    tracing::error!(
        "panic at {location}: {payload} (v{})",
        env!("CARGO_PKG_VERSION")
    );
}

/// Chain [`log_panic`] in front of the current panic hook.
pub fn install_panic_hook() {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        log_panic(info);
        previous(info);
    }));
}
