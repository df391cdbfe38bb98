//! Single-instance lock and the `--kill` switch.
//!
//! The running instance holds an exclusive `flock` on the lock file and records its PID
//! inside. A PID is only trusted while somebody holds that lock, so a stale file left by
//! a crash can never redirect a signal to an unrelated process.

use anyhow::{anyhow, bail, Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// Set by SIGTERM/SIGINT; the reconciler treats it like a Quit command.
static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_shutdown_signal(_: libc::c_int) {
    SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
}

pub fn install_shutdown_handlers() -> Result<()> {
    for signo in [libc::SIGTERM, libc::SIGINT] {
        // SAFETY: the handler only stores to an atomic, which is async-signal-safe.
        unsafe {
            let handler = handle_shutdown_signal as *const () as libc::sighandler_t;
            if libc::signal(signo, handler) == libc::SIG_ERR {
                return Err(anyhow!("failed to install handler for signal {signo}"));
            }
        }
    }
    Ok(())
}

pub fn shutdown_requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::SeqCst)
}

fn try_flock(file: &File, operation: libc::c_int) -> io::Result<bool> {
    // SAFETY: flock on a descriptor owned by `file`.
    let rc = unsafe { libc::flock(file.as_raw_fd(), operation | libc::LOCK_NB) };
    if rc == 0 {
        return Ok(true);
    }
    let err = io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::EWOULDBLOCK) {
        Ok(false)
    } else {
        Err(err)
    }
}

fn read_pid(file: &mut File) -> Result<i32> {
    let mut contents = String::new();
    file.seek(SeekFrom::Start(0))?;
    file.read_to_string(&mut contents)?;
    let pid: i32 = contents
        .trim()
        .parse()
        .with_context(|| format!("lock file holds no pid ({:?})", contents.trim()))?;
    if pid <= 0 {
        bail!("lock file holds invalid pid {pid}");
    }
    Ok(pid)
}

/// Held for the lifetime of a running instance.
#[derive(Debug)]
pub struct InstanceLock {
    file: File,
    path: PathBuf,
}

impl InstanceLock {
    pub fn acquire(path: &Path) -> Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("failed to open lock file {}", path.display()))?;
        if !try_flock(&file, libc::LOCK_EX)
            .with_context(|| format!("failed to lock {}", path.display()))?
        {
            let holder = read_pid(&mut file)
                .map(|pid| pid.to_string())
                .unwrap_or_else(|_| "unknown".to_string());
            bail!("another instance is already running (pid {holder})");
        }
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        write!(file, "{}", std::process::id())?;
        file.flush()?;
        tracing::debug!(pid = std::process::id(), lock = %path.display(), "instance lock held");
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        let _ = self.file.set_len(0);
        let _ = fs::remove_file(&self.path);
    }
}

/// Ask the instance holding `path` to shut down. Returns the signalled PID.
pub fn signal_running_instance(path: &Path) -> Result<i32> {
    let mut file = File::open(path).map_err(|_| anyhow!("could not find a running instance"))?;
    if try_flock(&file, libc::LOCK_SH)? {
        bail!("could not find a running instance");
    }
    let pid = read_pid(&mut file)?;
    // SAFETY: plain syscall with a validated positive pid.
    if unsafe { libc::kill(pid, libc::SIGTERM) } != 0 {
        return Err(anyhow!(
            "failed to signal pid {pid}: {}",
            io::Error::last_os_error()
        ));
    }
    Ok(pid)
}
