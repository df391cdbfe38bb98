//! evdev-backed key source. The device is grabbed so keystrokes never reach the
//! console, and a self-pipe lets another thread interrupt the blocking read.

use super::{KeySource, KeypadWake, ENTER_TOKEN};
use anyhow::{anyhow, Context, Result};
use evdev::{Device, InputEventKind, Key};
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::path::Path;
use std::sync::Arc;

const KEY_DOWN: i32 = 1;

/// Keys that take part in an entry. Keypad and main-row variants map to the same token.
const KEY_TOKENS: &[(Key, &str)] = &[
    (Key::KEY_KP0, "0"),
    (Key::KEY_KP1, "1"),
    (Key::KEY_KP2, "2"),
    (Key::KEY_KP3, "3"),
    (Key::KEY_KP4, "4"),
    (Key::KEY_KP5, "5"),
    (Key::KEY_KP6, "6"),
    (Key::KEY_KP7, "7"),
    (Key::KEY_KP8, "8"),
    (Key::KEY_KP9, "9"),
    (Key::KEY_0, "0"),
    (Key::KEY_1, "1"),
    (Key::KEY_2, "2"),
    (Key::KEY_3, "3"),
    (Key::KEY_4, "4"),
    (Key::KEY_5, "5"),
    (Key::KEY_6, "6"),
    (Key::KEY_7, "7"),
    (Key::KEY_8, "8"),
    (Key::KEY_9, "9"),
    (Key::KEY_KPENTER, ENTER_TOKEN),
    (Key::KEY_ENTER, ENTER_TOKEN),
    (Key::KEY_KPSLASH, "SLASH"),
    (Key::KEY_SLASH, "SLASH"),
    (Key::KEY_KPDOT, "DOT"),
    (Key::KEY_DOT, "DOT"),
    (Key::KEY_KPASTERISK, "ASTERISK"),
    (Key::KEY_KPMINUS, "MINUS"),
    (Key::KEY_MINUS, "MINUS"),
    (Key::KEY_KPPLUS, "PLUS"),
];

/// Token for a key-down, or `None` for keys the decoder never sees (Num Lock and friends).
pub fn keypad_token(key: Key) -> Option<&'static str> {
    KEY_TOKENS
        .iter()
        .find(|(candidate, _)| *candidate == key)
        .map(|(_, token)| *token)
}

pub struct EvdevKeypad {
    device: Device,
    wake_rx: OwnedFd,
}

/// Cloneable handle that unblocks a waiting [`EvdevKeypad`].
#[derive(Clone)]
pub struct KeypadWaker {
    wake_tx: Arc<OwnedFd>,
}

impl EvdevKeypad {
    /// Open and grab the keypad. Failing here is fatal for startup.
    pub fn open(path: &Path) -> Result<(Self, KeypadWaker)> {
        let mut device = Device::open(path)
            .with_context(|| format!("failed to open keypad device {}", path.display()))?;
        device
            .grab()
            .with_context(|| format!("failed to grab keypad device {}", path.display()))?;
        let (wake_rx, wake_tx) = wake_pipe()?;
        tracing::info!(
            device = %path.display(),
            name = device.name().unwrap_or("unnamed"),
            "keypad grabbed"
        );
        Ok((
            Self { device, wake_rx },
            KeypadWaker {
                wake_tx: Arc::new(wake_tx),
            },
        ))
    }
}

impl KeySource for EvdevKeypad {
    fn next_keys(&mut self) -> io::Result<Option<Vec<String>>> {
        loop {
            let mut fds = [
                libc::pollfd {
                    fd: self.device.as_raw_fd(),
                    events: libc::POLLIN,
                    revents: 0,
                },
                libc::pollfd {
                    fd: self.wake_rx.as_raw_fd(),
                    events: libc::POLLIN,
                    revents: 0,
                },
            ];
            // SAFETY: `fds` is a valid array of two pollfd structs for the duration of the call.
            let ready = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, -1) };
            if ready < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(err);
            }
            if fds[1].revents != 0 {
                return Ok(None);
            }
            if fds[0].revents & (libc::POLLERR | libc::POLLHUP | libc::POLLNVAL) != 0 {
                return Err(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "keypad device went away",
                ));
            }
            if fds[0].revents & libc::POLLIN == 0 {
                continue;
            }
            let keys: Vec<String> = self
                .device
                .fetch_events()?
                .filter(|event| event.value() == KEY_DOWN)
                .filter_map(|event| match event.kind() {
                    InputEventKind::Key(key) => {
                        let token = keypad_token(key);
                        if token.is_none() {
                            tracing::debug!(code = key.code(), "ignoring key");
                        }
                        token.map(str::to_string)
                    }
                    _ => None,
                })
                .collect();
            if !keys.is_empty() {
                return Ok(Some(keys));
            }
        }
    }
}

impl KeypadWake for KeypadWaker {
    fn wake(&self) {
        let byte = [1u8];
        // SAFETY: writes one byte from a live stack buffer to an fd we own.
        let written = unsafe {
            libc::write(
                self.wake_tx.as_raw_fd(),
                byte.as_ptr() as *const libc::c_void,
                1,
            )
        };
        if written < 0 {
            tracing::warn!(
                "failed to wake keypad reader: {}",
                io::Error::last_os_error()
            );
        }
    }
}

fn wake_pipe() -> Result<(OwnedFd, OwnedFd)> {
    let mut fds = [0 as libc::c_int; 2];
    // SAFETY: pipe2 fills the two-element array on success.
    let rc = unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) };
    if rc != 0 {
        return Err(anyhow!(
            "failed to create keypad wake pipe: {}",
            io::Error::last_os_error()
        ));
    }
    // SAFETY: both descriptors were just created and are owned by nobody else.
    let (rx, tx) = unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };
    Ok((rx, tx))
}
