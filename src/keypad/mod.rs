//! Input decoder worker: reads key-down tokens and forwards one command per Enter.

mod decoder;
mod device;

pub use decoder::{PinDecoder, PinTokens, ENTER_TOKEN};
pub use device::{keypad_token, EvdevKeypad, KeypadWaker};

use crate::state::Command;
use crossbeam_channel::Sender;
use std::io;
use std::thread;

/// Blocking source of key-down tokens.
pub trait KeySource: Send {
    /// Wait for the next batch of tokens. `Ok(None)` means the source was woken for shutdown.
    fn next_keys(&mut self) -> io::Result<Option<Vec<String>>>;
}

/// Interrupts a blocked [`KeySource`] from another thread.
pub trait KeypadWake: Send {
    fn wake(&self);
}

/// Spawn the keypad thread. It stops on Quit, on wake-up, on a read error, or when the
/// command receiver is gone.
pub fn spawn_keypad_thread<S>(
    mut source: S,
    mut decoder: PinDecoder,
    tx: Sender<Command>,
) -> io::Result<thread::JoinHandle<()>>
where
    S: KeySource + 'static,
{
    thread::Builder::new()
        .name("keypad".to_string())
        .spawn(move || loop {
            let keys = match source.next_keys() {
                Ok(Some(keys)) => keys,
                Ok(None) => {
                    tracing::debug!("keypad reader woken for shutdown");
                    return;
                }
                Err(err) => {
                    tracing::error!("keypad read failed: {err}");
                    return;
                }
            };
            for key in keys {
                let Some(command) = decoder.push(&key) else {
                    continue;
                };
                tracing::debug!(?command, "keypad entry completed");
                if tx.send(command).is_err() {
                    return;
                }
                if command == Command::Quit {
                    return;
                }
            }
        })
}
