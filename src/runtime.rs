//! Worker lifecycle: the keypad thread and the reconciler thread, joined in order.

use crate::keypad::{spawn_keypad_thread, KeySource, KeypadWake, PinDecoder};
use crate::reconciler::Reconciler;
use anyhow::{anyhow, Context, Result};
use crossbeam_channel::unbounded;
use std::thread;

/// Run both workers until Quit or `stop_requested`. The key source must already be
/// open, so a missing device never leaves a half-started reconciler behind.
pub fn run_workers<S, W>(
    source: S,
    waker: W,
    decoder: PinDecoder,
    reconciler: Reconciler,
    stop_requested: fn() -> bool,
) -> Result<()>
where
    S: KeySource + 'static,
    W: KeypadWake + 'static,
{
    let (command_tx, command_rx) = unbounded();
    let keypad = spawn_keypad_thread(source, decoder, command_tx)
        .context("failed to start keypad thread")?;
    let monitor = thread::Builder::new()
        .name("reconciler".to_string())
        .spawn(move || reconciler.run(command_rx, waker, stop_requested))
        .context("failed to start reconciler thread")?;
    tracing::info!("started");

    let monitor_result = monitor
        .join()
        .map_err(|_| anyhow!("reconciler thread panicked"));
    let keypad_result = keypad
        .join()
        .map_err(|_| anyhow!("keypad thread panicked"));
    monitor_result?;
    keypad_result?;
    tracing::info!("workers stopped");
    Ok(())
}
