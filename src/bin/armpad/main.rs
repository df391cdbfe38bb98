//! armpad entrypoint: mirrors the base station's arm state on a panel and toggles it
//! from a PIN keypad.
//!
//! # Architecture
//!
//! - Keypad thread: grabs the evdev device, decodes entries into commands
//! - Reconciler thread: polls the gateway, applies commands, renders, notifies

use anyhow::{Context, Result};
use armpad::config::AppConfig;
use armpad::display::{HeadlessPanel, Panel, TerminalPanel};
use armpad::flag::FlagFile;
use armpad::gateway::HttpGateway;
use armpad::instance::{
    install_shutdown_handlers, shutdown_requested, signal_running_instance, InstanceLock,
};
use armpad::keypad::{EvdevKeypad, PinDecoder};
use armpad::notify::WebhookNotifier;
use armpad::reconciler::{Collaborators, Reconciler};
use armpad::runtime::run_workers;
use armpad::snapshot::CommandSnapshotUploader;
use armpad::{init_logging, install_panic_hook};

fn main() -> Result<()> {
    let config = AppConfig::parse_args()?;
    init_logging(&config)?;
    install_panic_hook();

    if config.kill {
        tracing::info!("killing running instance");
        let pid = signal_running_instance(&config.lock_file).inspect_err(|err| {
            tracing::error!("{err:#}");
        })?;
        tracing::debug!(pid, "sent SIGTERM");
        return Ok(());
    }

    let _instance = InstanceLock::acquire(&config.lock_file)?;
    install_shutdown_handlers()?;

    let (keypad, waker) = EvdevKeypad::open(&config.keypad_device)?;
    // Before the panel reserves its inline rows.
    println!("{}", config.usage_banner());
    let panel: Box<dyn Panel> = if config.headless {
        Box::new(HeadlessPanel)
    } else {
        Box::new(TerminalPanel::open()?)
    };

    let collab = Collaborators {
        gateway: Box::new(HttpGateway::new(config.gateway_credentials()?)),
        notifier: Box::new(WebhookNotifier::new(
            config.webhook_url.clone(),
            config.webhook_key.clone(),
        )),
        snapshots: Box::new(CommandSnapshotUploader::new(config.snapshot_settings()?)),
        panel,
        flag: Box::new(FlagFile::new(config.flag_file.clone())),
    };
    let reconciler = Reconciler::new(collab, config.reconciler_settings());
    let decoder = PinDecoder::new(config.pin_tokens());

    run_workers(keypad, waker, decoder, reconciler, shutdown_requested)
        .context("armpad stopped abnormally")
}
