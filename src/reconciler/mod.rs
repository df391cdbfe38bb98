//! Status reconciler: the loop that mirrors the base station, applies keypad commands,
//! fires side effects, and keeps the panel current.
//!
//! # Cycle
//!
//! 1. Poll the gateway. Anything but a confirmed state leaves the mirror untouched and
//!    (optionally) kicks off a reconnect.
//! 2. Persist the mirrored state to the flag sink.
//! 3. Notify once per observed transition between confirmed states.
//! 4. Wait up to the rest of the cadence window for one command.
//! 5. Apply it.
//! 6. Render if anything asked for it.
//! 7. In debug mode, log board health.
//! 8. Sleep out the remainder of the window.
//!
//! Remote calls have no timeout of their own; a slow gateway stretches the cycle.


use crate::display::{render_frame, Panel};
use crate::flag::FlagSink;
use crate::gateway::RemoteGateway;
use crate::health::SysfsHealth;
use crate::keypad::KeypadWake;
use crate::notify::Notifier;
use crate::snapshot::SnapshotUploader;
use crate::state::{ArmPoll, ArmState, Command, DisplayState, Notification};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

/// Everything the reconciler talks to.
pub struct Collaborators {
    pub gateway: Box<dyn RemoteGateway>,
    pub notifier: Box<dyn Notifier>,
    pub snapshots: Box<dyn SnapshotUploader>,
    pub panel: Box<dyn Panel>,
    pub flag: Box<dyn FlagSink>,
}

#[derive(Debug, Clone)]
pub struct ReconcilerSettings {
    /// Minimum length of one cycle.
    pub cadence: Duration,
    /// Start a reconnect whenever a poll comes back without a state.
    pub reconnect_on_unavailable: bool,
    /// Log memory and temperature every cycle.
    pub health: Option<SysfsHealth>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    Continue,
    Quit,
}

pub struct Reconciler {
    collab: Collaborators,
    settings: ReconcilerSettings,
    confirmed: ArmState,
    rendered: ArmState,
    refresh_pending: bool,
    wrong_code_pending: bool,
    overlay_on_screen: bool,
    input_closed: bool,
}

impl Reconciler {
    pub fn new(collab: Collaborators, settings: ReconcilerSettings) -> Self {
        Self {
            collab,
            settings,
            confirmed: ArmState::Unknown,
            rendered: ArmState::Unknown,
            refresh_pending: false,
            wrong_code_pending: false,
            overlay_on_screen: false,
            input_closed: false,
        }
    }

    /// Last confirmed arm state.
    pub fn arm_state(&self) -> ArmState {
        self.confirmed
    }

    /// Show the wait screen and open the gateway session.
    pub fn start(&mut self) {
        self.push_frame(DisplayState::Waiting);
        if let Err(err) = self.collab.gateway.connect() {
            tracing::error!("initial gateway connection failed: {err}");
            self.collab.gateway.begin_reconnect();
        }
    }

    /// Run cycles until Quit or `stop_requested`, then wake the keypad reader.
    pub fn run<W, F>(mut self, commands: Receiver<Command>, keypad: W, stop_requested: F)
    where
        W: KeypadWake,
        F: Fn() -> bool,
    {
        self.start();
        loop {
            if stop_requested() {
                tracing::info!("shutdown signal received");
                break;
            }
            if self.run_cycle(&commands) == CycleOutcome::Quit {
                break;
            }
        }
        keypad.wake();
        tracing::info!("reconciler stopped");
    }

    /// One full cycle, including the wait for a command and the cadence top-up.
    pub fn run_cycle(&mut self, commands: &Receiver<Command>) -> CycleOutcome {
        let deadline = Instant::now() + self.settings.cadence;
        self.poll_and_persist();
        self.detect_change();

        if let Some(command) = self.next_command(commands, deadline) {
            if self.apply(command) == CycleOutcome::Quit {
                return CycleOutcome::Quit;
            }
        }

        self.render_if_pending();
        self.log_health();

        let remaining = deadline.saturating_duration_since(Instant::now());
        if !remaining.is_zero() {
            thread::sleep(remaining);
        }
        CycleOutcome::Continue
    }

    fn poll_and_persist(&mut self) {
        let poll = match self.collab.gateway.arm_state() {
            Ok(poll) => poll,
            Err(err) => {
                tracing::error!("could not get arm state: {err}");
                ArmPoll::Unavailable
            }
        };
        tracing::debug!(?poll, "gateway polled");
        match poll.confirmed() {
            Some(state) => self.confirmed = state,
            None => {
                tracing::error!("arm state unavailable; keeping {}", self.confirmed);
                if self.settings.reconnect_on_unavailable {
                    self.collab.gateway.begin_reconnect();
                }
            }
        }
        if let Err(err) = self.collab.flag.write(self.confirmed) {
            tracing::warn!("could not write arm flag: {err}");
        }
    }

    fn detect_change(&mut self) {
        if self.overlay_on_screen {
            self.refresh_pending = true;
        }
        if self.confirmed == self.rendered {
            return;
        }
        self.refresh_pending = true;
        if !self.rendered.is_confirmed() {
            return;
        }
        if let Some(notification) = Notification::for_transition(self.confirmed) {
            tracing::info!("arm state changed to {}", self.confirmed);
            self.notify(&notification);
        }
    }

    fn next_command(&mut self, commands: &Receiver<Command>, deadline: Instant) -> Option<Command> {
        if self.input_closed {
            return None;
        }
        let wait = deadline.saturating_duration_since(Instant::now());
        match commands.recv_timeout(wait) {
            Ok(command) => Some(command),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                tracing::warn!("keypad input closed; continuing to monitor only");
                self.input_closed = true;
                None
            }
        }
    }

    /// Apply one command. Only Quit ends the loop.
    pub fn apply(&mut self, command: Command) -> CycleOutcome {
        match command {
            Command::Right => {
                tracing::info!("correct PIN entered");
                self.toggle_remote();
                self.refresh_pending = true;
            }
            Command::WrongCode => {
                tracing::error!("wrong PIN entered");
                match self.collab.snapshots.capture_and_upload() {
                    Ok(snapshot_url) => {
                        self.notify(&Notification::WrongCode { snapshot_url });
                    }
                    Err(err) => tracing::error!("could not take and upload snap: {err}"),
                }
                self.wrong_code_pending = true;
                self.refresh_pending = true;
            }
            Command::Refresh => {
                tracing::info!("force refresh");
                self.refresh_pending = true;
            }
            Command::Quit => {
                tracing::info!("quit");
                return CycleOutcome::Quit;
            }
        }
        CycleOutcome::Continue
    }

    fn toggle_remote(&mut self) {
        let result = match self.confirmed {
            ArmState::Armed => self.collab.gateway.disarm(),
            ArmState::Disarmed => self.collab.gateway.arm(),
            ArmState::Unknown => {
                tracing::warn!("arm state not confirmed yet; ignoring toggle");
                return;
            }
        };
        if let Err(err) = result {
            tracing::error!("could not arm/disarm: {err}");
        }
    }

    fn render_if_pending(&mut self) {
        if !self.refresh_pending {
            return;
        }
        let wrong_code = std::mem::take(&mut self.wrong_code_pending);
        self.push_frame(DisplayState::derive(self.confirmed, wrong_code));
        self.overlay_on_screen = wrong_code;
        self.rendered = self.confirmed;
        self.refresh_pending = false;
    }

    fn log_health(&self) {
        let Some(health) = &self.settings.health else {
            return;
        };
        let reading = health.read();
        tracing::debug!(
            mem_available_kib = ?reading.mem_available_kib,
            cpu_temp_c = ?reading.cpu_temp_c,
            "board health"
        );
    }

    fn push_frame(&mut self, state: DisplayState) {
        tracing::debug!(?state, "rendering");
        if let Err(err) = self.collab.panel.push(&render_frame(state)) {
            tracing::error!("could not update panel: {err:#}");
        }
    }

    fn notify(&mut self, notification: &Notification) {
        if let Err(err) = self.collab.notifier.send(notification) {
            tracing::warn!(
                event = notification.event_name(),
                "notification failed: {err:#}"
            );
        }
    }
}
