use super::defaults::{MAX_PIN_DIGITS, MAX_TOKEN_CHARS};
use super::{AppConfig, MAX_CADENCE_MS, MIN_CADENCE_MS};
use crate::gateway::GatewayCredentials;
use crate::health::SysfsHealth;
use crate::keypad::{PinTokens, ENTER_TOKEN};
use crate::reconciler::ReconcilerSettings;
use crate::snapshot::{SnapshotSettings, FILE_PLACEHOLDER};
use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use std::time::Duration;

impl AppConfig {
    /// Parse CLI arguments and validate them right away.
    pub fn parse_args() -> Result<Self> {
        let mut config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Check CLI values and normalize URLs. `--kill` needs none of the run options.
    pub fn validate(&mut self) -> Result<()> {
        if self.kill {
            return Ok(());
        }

        if self.pin.is_empty()
            || self.pin.len() > MAX_PIN_DIGITS
            || !self.pin.chars().all(|ch| ch.is_ascii_digit())
        {
            bail!("--pin must be 1 to {MAX_PIN_DIGITS} digits");
        }
        validate_token(&self.quit_token, "--quit-token")?;
        validate_token(&self.refresh_token, "--refresh-token")?;
        if self.quit_token == self.refresh_token {
            bail!("--quit-token and --refresh-token must differ");
        }
        if self.pin == self.quit_token || self.pin == self.refresh_token {
            bail!("--pin must not match a reserved control token");
        }

        if !(MIN_CADENCE_MS..=MAX_CADENCE_MS).contains(&self.cadence_ms) {
            bail!(
                "--cadence-ms must be between {MIN_CADENCE_MS} and {MAX_CADENCE_MS}, got {}",
                self.cadence_ms
            );
        }

        let Some(gateway_url) = self.gateway_url.as_deref() else {
            bail!("--gateway-url is required");
        };
        self.gateway_url = Some(normalize_url(gateway_url, "--gateway-url")?);
        if self.gateway_user.as_deref().map_or(true, str::is_empty) {
            bail!("--gateway-user is required");
        }
        if self.gateway_password.as_deref().map_or(true, str::is_empty) {
            bail!("--gateway-password is required");
        }

        self.webhook_url = normalize_url(&self.webhook_url, "--webhook-url")?;
        if let Some(url) = self.upload_url.as_deref() {
            self.upload_url = Some(normalize_url(url, "--upload-url")?);
        }
        if let Some(url) = self.public_url.as_deref() {
            self.public_url = Some(normalize_url(url, "--public-url")?);
        }

        let argv = capture_argv(&self.capture_cmd)?;
        if !argv.iter().any(|arg| arg.contains(FILE_PLACEHOLDER)) {
            bail!("--capture-cmd must contain the {FILE_PLACEHOLDER} placeholder");
        }

        Ok(())
    }

    pub fn pin_tokens(&self) -> PinTokens {
        PinTokens {
            secret: self.pin.clone(),
            quit: self.quit_token.clone(),
            refresh: self.refresh_token.clone(),
        }
    }

    pub fn reconciler_settings(&self) -> ReconcilerSettings {
        ReconcilerSettings {
            cadence: Duration::from_millis(self.cadence_ms),
            reconnect_on_unavailable: !self.no_reconnect,
            health: self.debug.then(SysfsHealth::default),
        }
    }

    pub fn gateway_credentials(&self) -> Result<GatewayCredentials> {
        Ok(GatewayCredentials {
            base_url: self
                .gateway_url
                .clone()
                .ok_or_else(|| anyhow!("--gateway-url is required"))?,
            user: self.gateway_user.clone().unwrap_or_default(),
            password: self.gateway_password.clone().unwrap_or_default(),
        })
    }

    pub fn snapshot_settings(&self) -> Result<SnapshotSettings> {
        Ok(SnapshotSettings {
            capture_argv: capture_argv(&self.capture_cmd)?,
            scratch_dir: self.snapshot_dir.clone(),
            upload_url: self.upload_url.clone(),
            public_url: self.public_url.clone(),
        })
    }

    /// Usage line printed once the workers are up.
    pub fn usage_banner(&self) -> String {
        format!(
            "Input PIN then <Enter> to arm/disarm; '{}' then <Enter> to quit; '{}' then <Enter> to force refresh",
            self.quit_token, self.refresh_token
        )
    }
}

fn validate_token(token: &str, flag: &str) -> Result<()> {
    if token.is_empty() || token.len() > MAX_TOKEN_CHARS {
        bail!("{flag} must be 1 to {MAX_TOKEN_CHARS} characters");
    }
    if !token
        .chars()
        .all(|ch| ch.is_ascii_uppercase() || ch.is_ascii_digit())
    {
        bail!("{flag} must use keypad key names (A-Z, 0-9), got '{token}'");
    }
    if token.contains(ENTER_TOKEN) {
        bail!("{flag} cannot contain {ENTER_TOKEN}");
    }
    Ok(())
}

pub(super) fn normalize_url(value: &str, flag: &str) -> Result<String> {
    let trimmed = value.trim();
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        bail!("{flag} must be an http:// or https:// URL, got '{trimmed}'");
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

pub(super) fn capture_argv(command: &str) -> Result<Vec<String>> {
    let argv = shell_words::split(command)
        .with_context(|| format!("--capture-cmd is not a valid command line: {command}"))?;
    if argv.is_empty() {
        bail!("--capture-cmd cannot be empty");
    }
    Ok(argv)
}
