use super::validation::{capture_argv, normalize_url};
use super::{AppConfig, DEFAULT_CADENCE_MS, DEFAULT_PIN};
use clap::{CommandFactory, Parser};
use std::path::Path;
use std::time::Duration;

const GATEWAY: [&str; 6] = [
    "--gateway-url",
    "https://base.example/api/",
    "--gateway-user",
    "me@example.com",
    "--gateway-password",
    "hunter2",
];

fn parse(extra: &[&str]) -> AppConfig {
    let mut args = vec!["test-app"];
    args.extend_from_slice(&GATEWAY);
    args.extend_from_slice(extra);
    AppConfig::parse_from(args)
}

#[test]
fn defaults_validate() {
    let mut cfg = parse(&[]);
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.pin, DEFAULT_PIN);
    assert_eq!(cfg.cadence_ms, DEFAULT_CADENCE_MS);
    assert_eq!(cfg.keypad_device, Path::new("/dev/input/event0"));
    assert_eq!(cfg.gateway_url.as_deref(), Some("https://base.example/api"));
    assert!(!cfg.debug);
}

#[test]
fn short_flags_parse() {
    let cfg = AppConfig::parse_from(["test-app", "-d", "-k"]);
    assert!(cfg.debug);
    assert!(cfg.kill);
}

#[test]
fn kill_mode_skips_run_checks() {
    let mut cfg = AppConfig::parse_from(["test-app", "--kill", "--cadence-ms", "1"]);
    assert!(cfg.validate().is_ok());
}

#[test]
fn gateway_url_is_required_to_run() {
    let mut cfg = AppConfig::parse_from(["test-app"]);
    let err = cfg.validate().expect_err("missing gateway rejected");
    assert!(err.to_string().contains("--gateway-url"));
}

#[test]
fn gateway_account_is_required_to_run() {
    let mut cfg = AppConfig::parse_from(["test-app", "--gateway-url", "http://base"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_non_digit_or_empty_pin() {
    for pin in ["", "12a4", "12345678901234567"] {
        let mut cfg = parse(&["--pin", pin]);
        assert!(cfg.validate().is_err(), "pin {pin:?} accepted");
    }
}

#[test]
fn rejects_colliding_tokens() {
    let mut cfg = parse(&["--quit-token", "DOT"]);
    assert!(cfg.validate().is_err());

    let mut cfg = parse(&["--pin", "99", "--refresh-token", "99"]);
    assert!(cfg.validate().is_err());

    let mut cfg = parse(&["--quit-token", "KPENTER"]);
    assert!(cfg.validate().is_err());

    let mut cfg = parse(&["--quit-token", "slash"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn accepts_alternate_control_tokens() {
    let mut cfg = parse(&["--quit-token", "ASTERISK", "--refresh-token", "SLASH"]);
    assert!(cfg.validate().is_ok());
    let tokens = cfg.pin_tokens();
    assert_eq!(tokens.quit, "ASTERISK");
    assert_eq!(tokens.refresh, "SLASH");
    assert!(cfg.usage_banner().contains("'ASTERISK'"));
}

#[test]
fn rejects_cadence_out_of_bounds() {
    let mut cfg = parse(&["--cadence-ms", "99"]);
    assert!(cfg.validate().is_err());
    let mut cfg = parse(&["--cadence-ms", "60001"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn accepts_cadence_bounds() {
    let mut cfg = parse(&["--cadence-ms", "100"]);
    assert!(cfg.validate().is_ok());
    let mut cfg = parse(&["--cadence-ms", "60000"]);
    assert!(cfg.validate().is_ok());
    assert_eq!(
        cfg.reconciler_settings().cadence,
        Duration::from_millis(60_000)
    );
}

#[test]
fn no_reconnect_flag_selects_the_variant() {
    let cfg = parse(&[]);
    assert!(cfg.reconciler_settings().reconnect_on_unavailable);
    let cfg = parse(&["--no-reconnect"]);
    assert!(!cfg.reconciler_settings().reconnect_on_unavailable);
}

#[test]
fn board_health_is_logged_only_in_debug() {
    assert!(parse(&[]).reconciler_settings().health.is_none());
    assert!(parse(&["--debug"]).reconciler_settings().health.is_some());
}

#[test]
fn capture_command_needs_placeholder() {
    let mut cfg = parse(&["--capture-cmd", "raspistill -o /tmp/x.jpg"]);
    assert!(cfg.validate().is_err());
    let mut cfg = parse(&["--capture-cmd", "raspistill -rot 270 -o '{file}'"]);
    assert!(cfg.validate().is_ok());
    let settings = cfg.snapshot_settings().unwrap();
    assert_eq!(
        settings.capture_argv,
        vec!["raspistill", "-rot", "270", "-o", "{file}"]
    );
}

#[test]
fn capture_command_must_split() {
    assert!(capture_argv("cam -o '{file}").is_err());
    assert!(capture_argv("   ").is_err());
}

#[test]
fn urls_must_be_http() {
    assert!(normalize_url("ftp://host/www", "--upload-url").is_err());
    assert_eq!(
        normalize_url(" https://host/snaps/ ", "--upload-url").unwrap(),
        "https://host/snaps"
    );
    let mut cfg = parse(&["--upload-url", "ftp://host"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn gateway_credentials_carry_account() {
    let mut cfg = parse(&[]);
    cfg.validate().unwrap();
    let creds = cfg.gateway_credentials().unwrap();
    assert_eq!(creds.base_url, "https://base.example/api");
    assert_eq!(creds.user, "me@example.com");
    assert_eq!(creds.password, "hunter2");
}

#[test]
fn capture_help_explains_rotation() {
    let command = AppConfig::command();
    let help = command
        .get_arguments()
        .find(|arg| arg.get_id() == "capture_cmd")
        .and_then(|arg| arg.get_help())
        .map(|help| help.to_string())
        .unwrap_or_default();
    assert!(help.contains("{file}"));
    assert!(help.contains("-rot 270"));
}
