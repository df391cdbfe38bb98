use std::path::Path;
use std::process::{Command, Output};
use std::time::Duration;

fn combined_output(output: &Output) -> String {
    let mut combined = String::new();
    combined.push_str(&String::from_utf8_lossy(&output.stdout));
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    combined
}

fn armpad_bin() -> &'static str {
    option_env!("CARGO_BIN_EXE_armpad").expect("armpad test binary not built")
}

fn armpad(dir: &Path) -> Command {
    let mut cmd = Command::new(armpad_bin());
    cmd.env_clear()
        .arg("--log-file")
        .arg(dir.join("armpad.log"))
        .arg("--lock-file")
        .arg(dir.join("armpad.lock"));
    cmd
}

#[test]
fn help_mentions_keypad() {
    let output = Command::new(armpad_bin())
        .arg("--help")
        .output()
        .expect("run armpad --help");
    assert!(output.status.success());
    let combined = combined_output(&output);
    assert!(combined.contains("armpad"));
    assert!(combined.contains("--kill"));
}

#[test]
fn invalid_cadence_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let output = armpad(dir.path())
        .args(["--gateway-url", "http://127.0.0.1:9"])
        .args(["--gateway-user", "u", "--gateway-password", "p"])
        .args(["--cadence-ms", "5"])
        .output()
        .expect("run armpad");
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("--cadence-ms"));
}

#[test]
fn missing_keypad_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let output = armpad(dir.path())
        .args(["--gateway-url", "http://127.0.0.1:9"])
        .args(["--gateway-user", "u", "--gateway-password", "p"])
        .arg("--keypad-device")
        .arg(dir.path().join("event-missing"))
        .args(["--headless", "--flag-file"])
        .arg(dir.path().join("arlo_armed"))
        .output()
        .expect("run armpad");
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("keypad device"));
    assert!(!dir.path().join("arlo_armed").exists());
    assert!(!dir.path().join("armpad.lock").exists());
}

#[test]
fn kill_without_running_instance_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = armpad(dir.path())
        .arg("--kill")
        .output()
        .expect("run armpad --kill");
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("running instance"));
}

#[test]
fn kill_signals_the_lock_holder() {
    let dir = tempfile::tempdir().unwrap();
    let lock_path = dir.path().join("armpad.lock");
    let lock = armpad::instance::InstanceLock::acquire(&lock_path).expect("hold lock");
    let mut victim = Command::new("sleep").arg("30").spawn().expect("spawn sleep");
    std::fs::write(&lock_path, victim.id().to_string()).unwrap();

    let output = armpad(dir.path())
        .arg("--kill")
        .output()
        .expect("run armpad --kill");
    assert!(output.status.success(), "{}", combined_output(&output));

    let mut stopped = false;
    for _ in 0..50 {
        if victim.try_wait().unwrap().is_some() {
            stopped = true;
            break;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    if !stopped {
        let _ = victim.kill();
    }
    drop(lock);
    assert!(stopped, "lock holder was not signalled");
}
