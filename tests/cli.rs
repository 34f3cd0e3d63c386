use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn bursar(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("bursar").unwrap();
    cmd.env("HOME", home.path())
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG");
    cmd
}

fn setup() -> TempDir {
    let home = TempDir::new().unwrap();
    let data_dir = home.path().join("data");
    bursar(&home)
        .args(["init", "--data-dir", data_dir.to_str().unwrap(), "--school-id", "north", "--session", "2024-25"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized bursar"));

    bursar(&home)
        .args(["students", "add", "S1", "--name", "Asha Rao", "--class", "VI"])
        .assert()
        .success();
    bursar(&home)
        .args(["fees", "add", "--type", "tuition", "--class", "VI", "--month", "April", "--amount", "2000"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added Tuition"));
    bursar(&home)
        .args(["fees", "add", "--type", "tuition", "--class", "VI", "--month", "May", "--amount", "2000"])
        .assert()
        .success();
    bursar(&home)
        .args(["fees", "add", "--type", "transport", "--class", "VI", "--month", "April", "--dynamic"])
        .assert()
        .success();
    bursar(&home)
        .args(["transport", "add-vehicle", "KA01-1234", "--route", "North loop", "--price", "1200"])
        .assert()
        .success();
    bursar(&home)
        .args(["transport", "assign", "KA01-1234", "S1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 assigned"));
    home
}

fn receipt_no(stdout: &[u8]) -> String {
    String::from_utf8_lossy(stdout)
        .split_whitespace()
        .find(|w| w.starts_with("RC-"))
        .map(str::to_string)
        .unwrap()
}

#[test]
fn test_commands_require_init() {
    let home = TempDir::new().unwrap();
    bursar(&home)
        .args(["dues", "S1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("bursar init"));
}

#[test]
fn test_deposit_then_recommit() {
    let home = setup();

    let out = bursar(&home)
        .args(["deposit", "S1", "--months", "April", "--today", "2024-04-10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved receipt"))
        .stdout(predicate::str::contains("3,200.00"))
        .get_output()
        .stdout
        .clone();
    let receipt = receipt_no(&out);

    bursar(&home)
        .args(["deposit", "S1", "--months", "April", "--today", "2024-04-12"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already paid"))
        .stdout(predicate::str::contains("Saved receipt").not());

    bursar(&home)
        .args(["dues", "S1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Paid:  April"));

    let export = home.path().join("receipt.json");
    bursar(&home)
        .args(["receipt", &receipt, "--output", export.to_str().unwrap()])
        .assert()
        .success();
    let json = std::fs::read_to_string(&export).unwrap();
    assert!(json.contains(&receipt));
    assert!(json.contains("\"school_id\": \"north\""));
}

#[test]
fn test_dry_run_saves_nothing() {
    let home = setup();

    bursar(&home)
        .args(["deposit", "S1", "--months", "April,May", "--today", "2024-04-10", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("5,200.00"))
        .stdout(predicate::str::contains("Dry run"));

    bursar(&home)
        .args(["dues", "S1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Paid:  (none)"));
}

#[test]
fn test_unknown_student_fails() {
    let home = setup();
    bursar(&home)
        .args(["deposit", "S9", "--months", "April", "--today", "2024-04-10"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}
