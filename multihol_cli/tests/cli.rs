use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const BIB: &str = "990006489880203339";
const TARGET: &str = "22312549980003339";

/// A `multihol` command isolated from the user's config and credentials
fn multihol(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("multihol").unwrap();
    cmd.env("XDG_CONFIG_HOME", home.path().join("config"))
        .env(
            "MULTIHOL_CREDENTIAL_STORE_DIR",
            home.path().join("credentials"),
        )
        .env_remove("MULTIHOL_API_KEY")
        .env_remove("MULTIHOL_MOVES__MAX_CREATE_ATTEMPTS");
    cmd
}

#[test]
fn test_version() {
    let mut cmd = Command::cargo_bin("multihol").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_help_lists_commands() {
    let mut cmd = Command::cargo_bin("multihol").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("migrate"))
        .stdout(predicate::str::contains("auth"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_migrate_rejects_malformed_bib_id() {
    let home = TempDir::new().unwrap();
    multihol(&home)
        .args(["migrate", "123", TARGET])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must start with '99'"));
}

#[test]
fn test_migrate_rejects_malformed_holding_id() {
    let home = TempDir::new().unwrap();
    multihol(&home)
        .args(["migrate", BIB, "33312549980003339"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must start with '22'"));
}

#[test]
fn test_migrate_without_ids_needs_terminal() {
    let home = TempDir::new().unwrap();
    multihol(&home)
        .arg("migrate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("required when not running in a terminal"));
}

#[test]
fn test_migrate_without_api_key() {
    let home = TempDir::new().unwrap();
    multihol(&home)
        .args(["migrate", BIB, TARGET, "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No API key for bib-sandbox"));
}

#[test]
fn test_auth_set_key_from_stdin_and_status() {
    let home = TempDir::new().unwrap();

    multihol(&home)
        .args(["auth", "set-key"])
        .write_stdin("  l8xx0123456789abcdef  \n")
        .assert()
        .success()
        .stderr(predicate::str::contains("API key stored for bib-sandbox"));

    multihol(&home)
        .args(["auth", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("bib-sandbox (active)"))
        .stdout(predicate::str::contains("l8xx").not());
}

#[test]
fn test_auth_set_key_rejects_blank_input() {
    let home = TempDir::new().unwrap();
    multihol(&home)
        .args(["auth", "set-key", "--account", "production"])
        .write_stdin("   \n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("must not be empty"));
}

#[test]
fn test_auth_remove_missing_key() {
    let home = TempDir::new().unwrap();
    multihol(&home)
        .args(["auth", "remove"])
        .assert()
        .success()
        .stderr(predicate::str::contains("No API key stored for bib-sandbox"));
}

#[test]
fn test_config_set_then_get() {
    let home = TempDir::new().unwrap();

    multihol(&home)
        .args(["config", "set", "moves.max_create_attempts", "3"])
        .assert()
        .success();

    multihol(&home)
        .args(["config", "get", "moves.max_create_attempts"])
        .assert()
        .success()
        .stdout("3\n");

    let config_file = home.path().join("config").join("multihol").join("config.toml");
    let content = std::fs::read_to_string(config_file).unwrap();
    assert!(content.contains("max_create_attempts = 3"));
}

#[test]
fn test_config_set_rejects_zero_attempts() {
    let home = TempDir::new().unwrap();
    multihol(&home)
        .args(["config", "set", "moves.max_create_attempts", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least 1"));
}

#[test]
fn test_config_get_default_error_codes() {
    let home = TempDir::new().unwrap();
    multihol(&home)
        .args(["config", "get", "catalog.error_codes.barcode_conflict"])
        .assert()
        .success()
        .stdout("401873\n");
}

#[test]
fn test_config_path_uses_config_home() {
    let home = TempDir::new().unwrap();
    multihol(&home)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("multihol"))
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_completions_bash() {
    let mut cmd = Command::cargo_bin("multihol").unwrap();
    cmd.args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("multihol"));
}
