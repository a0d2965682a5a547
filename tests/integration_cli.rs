//! Integration tests for the modmirror binary surface.
//!
//! These exercise argument parsing, configuration management, and the error
//! paths that do not require a go toolchain or a live registry.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn modmirror() -> Command {
    Command::cargo_bin("modmirror").expect("binary builds")
}

#[test]
fn help_lists_commands() {
    modmirror()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("mirror"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn version_flag_works() {
    modmirror()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("modmirror"));
}

#[test]
fn mirror_without_registry_config_fails_with_suggestion() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("config.toml");

    modmirror()
        .args(["--config", config.to_str().unwrap(), "mirror", "--repo", "go-local"])
        .current_dir(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("no registry URL configured"))
        .stderr(predicate::str::contains("set-registry"));
}

#[test]
fn config_set_and_show_roundtrip() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("config.toml");
    let config_arg = config.to_str().unwrap();

    modmirror()
        .args(["--config", config_arg, "config", "set-registry", "https://r.example/api/go"])
        .assert()
        .success();
    modmirror()
        .args(["--config", config_arg, "config", "set-repo", "go-local"])
        .assert()
        .success();
    modmirror()
        .args(["--config", config_arg, "config", "set-token", "secret", "--username", "bot"])
        .assert()
        .success();

    modmirror()
        .args(["--config", config_arg, "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("https://r.example/api/go"))
        .stdout(predicate::str::contains("go-local"))
        .stdout(predicate::str::contains("bot"))
        // The token value never appears in output.
        .stdout(predicate::str::contains("secret").not())
        .stdout(predicate::str::contains("********"));
}

#[test]
fn config_show_with_no_file_shows_unset() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("missing.toml");

    modmirror()
        .args(["--config", config.to_str().unwrap(), "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(unset)"));
}

#[test]
fn unknown_subcommand_fails() {
    modmirror().arg("frobnicate").assert().failure();
}
