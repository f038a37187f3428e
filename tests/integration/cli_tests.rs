use assert_cmd::Command;
use predicates::prelude::*;

use super::fixture::TestFixture;
use crate::assert_command_success;

#[test]
fn init_writes_default_config_and_database() {
    let fixture = TestFixture::new("init_writes_default_config_and_database");

    let output = fixture.run_tsm(&["--json", "init"]);
    assert_command_success!(output);
    let json = output.json();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["data"]["config_written"], true);
    assert!(fixture.config_path.exists());
    assert!(fixture.db_path.exists());

    let config = std::fs::read_to_string(&fixture.config_path).unwrap();
    assert!(config.contains("[database]"));

    let again = fixture.run_tsm(&["--json", "init"]);
    assert_command_success!(again);
    assert_eq!(again.json()["data"]["config_written"], false);
}

#[test]
fn reject_then_resolve_through_cli() {
    let fixture = TestFixture::initialized("reject_then_resolve_through_cli");
    let id = fixture.create("O1", "T1", 555, 1);

    let rejected = fixture.run_tsm(&[
        "--json", "--actor", "12", "reject", "draw", "--order", "O1", "--test", "T1", "--reason",
        "clotted",
    ]);
    assert_command_success!(rejected);
    let json = rejected.json();
    let data = &json["data"];
    assert_eq!(data["id"], id);
    assert_eq!(data["isRejected"], true);
    assert_eq!(data["recollectionPending"], true);
    assert_eq!(data["rejectionReason"], "clotted");
    assert_eq!(data["updatedBy"], 12);

    let pending = fixture.run_tsm(&["--json", "check", "pending", "--order", "O1"]);
    assert_command_success!(pending);
    assert_eq!(pending.json()["data"]["result"], true);

    let resolved = fixture.run_tsm(&["--json", "resolve", "--order", "O1", "--test", "T1"]);
    assert_command_success!(resolved);
    assert_eq!(resolved.json()["data"]["cleared"][0], id);

    let pending = fixture.run_tsm(&["--json", "check", "pending", "--order", "O1"]);
    assert_eq!(pending.json()["data"]["result"], false);

    let conn = fixture.open_db();
    let (rejected, pending): (bool, bool) = conn
        .query_row(
            "SELECT is_rejected, recollection_pending FROM test_sample_mapping WHERE id = ?1",
            [id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert!(rejected);
    assert!(!pending);
}

#[test]
fn missing_mapping_reports_structured_not_found() {
    let fixture = TestFixture::initialized("missing_mapping_reports_structured_not_found");

    let output = fixture.run_tsm(&["--json", "show", "42"]);
    assert!(!output.success);
    let json = output.json();
    let error = &json["status"]["error"];
    assert_eq!(error["code"], "MAPPING_NOT_FOUND");
    assert_eq!(error["http_status"], 404);
}

#[test]
fn delete_without_ids_is_a_noop() {
    let fixture = TestFixture::initialized("delete_without_ids_is_a_noop");
    fixture.create("O1", "T1", 555, 1);

    let output = fixture.run_tsm(&["--json", "delete", "ids"]);
    assert_command_success!(output);
    assert_eq!(output.json()["data"]["outcome"], "no_op");

    let listed = fixture.run_tsm(&["--json", "list", "--order", "O1"]);
    assert_eq!(listed.json()["data"].as_array().map(Vec::len), Some(1));
}

#[test]
fn deleted_mapping_only_listed_with_history() {
    let fixture = TestFixture::initialized("deleted_mapping_only_listed_with_history");
    let id = fixture.create("O1", "T1", 555, 1);

    let deleted = fixture.run_tsm(&["--json", "delete", "tests", "T1"]);
    assert_command_success!(deleted);
    assert_eq!(deleted.json()["data"]["rows"], 1);

    let active = fixture.run_tsm(&["--json", "list", "--order", "O1"]);
    assert_eq!(active.json()["data"].as_array().map(Vec::len), Some(0));

    let history = fixture.run_tsm(&[
        "--json",
        "list",
        "--order",
        "O1",
        "--test",
        "T1",
        "--include-deleted",
    ]);
    assert_command_success!(history);
    let rows = history.json()["data"].clone();
    assert_eq!(rows[0]["id"], id);
    assert!(rows[0]["deletedAt"].is_string());
}

#[test]
fn human_output_names_state() {
    let fixture = TestFixture::initialized("human_output_names_state");
    let id = fixture.create("O1", "T1", 555, 1);

    Command::cargo_bin("tsm")
        .unwrap()
        .env("TSM_ROOT", &fixture.tsm_root)
        .env("HOME", &fixture.home)
        .env("XDG_CONFIG_HOME", fixture.home.join(".config"))
        .env("NO_COLOR", "1")
        .args(["show", &id.to_string()])
        .assert()
        .success()
        .stdout(predicate::str::contains("State: active"))
        .stdout(predicate::str::contains("Order: O1"));
}

#[test]
fn empty_reason_is_rejected_before_storage() {
    let fixture = TestFixture::initialized("empty_reason_is_rejected_before_storage");
    fixture.create("O1", "T1", 555, 1);

    Command::cargo_bin("tsm")
        .unwrap()
        .env("TSM_ROOT", &fixture.tsm_root)
        .env("HOME", &fixture.home)
        .env("XDG_CONFIG_HOME", fixture.home.join(".config"))
        .env("NO_COLOR", "1")
        .args(["reject", "draw", "--order", "O1", "--test", "T1", "--reason", "  "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E801"));
}

#[test]
fn list_history_flag_requires_test_filter() {
    Command::cargo_bin("tsm")
        .unwrap()
        .args(["list", "--order", "O1", "--include-deleted"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--test"));
}

#[test]
fn quiet_flag_silences_human_output_only() {
    let fixture = TestFixture::initialized("quiet_flag_silences_human_output_only");
    let id = fixture.create("O1", "T1", 555, 1);

    let shown = fixture.run_tsm(&["-q", "show", &id.to_string()]);
    assert_command_success!(shown);
    assert!(shown.stdout.trim().is_empty(), "stdout: {}", shown.stdout);

    let rejected = fixture.run_tsm(&[
        "-q", "reject", "draw", "--order", "O1", "--test", "T1", "--reason", "haemolysed",
    ]);
    assert_command_success!(rejected);
    assert!(rejected.stdout.trim().is_empty(), "stdout: {}", rejected.stdout);

    let envelope = fixture.run_tsm(&["-q", "--json", "show", &id.to_string()]);
    assert_command_success!(envelope);
    let json = envelope.json();
    assert_eq!(json["data"]["rejectionReason"], "haemolysed");

    let missing = fixture.run_tsm(&["-q", "show", "4242"]);
    assert!(!missing.success);
    assert!(!missing.stderr.trim().is_empty());
}
