use predicates::prelude::*;
use serde_json::json;

use crate::fixtures::NOW;

fn single_error_line(stderr: &[u8]) -> String {
  let text = String::from_utf8_lossy(stderr).to_string();
  let lines: Vec<&str> = text.lines().collect();
  assert_eq!(lines.len(), 1, "expected one stderr line, got: {text}");
  assert!(lines[0].starts_with("error: "), "{text}");
  text
}

#[test]
fn missing_credential_fails_before_any_request() {
  let mut cmd = test_support::cmd_bin("contrib-stats");
  let out = cmd.args(["gitlab", "--group", "acme"]).output().unwrap();

  assert_eq!(out.status.code(), Some(1));
  assert!(out.stdout.is_empty());
  let err = single_error_line(&out.stderr);
  assert!(err.contains("GITLAB_API_TOKEN"), "{err}");
}

#[test]
fn missing_subcommand_is_a_configuration_error() {
  let mut cmd = test_support::cmd_bin("contrib-stats");
  cmd
    .assert()
    .code(1)
    .stderr(predicate::str::starts_with("error: ").and(predicate::str::contains("a platform subcommand is required")));
}

#[test]
fn missing_required_flag_prints_one_line() {
  let mut cmd = test_support::cmd_bin("contrib-stats");
  let out = cmd.args(["trello"]).output().unwrap();

  assert_eq!(out.status.code(), Some(1));
  let err = single_error_line(&out.stderr);
  assert!(err.contains("--org"), "{err}");
}

#[test]
fn bad_start_date_is_rejected() {
  let mut cmd = test_support::cmd_bin("contrib-stats");
  let out = cmd.args(["-s", "last tuesday", "gchat"]).output().unwrap();

  assert_eq!(out.status.code(), Some(1));
  single_error_line(&out.stderr);
}

#[test]
fn bad_matcher_regex_is_rejected() {
  let mut cmd = test_support::cmd_bin("contrib-stats");
  let out = cmd.args(["-m", "(unclosed", "gitlab", "--group", "acme"]).output().unwrap();

  assert_eq!(out.status.code(), Some(1));
  single_error_line(&out.stderr);
}

#[test]
fn unknown_group_exits_nonzero() {
  let mut cmd = test_support::cmd_bin("contrib-stats");
  let out = cmd
    .envs(test_support::fixtures_env(&json!({})))
    .env("GITLAB_API_TOKEN", "glpat-test")
    .args(["--now-override", NOW, "gitlab", "--group", "ghost", "--server", "https://gl.test"])
    .output()
    .unwrap();

  assert_eq!(out.status.code(), Some(1));
  assert!(out.stdout.is_empty());
  let err = single_error_line(&out.stderr);
  assert!(err.contains("unable to locate group 'ghost'"), "{err}");
}

#[test]
fn server_errors_abort_without_partial_output() {
  let routes = json!({
    "https://gl.test/api/v4/groups/acme": { "body": { "id": 10, "name": "acme", "full_path": "acme" } },
    "https://gl.test/api/v4/groups/10/merge_requests": { "status": 502, "body": { "message": "bad gateway" } }
  });

  let mut cmd = test_support::cmd_bin("contrib-stats");
  let out = cmd
    .envs(test_support::fixtures_env(&routes))
    .env("GITLAB_API_TOKEN", "glpat-test")
    .args(["--now-override", NOW, "gitlab", "--group", "acme", "--server", "https://gl.test"])
    .output()
    .unwrap();

  assert_eq!(out.status.code(), Some(1));
  assert!(out.stdout.is_empty());
  single_error_line(&out.stderr);
}
