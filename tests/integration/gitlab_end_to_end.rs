use crate::fixtures::{self, NOW};

fn gitlab_cmd(extra: &[&str]) -> assert_cmd::Command {
  let mut cmd = test_support::cmd_bin("contrib-stats");
  cmd
    .envs(test_support::fixtures_env(&fixtures::gitlab()))
    .env("GITLAB_API_TOKEN", "glpat-test")
    .args(["--now-override", NOW, "gitlab", "--group", "acme", "--server", "https://gl.test"])
    .args(extra);
  cmd
}

#[test]
fn ledger_lines_for_group() {
  let out = gitlab_cmd(&["-s", "2024-03-01"]).output().unwrap();
  assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

  assert_eq!(
    String::from_utf8_lossy(&out.stdout),
    "Merge Requests/GL501/alice/3 [org=acme, board=webapp, linkId=7]\n\
     Reviewed Merge Requests/GL501/bob/3 [org=acme, board=webapp, linkId=7]\n\
     Closed Issues/GL900/bob/1 [org=acme, board=webapp, linkId=4]\n"
  );
}

#[test]
fn human_readable_summary() {
  test_support::init_insta();
  let out = gitlab_cmd(&["-s", "2024-03-01", "-r"]).output().unwrap();
  assert!(out.status.success());

  insta::assert_snapshot!(String::from_utf8_lossy(&out.stdout), @r"
  === Statistics for GitLab Group 'acme' ====

  == Merge Requests ==

  alice - 1 (3 points)
     webapp - Add caching layer (3)

  == Reviewed Merge Requests ==

  bob - 1 (3 points)
     webapp - Add caching layer (3)

  == Closed Issues ==

  bob - 1 (1 points)
     webapp - Crash on start
  ");
}

#[test]
fn username_and_points_grouping() {
  let out = gitlab_cmd(&["-s", "2024-03-01", "-u", "bob", "-g", "Engineering"]).output().unwrap();
  assert!(out.status.success());

  assert_eq!(
    String::from_utf8_lossy(&out.stdout),
    "Engineering/GL501/bob/3 [org=acme, board=webapp, linkId=7]\n\
     Engineering/GL900/bob/1 [org=acme, board=webapp, linkId=4]\n"
  );
}

#[test]
fn no_results_since_start_date() {
  let out = gitlab_cmd(&["-s", "2024-05-15"]).output().unwrap();
  assert!(out.status.success());
  assert_eq!(String::from_utf8_lossy(&out.stdout), "# No qualifying items found since 2024-05-15\n");
}

#[test]
fn repeated_runs_are_byte_identical() {
  let first = gitlab_cmd(&["-s", "2024-03-01"]).output().unwrap();
  let second = gitlab_cmd(&["-s", "2024-03-01"]).output().unwrap();
  assert_eq!(first.stdout, second.stdout);
}

#[test]
fn routes_can_come_from_a_file() {
  let dir = test_support::tempdir();
  let path = dir.path().join("routes.json");
  std::fs::write(&path, fixtures::gitlab().to_string()).unwrap();

  let mut cmd = test_support::cmd_bin("contrib-stats");
  let out = cmd
    .env("CONTRIB_STATS_HTTP_FIXTURES_FILE", &path)
    .env("GITLAB_API_TOKEN", "glpat-test")
    .args(["--now-override", NOW, "gitlab", "--group", "acme", "--server", "https://gl.test"])
    .args(["-s", "2024-03-01", "-u", "alice"])
    .output()
    .unwrap();

  assert!(out.status.success());
  assert_eq!(
    String::from_utf8_lossy(&out.stdout),
    "Merge Requests/GL501/alice/3 [org=acme, board=webapp, linkId=7]\n"
  );
}
