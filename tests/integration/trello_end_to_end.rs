use crate::fixtures::{self, NOW};

fn trello_cmd(extra: &[&str]) -> assert_cmd::Command {
  let mut cmd = test_support::cmd_bin("contrib-stats");
  cmd
    .envs(test_support::fixtures_env(&fixtures::trello()))
    .env("TRELLO_API_KEY", "key")
    .env("TRELLO_API_TOKEN", "token")
    .args(["--now-override", NOW, "trello", "--org", "acme", "--api-url", "https://trello.test"])
    .args(extra);
  cmd
}

#[test]
fn every_card_member_is_credited() {
  let out = trello_cmd(&[]).output().unwrap();
  assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

  assert_eq!(
    String::from_utf8_lossy(&out.stdout),
    "Cards Closed/TRc1/alice/2 [org=acme, board=Roadmap, linkId=abc]\n\
     Cards Closed/TRc1/bob/2 [org=acme, board=Roadmap, linkId=abc]\n"
  );
}

#[test]
fn label_grouping_credits_each_member_under_the_label() {
  let out = trello_cmd(&["--group-by-label"]).output().unwrap();
  assert!(out.status.success());

  assert_eq!(
    String::from_utf8_lossy(&out.stdout),
    "docs/TRc1/alice/2 [org=acme, board=Roadmap, linkId=abc]\n\
     docs/TRc1/bob/2 [org=acme, board=Roadmap, linkId=abc]\n"
  );
}

#[test]
fn denied_label_drops_the_card() {
  let out = trello_cmd(&["-l", "docs-"]).output().unwrap();
  assert!(out.status.success());
  assert!(String::from_utf8_lossy(&out.stdout).starts_with("# No qualifying items found since 2024-03-01"));
}

#[test]
fn max_points_caps_title_annotations() {
  let out = trello_cmd(&["--max-points", "1", "-u", "bob"]).output().unwrap();
  assert!(out.status.success());
  assert_eq!(
    String::from_utf8_lossy(&out.stdout),
    "Cards Closed/TRc1/bob/1 [org=acme, board=Roadmap, linkId=abc]\n"
  );
}
