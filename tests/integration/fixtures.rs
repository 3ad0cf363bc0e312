//! HTTP routes shared by the end-to-end tests.

use serde_json::{json, Value};

pub const NOW: &str = "2024-06-01T00:00:00Z";

pub fn gitlab() -> Value {
  json!({
    "https://gl.test/api/v4/groups/acme": { "body": { "id": 10, "name": "acme", "full_path": "acme" } },
    "https://gl.test/api/v4/groups/10/projects": { "body": [
      { "id": 1, "name": "webapp", "path_with_namespace": "acme/webapp", "namespace": { "id": 10 } }
    ] },
    "https://gl.test/api/v4/groups/10/merge_requests": { "body": [
      {
        "id": 501, "project_id": 1, "title": "Add caching layer (3)", "state": "merged",
        "author": { "id": 1, "username": "alice" }, "merged_by": { "id": 2, "username": "bob" },
        "merged_at": "2024-04-02T10:00:00Z", "labels": ["enhancement"],
        "web_url": "https://gl.test/acme/webapp/-/merge_requests/7"
      },
      {
        "id": 502, "project_id": 2, "title": "Tooling fix", "state": "merged",
        "author": { "id": 1, "username": "alice" }, "merged_by": { "id": 2, "username": "bob" },
        "merged_at": "2024-04-03T10:00:00Z", "labels": [],
        "web_url": "https://gl.test/other/tool/-/merge_requests/1"
      }
    ] },
    "https://gl.test/api/v4/groups/10/issues": { "body": [
      {
        "id": 900, "project_id": 1, "title": "Crash on start", "state": "closed",
        "author": { "id": 3, "username": "carol" }, "closed_by": { "id": 2, "username": "bob" },
        "closed_at": "2024-05-01T00:00:00Z", "labels": ["bug"],
        "web_url": "https://gl.test/acme/webapp/-/issues/4"
      }
    ] }
  })
}

pub fn trello() -> Value {
  json!({
    "https://trello.test/1/organizations/acme": { "body": { "id": "org1", "name": "acme", "displayName": "Acme Team" } },
    "https://trello.test/1/organizations/org1/members": { "body": [
      { "id": "m1", "username": "alice" },
      { "id": "m2", "username": "bob" }
    ] },
    "https://trello.test/1/search": { "body": { "cards": [
      {
        "id": "c1", "name": "Write runbook (2)", "idBoard": "b1", "idMembers": ["m1", "m2"],
        "dateLastActivity": "2024-04-01T00:00:00.000Z", "shortLink": "abc", "labels": [{ "name": "docs" }]
      }
    ] } },
    "https://trello.test/1/boards/b1": { "body": { "name": "Roadmap", "idOrganization": "org1" } }
  })
}
