// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: GitLab group adapter: merged MRs and closed issues -> RawItems, group directory for scoping
// role: platform/gitlab
// inputs: Server URL, group name, Transport (PRIVATE-TOKEN header), EffectiveConfig
// outputs: Report with "Merge Requests", "Reviewed Merge Requests", "Closed Issues"
// side_effects: GET /groups/:id, /groups/:id/projects, /groups/:id/merge_requests, /groups/:id/issues
// invariants:
// - No approval signal on this platform: self-merges never earn merger credit
// - Ledger metadata comes from web_url: org, board, linkId
// errors: GroupNotFound for an unknown group; fetch errors propagate
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use crate::cli::EffectiveConfig;
use crate::error::Result;
use crate::ext::serde_json::JsonFetch;
use crate::http::{fetch_all, get_json_opt, Endpoint, Pagination, Transport};
use crate::item::{Actor, ChangeRequest, Issue, ProjectRef, RawItem, Role, Trace};
use crate::membership::{resolve_group, Group, MembershipResolver, ProjectDirectory};
use crate::pipeline::{run_lanes, Lane};
use crate::report::{Platform, Report};

use super::{aggregator, filter_context, url_segments};

pub struct GitlabApi<'a> {
  transport: &'a dyn Transport,
  base: String,
}

impl<'a> GitlabApi<'a> {
  pub fn new(transport: &'a dyn Transport, server: &str) -> Self {
    Self {
      transport,
      base: format!("{}/api/v4", server.trim_end_matches('/')),
    }
  }

  fn listing(&self, path: &str) -> Endpoint {
    Endpoint::new(format!("{}{}", self.base, path))
      .param("per_page", "100")
      .paginate(Pagination::LinkHeader)
  }

  pub fn merge_requests(&self, group: &Group, created_after: &str) -> Result<Vec<serde_json::Value>> {
    let ep = self
      .listing(&format!("/groups/{}/merge_requests", group.id))
      .param("state", "merged")
      .param("scope", "all")
      .param("created_after", created_after);
    fetch_all(self.transport, &ep)
  }

  pub fn closed_issues(&self, group: &Group, created_after: &str) -> Result<Vec<serde_json::Value>> {
    let ep = self
      .listing(&format!("/groups/{}/issues", group.id))
      .param("state", "closed")
      .param("scope", "all")
      .param("created_after", created_after);
    fetch_all(self.transport, &ep)
  }
}

fn project_from(v: &serde_json::Value) -> Option<ProjectRef> {
  Some(ProjectRef {
    id: v.fetch("id").id()?,
    name: v.fetch("name").str()?.to_string(),
    path: v.fetch("path_with_namespace").str().map(str::to_string),
    parent: v.fetch("namespace.id").id(),
  })
}

impl ProjectDirectory for GitlabApi<'_> {
  fn find_group(&self, name: &str) -> Result<Option<Group>> {
    let encoded: String = url::form_urlencoded::byte_serialize(name.as_bytes()).collect();
    let url = format!("{}/groups/{}", self.base, encoded);

    Ok(get_json_opt(self.transport, &url, &[])?.and_then(|g| {
      Some(Group {
        id: g.fetch("id").id()?,
        name: g.fetch("name").str().unwrap_or(name).to_string(),
        full_path: g.fetch("full_path").str().unwrap_or(name).to_string(),
        projects: Default::default(),
      })
    }))
  }

  fn group_projects(&self, group: &Group) -> Result<Option<Vec<ProjectRef>>> {
    let ep = self
      .listing(&format!("/groups/{}/projects", group.id))
      .param("include_subgroups", "true");
    Ok(Some(fetch_all(self.transport, &ep)?.iter().filter_map(project_from).collect()))
  }

  fn project(&self, id: &str) -> Result<Option<ProjectRef>> {
    let url = format!("{}/projects/{}", self.base, id);
    Ok(get_json_opt(self.transport, &url, &[])?.as_ref().and_then(project_from))
  }
}

fn actor(v: &serde_json::Value, path: &str) -> Option<Actor> {
  let id = v.fetch(&format!("{path}.id")).id()?;
  let login = v.fetch(&format!("{path}.username")).str().map(str::to_string).unwrap_or_else(|| id.clone());
  Some(Actor { id, login })
}

/// org / board / linkId out of `https://host/org/sub/project/-/merge_requests/7`.
fn web_trace(web_url: &str) -> (Trace, Option<String>) {
  let segs = url_segments(web_url);
  let n = segs.len();
  let org = segs.first().cloned().unwrap_or_default();
  let board = if n > 4 { segs[1..n - 3].join("/") } else { String::new() };
  let link = segs.last().cloned().unwrap_or_default();
  let path = (!board.is_empty()).then(|| format!("{org}/{board}"));

  (vec![("org".into(), org), ("board".into(), board), ("linkId".into(), link)], path)
}

fn project_ref(v: &serde_json::Value, path: Option<String>) -> ProjectRef {
  let name = path
    .as_deref()
    .and_then(|p| p.rsplit('/').next())
    .unwrap_or_default()
    .to_string();

  ProjectRef {
    id: v.fetch("project_id").id().unwrap_or_default(),
    name,
    path,
    parent: None,
  }
}

fn labels(v: &serde_json::Value) -> Vec<String> {
  v.fetch("labels")
    .items()
    .iter()
    .filter_map(|l| l.as_str().or_else(|| l.fetch("name").str()).map(str::to_string))
    .collect()
}

pub fn adapt_merge_request(v: &serde_json::Value) -> Option<RawItem> {
  let (trace, path) = web_trace(v.fetch("web_url").str().unwrap_or_default());

  Some(RawItem::ChangeRequest(ChangeRequest {
    id: v.fetch("id").id()?,
    title: v.fetch("title").to_or_default(),
    project: project_ref(v, path),
    author: actor(v, "author")?,
    merged_by: actor(v, "merged_by").or_else(|| actor(v, "merge_user")),
    approved_by: None,
    reviewers: Vec::new(),
    labels: labels(v),
    created_at: v.fetch("created_at").datetime(),
    merged_at: v.fetch("merged_at").datetime(),
    trace,
  }))
}

pub fn adapt_issue(v: &serde_json::Value) -> Option<RawItem> {
  let (trace, path) = web_trace(v.fetch("web_url").str().unwrap_or_default());

  Some(RawItem::Issue(Issue {
    id: v.fetch("id").id()?,
    title: v.fetch("title").to_or_default(),
    project: project_ref(v, path),
    author: actor(v, "author")?,
    closed_by: actor(v, "closed_by"),
    assignee: actor(v, "assignee").or_else(|| actor(v, "assignees.0")),
    labels: labels(v),
    closed_at: v.fetch("closed_at").datetime(),
    trace,
  }))
}

pub fn lanes() -> Vec<Lane> {
  vec![
    Lane::new("Merge Requests", Role::Author, RawItem::is_change_request),
    Lane::new("Reviewed Merge Requests", Role::Merger, RawItem::is_change_request),
    Lane::new("Closed Issues", Role::Closer, RawItem::is_issue),
  ]
}

pub fn collect(cfg: &EffectiveConfig, transport: &dyn Transport, server: &str, group_name: &str) -> Result<Report> {
  let api = GitlabApi::new(transport, server);
  let group = resolve_group(&api, group_name)?;
  let created_after = cfg.window.since.format("%Y-%m-%d").to_string();

  let mut items: Vec<RawItem> = api
    .merge_requests(&group, &created_after)?
    .iter()
    .filter_map(adapt_merge_request)
    .collect();
  items.extend(api.closed_issues(&group, &created_after)?.iter().filter_map(adapt_issue));

  let subject = group.name.clone();
  let resolver = MembershipResolver::new(&api, group, cfg.matcher.clone());
  let mut agg = aggregator(cfg);
  run_lanes(items, &lanes(), &filter_context(cfg, false), Some(&resolver), &mut agg)?;

  Ok(Report::new(Platform::GitLab, subject, agg))
}
