// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: GitHub organization adapter: closed search results -> PRs (with merge + review data) and issues
// role: platform/github
// inputs: API base, org login, enhancement label, Transport (bearer token), EffectiveConfig
// outputs: Report with "Enhancement PRs", "Bugfix PRs", "Merged PRs", "Reviewed PRs", "Closed Issues"
// side_effects: GET /orgs/:org, /orgs/:org/repos, /search/issues, PR and review lookups per PR
// invariants:
// - Unmerged PRs are kept as incomplete items and never credited
// - Approver = author of the latest APPROVED review; it can lift self-merge exclusion
// - Closed issues credit the assignee
// errors: GroupNotFound for an unknown org; fetch errors propagate
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use crate::cli::EffectiveConfig;
use crate::error::Result;
use crate::ext::serde_json::JsonFetch;
use crate::http::{fetch_all, get_json, get_json_opt, Endpoint, Pagination, Transport};
use crate::item::{Actor, ChangeRequest, Issue, ProjectRef, RawItem, Role};
use crate::membership::{resolve_group, Group, MembershipResolver, ProjectDirectory};
use crate::pipeline::{run_lanes, Lane};
use crate::report::{Platform, Report};

use super::{aggregator, filter_context, url_segments};

// --- Trait seam for GitHub API ---
pub struct GithubApi<'a> {
  transport: &'a dyn Transport,
  base: String,
}

impl<'a> GithubApi<'a> {
  pub fn new(transport: &'a dyn Transport, base: &str) -> Self {
    Self {
      transport,
      base: base.trim_end_matches('/').to_string(),
    }
  }

  pub fn search_closed(&self, org: &str, since: &str) -> Result<Vec<serde_json::Value>> {
    let ep = Endpoint::new(format!("{}/search/issues", self.base))
      .param("q", format!("user:{org} updated:>={since} archived:false state:closed"))
      .param("per_page", "100")
      .items_at("items")
      .paginate(Pagination::LinkHeader);
    fetch_all(self.transport, &ep)
  }

  pub fn pull(&self, url: &str) -> Result<serde_json::Value> {
    get_json(self.transport, url, &[])
  }

  pub fn reviews(&self, pr_url: &str) -> Result<Vec<serde_json::Value>> {
    let ep = Endpoint::new(format!("{pr_url}/reviews"))
      .param("per_page", "100")
      .paginate(Pagination::LinkHeader);
    fetch_all(self.transport, &ep)
  }
}

impl ProjectDirectory for GithubApi<'_> {
  fn find_group(&self, name: &str) -> Result<Option<Group>> {
    let url = format!("{}/orgs/{}", self.base, name);

    Ok(get_json_opt(self.transport, &url, &[])?.and_then(|o| {
      let login = o.fetch("login").str().unwrap_or(name).to_string();
      Some(Group {
        id: o.fetch("id").id()?,
        name: login.clone(),
        full_path: login,
        projects: Default::default(),
      })
    }))
  }

  fn group_projects(&self, group: &Group) -> Result<Option<Vec<ProjectRef>>> {
    let ep = Endpoint::new(format!("{}/orgs/{}/repos", self.base, group.full_path))
      .param("per_page", "100")
      .paginate(Pagination::LinkHeader);

    let repos = fetch_all(self.transport, &ep)?
      .iter()
      .filter_map(|r| {
        Some(ProjectRef {
          id: r.fetch("full_name").str()?.to_string(),
          name: r.fetch("name").str()?.to_string(),
          path: r.fetch("full_name").str().map(str::to_string),
          parent: r.fetch("owner.id").id(),
        })
      })
      .collect();

    Ok(Some(repos))
  }

  fn project(&self, id: &str) -> Result<Option<ProjectRef>> {
    let url = format!("{}/repos/{}", self.base, id);
    Ok(get_json_opt(self.transport, &url, &[])?.and_then(|r| {
      Some(ProjectRef {
        id: id.to_string(),
        name: r.fetch("name").str()?.to_string(),
        path: Some(id.to_string()),
        parent: r.fetch("owner.id").id(),
      })
    }))
  }
}

fn actor(v: &serde_json::Value, path: &str) -> Option<Actor> {
  let id = v.fetch(&format!("{path}.id")).id()?;
  let login = v.fetch(&format!("{path}.login")).str().map(str::to_string).unwrap_or_else(|| id.clone());
  Some(Actor { id, login })
}

/// `.../repos/acme/webapp` => project `acme/webapp`.
fn repository(v: &serde_json::Value) -> ProjectRef {
  let segs = url_segments(v.fetch("repository_url").str().unwrap_or_default());
  let n = segs.len();
  let (owner, name) = if n >= 2 {
    (segs[n - 2].clone(), segs[n - 1].clone())
  } else {
    (String::new(), String::new())
  };

  let full = format!("{owner}/{name}");

  ProjectRef {
    id: full.clone(),
    name,
    path: Some(full),
    parent: None,
  }
}

fn labels(v: &serde_json::Value) -> Vec<String> {
  v.fetch("labels")
    .items()
    .iter()
    .filter_map(|l| l.fetch("name").str().map(str::to_string))
    .collect()
}

fn trace(org: &str, project: &ProjectRef, v: &serde_json::Value) -> Vec<(String, String)> {
  vec![
    ("org".into(), org.to_string()),
    ("board".into(), project.name.clone()),
    ("linkId".into(), v.fetch("number").id().unwrap_or_default()),
  ]
}

/// Distinct review authors in review order, plus the latest approver.
fn review_summary(reviews: &[serde_json::Value]) -> (Vec<Actor>, Option<Actor>) {
  let mut reviewers: Vec<Actor> = Vec::new();
  let mut approver = None;

  for r in reviews {
    let Some(who) = actor(r, "user") else { continue };
    if r.fetch("state").str() == Some("APPROVED") {
      approver = Some(who.clone());
    }
    if !reviewers.iter().any(|a| a.id == who.id) {
      reviewers.push(who);
    }
  }

  (reviewers, approver)
}

pub fn adapt_pull(org: &str, issue: &serde_json::Value, pr: &serde_json::Value, reviews: &[serde_json::Value]) -> Option<RawItem> {
  let project = repository(issue);
  let (reviewers, approved_by) = review_summary(reviews);

  Some(RawItem::ChangeRequest(ChangeRequest {
    id: issue.fetch("id").id()?,
    title: issue.fetch("title").to_or_default(),
    trace: trace(org, &project, issue),
    project,
    author: actor(issue, "user")?,
    merged_by: actor(pr, "merged_by"),
    approved_by,
    reviewers,
    labels: labels(issue),
    created_at: pr.fetch("created_at").datetime(),
    merged_at: pr.fetch("merged_at").datetime(),
  }))
}

pub fn adapt_issue(org: &str, v: &serde_json::Value) -> Option<RawItem> {
  let project = repository(v);

  Some(RawItem::Issue(Issue {
    id: v.fetch("id").id()?,
    title: v.fetch("title").to_or_default(),
    trace: trace(org, &project, v),
    project,
    author: actor(v, "user")?,
    closed_by: None,
    assignee: actor(v, "assignee"),
    labels: labels(v),
    closed_at: v.fetch("closed_at").datetime(),
  }))
}

pub fn lanes(enhancement_label: &str) -> Vec<Lane> {
  let enh = enhancement_label.to_string();
  let bug = enhancement_label.to_string();

  vec![
    Lane::new("Enhancement PRs", Role::Author, move |i| {
      i.is_change_request() && i.labels().iter().any(|l| *l == enh)
    }),
    Lane::new("Bugfix PRs", Role::Author, move |i| {
      i.is_change_request() && !i.labels().iter().any(|l| *l == bug)
    }),
    Lane::new("Merged PRs", Role::Merger, RawItem::is_change_request),
    Lane::new("Reviewed PRs", Role::Reviewer, RawItem::is_change_request),
    Lane::new("Closed Issues", Role::Closer, RawItem::is_issue),
  ]
}

pub fn collect(
  cfg: &EffectiveConfig,
  transport: &dyn Transport,
  api_url: &str,
  org: &str,
  enhancement_label: &str,
) -> Result<Report> {
  let api = GithubApi::new(transport, api_url);
  let group = resolve_group(&api, org)?;
  let since = cfg.window.since.format("%Y-%m-%d").to_string();

  let mut items = Vec::new();
  for hit in api.search_closed(&group.full_path, &since)? {
    match hit.fetch("pull_request.url").str() {
      Some(pr_url) => {
        let pr = api.pull(pr_url)?;
        let reviews = match pr.fetch("merged_at").value() {
          Some(_) => api.reviews(pr_url)?,
          None => Vec::new(),
        };
        items.extend(adapt_pull(&group.name, &hit, &pr, &reviews));
      }
      None => items.extend(adapt_issue(&group.name, &hit)),
    }
  }

  let subject = group.name.clone();
  let resolver = MembershipResolver::new(&api, group, cfg.matcher.clone());
  let mut agg = aggregator(cfg);
  run_lanes(items, &lanes(enhancement_label), &filter_context(cfg, true), Some(&resolver), &mut agg)?;

  Ok(Report::new(Platform::GitHub, subject, agg))
}
