// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Trello team adapter: done-list card search -> Card items credited to every member
// role: platform/trello
// inputs: API base, org name, done list name, page size, Transport (key/token query), EffectiveConfig
// outputs: Report with "Cards Closed"
// side_effects: GET /1/organizations/:name, /1/organizations/:id/members, /1/search, /1/boards/:id, /1/members/:id
// invariants:
// - No bulk board listing: one memoized board lookup per distinct idBoard
// - Org members are preloaded; unknown members are looked up once
// errors: GroupNotFound for an unknown org; fetch errors propagate
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use crate::cache::{ActorDirectory, IdentityCache};
use crate::cli::EffectiveConfig;
use crate::error::Result;
use crate::ext::serde_json::JsonFetch;
use crate::http::{fetch_all, get_json_opt, Endpoint, Pagination, Transport};
use crate::item::{Actor, Card, ProjectRef, RawItem, Role};
use crate::membership::{resolve_group, Group, MembershipResolver, ProjectDirectory};
use crate::pipeline::{run_lanes, Lane};
use crate::report::{Platform, Report};

use super::{aggregator, filter_context};

pub struct TrelloApi<'a> {
  transport: &'a dyn Transport,
  base: String,
}

impl<'a> TrelloApi<'a> {
  pub fn new(transport: &'a dyn Transport, base: &str) -> Self {
    Self {
      transport,
      base: format!("{}/1", base.trim_end_matches('/')),
    }
  }

  pub fn members(&self, org: &Group) -> Result<Vec<Actor>> {
    let ep = Endpoint::new(format!("{}/organizations/{}/members", self.base, org.id));
    Ok(fetch_all(self.transport, &ep)?.iter().filter_map(member).collect())
  }

  pub fn done_cards(&self, org: &Group, list: &str, days: i64, page_size: usize) -> Result<Vec<serde_json::Value>> {
    let ep = Endpoint::new(format!("{}/search", self.base))
      .param("query", format!("list:{list} edited:{days}"))
      .param("idOrganizations", org.id.clone())
      .param("modelTypes", "cards")
      .param("card_fields", "name,idMembers,idBoard,dateLastActivity,shortLink,labels")
      .param("cards_limit", page_size.to_string())
      .items_at("cards")
      .paginate(Pagination::Numbered {
        param: "cards_page",
        first: 0,
        page_size,
        total_pages_field: None,
      });
    fetch_all(self.transport, &ep)
  }
}

fn member(v: &serde_json::Value) -> Option<Actor> {
  let id = v.fetch("id").id()?;
  let login = v.fetch("username").str().map(str::to_string).unwrap_or_else(|| id.clone());
  Some(Actor { id, login })
}

impl ProjectDirectory for TrelloApi<'_> {
  fn find_group(&self, name: &str) -> Result<Option<Group>> {
    let url = format!("{}/organizations/{}", self.base, name);

    Ok(get_json_opt(self.transport, &url, &[])?.and_then(|o| {
      Some(Group {
        id: o.fetch("id").id()?,
        name: o
          .fetch("displayName")
          .str()
          .or_else(|| o.fetch("name").str())
          .unwrap_or(name)
          .to_string(),
        full_path: String::new(),
        projects: Default::default(),
      })
    }))
  }

  fn group_projects(&self, _group: &Group) -> Result<Option<Vec<ProjectRef>>> {
    Ok(None)
  }

  fn project(&self, id: &str) -> Result<Option<ProjectRef>> {
    let url = format!("{}/boards/{}", self.base, id);
    let query = [("fields".to_string(), "name,idOrganization".to_string())];

    Ok(get_json_opt(self.transport, &url, &query)?.map(|b| ProjectRef {
      id: id.to_string(),
      name: b.fetch("name").to_or_default(),
      path: None,
      parent: b.fetch("idOrganization").id(),
    }))
  }
}

impl ActorDirectory for TrelloApi<'_> {
  fn lookup_actor(&self, id: &str) -> Result<Option<Actor>> {
    let url = format!("{}/members/{}", self.base, id);
    Ok(get_json_opt(self.transport, &url, &[])?.as_ref().and_then(member))
  }
}

/// Build a card, filling board details through the resolver's memo and
/// members through the identity cache.
pub fn adapt_card(
  org_name: &str,
  v: &serde_json::Value,
  boards: &MembershipResolver<'_>,
  people: &IdentityCache<'_>,
) -> Result<Option<RawItem>> {
  let Some(id) = v.fetch("id").id() else {
    return Ok(None);
  };

  let bare = ProjectRef {
    id: v.fetch("idBoard").id().unwrap_or_default(),
    ..Default::default()
  };
  let board = boards.lookup(&bare)?.unwrap_or(bare);

  let mut members = Vec::new();
  for mid in v.fetch("idMembers").items().iter().filter_map(|m| m.as_str()) {
    members.push(people.resolve_actor(mid)?);
  }

  let trace = vec![
    ("org".to_string(), org_name.to_string()),
    ("board".to_string(), board.name.clone()),
    ("linkId".to_string(), v.fetch("shortLink").to_or_default()),
  ];

  Ok(Some(RawItem::Card(Card {
    id,
    title: v.fetch("name").to_or_default(),
    board,
    members,
    labels: v
      .fetch("labels")
      .items()
      .iter()
      .filter_map(|l| l.fetch("name").str().map(str::to_string))
      .collect(),
    done_at: v.fetch("dateLastActivity").datetime(),
    trace,
  })))
}

pub fn collect(
  cfg: &EffectiveConfig,
  transport: &dyn Transport,
  api_url: &str,
  org: &str,
  list: &str,
  page_size: usize,
) -> Result<Report> {
  let api = TrelloApi::new(transport, api_url);
  let group = resolve_group(&api, org)?;

  let people = IdentityCache::new(Some(&api));
  people.preload(api.members(&group)?);
  log::info!("preloaded {} members of {}", people.len(), group.name);

  let raw = api.done_cards(&group, list, cfg.window.days(), page_size.max(1))?;

  let subject = group.name.clone();
  let resolver = MembershipResolver::new(&api, group, cfg.matcher.clone());

  let mut items = Vec::new();
  for v in &raw {
    items.extend(adapt_card(org, v, &resolver, &people)?);
  }

  let mut agg = aggregator(cfg);
  run_lanes(
    items,
    &[Lane::all("Cards Closed", Role::Member)],
    &filter_context(cfg, false),
    Some(&resolver),
    &mut agg,
  )?;
  log::debug!("{} board lookups, {} member lookups", resolver.remote_calls(), people.lookups());

  Ok(Report::new(Platform::Trello, subject, agg))
}
