// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Google Chat adapter: room rosters plus human messages in the window
// role: platform/gchat
// inputs: API base, show_members flag, Transport (bearer token), EffectiveConfig
// outputs: Report with "Chat Messages" and one roster per room
// side_effects: GET /v1/spaces, /v1/:space/members, /v1/:space/messages
// invariants:
// - Only rooms are visited; direct messages and group chats are skipped
// - Rosters count JOINED human members; bots never earn credit
// errors: Fetch errors propagate
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use chrono::SecondsFormat;

use crate::cli::EffectiveConfig;
use crate::error::Result;
use crate::ext::serde_json::JsonFetch;
use crate::http::{fetch_all, Endpoint, Pagination, Transport};
use crate::item::{Actor, Message, ProjectRef, RawItem, Role};
use crate::pipeline::{run_lanes, Lane};
use crate::report::{Platform, Report, Roster};

use super::{aggregator, filter_context, host_of};

const CURSOR: Pagination = Pagination::BodyCursor {
  field: "nextPageToken",
  param: "pageToken",
};

pub struct ChatApi<'a> {
  transport: &'a dyn Transport,
  base: String,
}

impl<'a> ChatApi<'a> {
  pub fn new(transport: &'a dyn Transport, base: &str) -> Self {
    Self {
      transport,
      base: format!("{}/v1", base.trim_end_matches('/')),
    }
  }

  pub fn rooms(&self) -> Result<Vec<ProjectRef>> {
    let ep = Endpoint::new(format!("{}/spaces", self.base))
      .items_at("spaces")
      .paginate(CURSOR);

    Ok(
      fetch_all(self.transport, &ep)?
        .iter()
        .filter(|s| s.fetch("type").str() == Some("ROOM") || s.fetch("spaceType").str() == Some("SPACE"))
        .filter_map(|s| {
          let id = s.fetch("name").id()?;
          Some(ProjectRef {
            name: s.fetch("displayName").str().unwrap_or(&id).to_string(),
            id,
            path: None,
            parent: None,
          })
        })
        .collect(),
    )
  }

  pub fn members(&self, room: &ProjectRef) -> Result<Vec<String>> {
    let ep = Endpoint::new(format!("{}/{}/members", self.base, room.id))
      .items_at("memberships")
      .paginate(CURSOR);

    Ok(
      fetch_all(self.transport, &ep)?
        .iter()
        .filter(|m| m.fetch("state").str() == Some("JOINED") && m.fetch("member.type").str() == Some("HUMAN"))
        .filter_map(|m| {
          m.fetch("member.displayName")
            .str()
            .or_else(|| m.fetch("member.name").str())
            .map(str::to_string)
        })
        .collect(),
    )
  }

  pub fn messages(&self, room: &ProjectRef, since: &str) -> Result<Vec<serde_json::Value>> {
    let ep = Endpoint::new(format!("{}/{}/messages", self.base, room.id))
      .param("filter", format!("createTime > \"{since}\""))
      .items_at("messages")
      .paginate(CURSOR);
    fetch_all(self.transport, &ep)
  }
}

pub fn adapt_message(room: &ProjectRef, v: &serde_json::Value) -> Option<RawItem> {
  if v.fetch("sender.type").str() != Some("HUMAN") {
    return None;
  }

  let name = v.fetch("name").str()?;
  let id = name.rsplit('/').next().unwrap_or(name).to_string();
  let sender_id = v.fetch("sender.name").id()?;
  let login = v.fetch("sender.displayName").str().unwrap_or(&sender_id).to_string();

  Some(RawItem::Message(Message {
    text: v.fetch("text").to_or_default(),
    space: room.clone(),
    sender: Actor::new(sender_id, login),
    created_at: v.fetch("createTime").datetime(),
    trace: vec![
      ("space".to_string(), room.name.clone()),
      ("linkId".to_string(), id.clone()),
    ],
    id,
  }))
}

pub fn collect(cfg: &EffectiveConfig, transport: &dyn Transport, api_url: &str, show_members: bool) -> Result<Report> {
  let api = ChatApi::new(transport, api_url);
  let since = cfg.window.since_instant().to_rfc3339_opts(SecondsFormat::Secs, true);

  let mut rosters = Vec::new();
  let mut items = Vec::new();

  for room in api.rooms()? {
    let members = api.members(&room)?;
    log::info!("{}: {} members", room.name, members.len());

    items.extend(api.messages(&room, &since)?.iter().filter_map(|m| adapt_message(&room, m)));

    rosters.push(Roster {
      name: room.name.clone(),
      noun: "Members",
      count: members.len(),
      members: if show_members { members } else { Vec::new() },
    });
  }

  let mut agg = aggregator(cfg);
  run_lanes(
    items,
    &[Lane::all("Chat Messages", Role::Poster)],
    &filter_context(cfg, false),
    None,
    &mut agg,
  )?;

  let mut report = Report::new(Platform::GoogleChat, host_of(api_url), agg);
  report.rosters = rosters;
  Ok(report)
}
