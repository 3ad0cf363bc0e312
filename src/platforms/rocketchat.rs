// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Rocket.Chat adapter: member counts for channels whose description matches
// role: platform/rocketchat
// inputs: server host or URL, description text, Transport (auth token + user id headers)
// outputs: Report with rosters only; the aggregation stays empty
// side_effects: GET /api/v1/channels.list (offset paging), /api/v1/channels.members per channel
// errors: Fetch errors propagate
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use crate::cli::EffectiveConfig;
use crate::error::Result;
use crate::ext::serde_json::JsonFetch;
use crate::http::{fetch_all, get_json, Endpoint, Pagination, Transport};
use crate::report::{Platform, Report, Roster};

use super::{aggregator, host_of};

/// `chat.example.com` => `https://chat.example.com`; full URLs pass through.
pub fn server_base(server: &str) -> String {
  let trimmed = server.trim_end_matches('/');
  if trimmed.contains("://") {
    trimmed.to_string()
  } else {
    format!("https://{trimmed}")
  }
}

pub fn collect(cfg: &EffectiveConfig, transport: &dyn Transport, server: &str, description: &str) -> Result<Report> {
  let base = server_base(server);

  let ep = Endpoint::new(format!("{base}/api/v1/channels.list"))
    .items_at("channels")
    .paginate(Pagination::Offset {
      offset_param: "offset",
      count_param: "count",
      page_size: 50,
      total_field: "total",
    });

  let mut rosters = Vec::new();

  for channel in fetch_all(transport, &ep)? {
    let matches = channel
      .fetch("description")
      .str()
      .is_some_and(|d| d.contains(description));
    let Some(id) = channel.fetch("_id").id() else {
      continue;
    };
    if !matches {
      continue;
    }

    let url = format!("{base}/api/v1/channels.members");
    let members = get_json(transport, &url, &[("roomId".to_string(), id.clone())])?;

    rosters.push(Roster {
      name: channel.fetch("name").str().unwrap_or(&id).to_string(),
      noun: "Users",
      count: members.fetch("total").to::<usize>().unwrap_or(0),
      members: Vec::new(),
    });
  }

  log::info!("{} channels matched '{}'", rosters.len(), description);

  let mut report = Report::new(Platform::RocketChat, host_of(&base), aggregator(cfg));
  report.rosters = rosters;
  Ok(report)
}
