// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Smartsheet report adapter: approved point rows -> SheetRow items credited to the recipient
// role: platform/smartsheet
// inputs: API base, report id, board id, optional program regex, Transport (bearer token), EffectiveConfig
// outputs: Report with "Cards Closed" (or the configured points grouping at render time)
// side_effects: GET /2.0/reports/:id, page by page
// invariants:
// - Column positions come from each page's column titles
// - Points are taken from the Points cell as-is; rows without it fall back to the title rules
// - Pool: Thought Leadership => ThoughtLeadership, Community => Trello, else ServicesSupport
// errors: Fetch error when a required column is missing; fetch errors propagate
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::HashMap;

use regex::Regex;

use crate::cli::EffectiveConfig;
use crate::error::{Result, StatsError};
use crate::ext::serde_json::JsonFetch;
use crate::http::{Endpoint, Pagination, Transport};
use crate::item::{Actor, ProjectRef, RawItem, Role, SheetRow};
use crate::pipeline::{run_lanes, Lane};
use crate::report::{Platform, Report};

use super::{aggregator, filter_context};

const STATUS: &str = "Status";
const DECIDED: &str = "Approved / Declined Date";
const RECIPIENT: &str = "Verification of Email";
const PROGRAM: &str = "Program Name";
const POINTS: &str = "Points";
const ROW_ID: &str = "Row ID";

pub fn pool_for(program: &str) -> &'static str {
  if program.contains("Thought Leadership") {
    "ThoughtLeadership"
  } else if program.contains("Community") {
    "Trello"
  } else {
    "ServicesSupport"
  }
}

/// Column title -> cell index for one report page.
struct Columns(HashMap<String, usize>);

impl Columns {
  fn from_page(url: &str, body: &serde_json::Value) -> Result<Self> {
    let map: HashMap<String, usize> = body
      .fetch("columns")
      .items()
      .iter()
      .filter_map(|c| Some((c.fetch("title").str()?.to_string(), c.fetch("index").to::<usize>()?)))
      .collect();

    for required in [STATUS, DECIDED, RECIPIENT, PROGRAM] {
      if !map.contains_key(required) {
        return Err(StatsError::Fetch {
          url: url.to_string(),
          status: None,
          message: format!("report has no '{required}' column"),
        });
      }
    }

    Ok(Self(map))
  }

  fn cell<'v>(&self, row: &'v serde_json::Value, title: &str) -> Option<&'v serde_json::Value> {
    let idx = *self.0.get(title)?;
    row.fetch("cells").items().get(idx)?.fetch("value").value()
  }

  fn text(&self, row: &serde_json::Value, title: &str) -> Option<String> {
    match self.cell(row, title)? {
      serde_json::Value::String(s) => Some(s.clone()),
      other => other.fetch("").id(),
    }
  }
}

fn adapt_row(cols: &Columns, row: &serde_json::Value, board_id: &str, channel: Option<&Regex>) -> Option<RawItem> {
  let id = row.fetch("id").id()?;
  let program = cols.text(row, PROGRAM).unwrap_or_default();

  if channel.is_some_and(|re| !re.is_match(&program)) {
    return None;
  }

  let email = cols.text(row, RECIPIENT)?;
  let recipient = email.split('@').next().unwrap_or_default().trim().to_string();
  let pool = pool_for(&program);
  let points = cols
    .cell(row, POINTS)
    .and_then(|v| v.as_f64().or_else(|| v.as_str().and_then(|s| s.trim().parse::<f64>().ok())))
    .filter(|p| *p >= 0.0)
    .map(|p| p as u32);
  let decided_at = cols.cell(row, DECIDED).and_then(|v| v.fetch("").datetime());

  let trace = vec![
    ("pool".to_string(), pool.to_string()),
    ("board".to_string(), board_id.to_string()),
    ("rowId".to_string(), id.clone()),
    ("linkId".to_string(), cols.text(row, ROW_ID).unwrap_or_default()),
  ];

  Some(RawItem::SheetRow(SheetRow {
    id,
    program,
    pool: ProjectRef {
      id: pool.to_string(),
      name: pool.to_string(),
      path: None,
      parent: None,
    },
    recipient: Actor::new(recipient.clone(), recipient),
    approved: cols.text(row, STATUS).as_deref() == Some("Approved"),
    decided_at,
    points,
    trace,
  }))
}

pub fn collect(
  cfg: &EffectiveConfig,
  transport: &dyn Transport,
  api_url: &str,
  sheet_id: &str,
  board_id: &str,
  channel: Option<&str>,
) -> Result<Report> {
  let channel = channel
    .map(Regex::new)
    .transpose()
    .map_err(|e| StatsError::config(format!("invalid --channel pattern: {e}")))?;

  let ep = Endpoint::new(format!("{}/2.0/reports/{}", api_url.trim_end_matches('/'), sheet_id))
    .param("level", "2")
    .param("pageSize", "400")
    .param("include", "objectValue")
    .items_at("rows")
    .paginate(Pagination::Numbered {
      param: "page",
      first: 1,
      page_size: 400,
      total_pages_field: Some("totalPages"),
    });

  let mut subject = sheet_id.to_string();
  let mut items = Vec::new();

  for page in ep.pages(transport) {
    let page = page?;
    let cols = Columns::from_page(&ep.url, &page.body)?;
    if let Some(name) = page.body.fetch("name").str() {
      subject = name.to_string();
    }
    items.extend(page.items.iter().filter_map(|r| adapt_row(&cols, r, board_id, channel.as_ref())));
  }

  let mut agg = aggregator(cfg);
  run_lanes(
    items,
    &[Lane::all("Cards Closed", Role::Recipient)],
    &filter_context(cfg, false),
    None,
    &mut agg,
  )?;

  Ok(Report::new(Platform::Smartsheet, subject, agg))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::http::FixtureTransport;
  use crate::platforms::testing::config;
  use crate::report::RenderOptions;
  use serde_json::json;

  fn row(id: u64, status: &str, date: &str, email: &str, program: &str, points: serde_json::Value, row_id: &str) -> serde_json::Value {
    json!({ "id": id, "cells": [
      { "value": row_id }, { "value": status }, { "value": date },
      { "value": email }, { "value": program }, { "value": points }
    ] })
  }

  fn columns() -> serde_json::Value {
    json!([
      { "title": "Row ID", "index": 0 }, { "title": "Status", "index": 1 },
      { "title": "Approved / Declined Date", "index": 2 }, { "title": "Verification of Email", "index": 3 },
      { "title": "Program Name", "index": 4 }, { "title": "Points", "index": 5 }
    ])
  }

  fn fixtures() -> serde_json::Value {
    json!({
      "https://ss.test/2.0/reports/42?level=2&pageSize=400&include=objectValue&page=1": { "body": {
        "name": "Giveback", "totalPages": 2, "columns": columns(),
        "rows": [
          row(1, "Approved", "2024-04-01", "alice@example.com", "Thought Leadership Blog", json!(8), "R-1"),
          row(2, "Declined", "2024-04-01", "bob@example.com", "Community Talk", json!(3), "R-2")
        ]
      } },
      "https://ss.test/2.0/reports/42?level=2&pageSize=400&include=objectValue&page=2": { "body": {
        "name": "Giveback", "totalPages": 2, "columns": columns(),
        "rows": [
          row(3, "Approved", "2024-05-01", "bob@example.com", "Community Talk", json!(2.0), "R-3"),
          row(4, "Approved", "2024-01-01", "carol@example.com", "Adoption", json!(1), "R-4")
        ]
      } }
    })
  }

  #[test]
  fn approved_rows_become_ledger_lines() {
    let t = FixtureTransport::new(fixtures());
    let cfg = config(&["smartsheet", "-e", "42", "-b", "900", "-s", "2024-03-01"]);

    let report = collect(&cfg, &t, "https://ss.test", "42", "900", None).unwrap();
    assert_eq!(report.subject, "Giveback");
    assert_eq!(
      report.render(&RenderOptions::default()),
      "Cards Closed/SS1/alice/8 [pool=ThoughtLeadership, board=900, rowId=1, linkId=R-1]\n\
       Cards Closed/SS3/bob/2 [pool=Trello, board=900, rowId=3, linkId=R-3]\n"
    );
    assert_eq!(t.request_count(), 2);
  }

  #[test]
  fn channel_filter_limits_programs() {
    let t = FixtureTransport::new(fixtures());
    let cfg = config(&["smartsheet", "-e", "42", "-b", "900"]);

    let report = collect(&cfg, &t, "https://ss.test", "42", "900", Some("Community")).unwrap();
    let out = report.render(&RenderOptions::default());
    assert_eq!(out, "Cards Closed/SS3/bob/2 [pool=Trello, board=900, rowId=3, linkId=R-3]\n");
  }

  #[test]
  fn missing_columns_are_a_fetch_error() {
    let t = FixtureTransport::new(json!({
      "https://ss.test/2.0/reports/42": { "body": { "totalPages": 1, "columns": [], "rows": [] } }
    }));
    let cfg = config(&["smartsheet", "-e", "42", "-b", "900"]);
    let err = collect(&cfg, &t, "https://ss.test", "42", "900", None).unwrap_err();
    assert!(err.to_string().contains("no 'Status' column"), "{err}");
  }

  #[test]
  fn pools_by_program() {
    assert_eq!(pool_for("Thought Leadership: Talk"), "ThoughtLeadership");
    assert_eq!(pool_for("Community Meetup"), "Trello");
    assert_eq!(pool_for("First and Thirds"), "ServicesSupport");
  }
}
