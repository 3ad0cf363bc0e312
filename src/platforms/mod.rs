// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Dispatch the selected platform: credentials -> transport -> adapter -> Report
// role: platforms/dispatch
// inputs: EffectiveConfig; credential env vars; fixture env vars
// outputs: Report ready for rendering
// side_effects: Network (or fixture) reads through the platform adapter
// invariants: Credentials are checked before any request is issued
// errors: Configuration (missing credential) and any adapter error
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

pub mod gchat;
pub mod github;
pub mod gitlab;
pub mod rocketchat;
pub mod smartsheet;
pub mod trello;

use crate::aggregate::Aggregator;
use crate::cli::{Command, EffectiveConfig};
use crate::credentials;
use crate::error::Result;
use crate::filter::FilterContext;
use crate::http::build_transport;
use crate::report::Report;

fn header(name: &str, value: impl Into<String>) -> (String, String) {
  (name.to_string(), value.into())
}

pub fn collect(cfg: &EffectiveConfig) -> Result<Report> {
  match &cfg.command {
    Command::Github {
      org,
      enhancement_label,
      api_url,
    } => {
      let token = credentials::require_github_token()?;
      let transport = build_transport(
        vec![
          header("Accept", "application/vnd.github+json"),
          header("User-Agent", "contrib-stats"),
          header("Authorization", format!("Bearer {token}")),
        ],
        vec![],
      )?;
      github::collect(cfg, transport.as_ref(), api_url, org, enhancement_label)
    }

    Command::Gitlab { group, server } => {
      let token = credentials::require(credentials::GITLAB_TOKEN)?;
      let transport = build_transport(vec![header("PRIVATE-TOKEN", token)], vec![])?;
      gitlab::collect(cfg, transport.as_ref(), server, group)
    }

    Command::Trello {
      org,
      list,
      page_size,
      api_url,
    } => {
      let key = credentials::require(credentials::TRELLO_KEY)?;
      let token = credentials::require(credentials::TRELLO_TOKEN)?;
      let transport = build_transport(vec![], vec![header("key", key), header("token", token)])?;
      trello::collect(cfg, transport.as_ref(), api_url, org, list, *page_size)
    }

    Command::Smartsheet {
      sheet_id,
      board_id,
      channel,
      api_url,
    } => {
      let token = credentials::require(credentials::SMARTSHEET_TOKEN)?;
      let transport = build_transport(vec![header("Authorization", format!("Bearer {token}"))], vec![])?;
      smartsheet::collect(cfg, transport.as_ref(), api_url, sheet_id, board_id, channel.as_deref())
    }

    Command::Gchat { show_members, api_url } => {
      let token = credentials::require(credentials::GOOGLE_CHAT_TOKEN)?;
      let transport = build_transport(vec![header("Authorization", format!("Bearer {token}"))], vec![])?;
      gchat::collect(cfg, transport.as_ref(), api_url, *show_members)
    }

    Command::Rocketchat { server, description } => {
      let token = credentials::require(credentials::ROCKETCHAT_TOKEN)?;
      let user = credentials::require(credentials::ROCKETCHAT_USER)?;
      let transport = build_transport(vec![header("X-Auth-Token", token), header("X-User-Id", user)], vec![])?;
      rocketchat::collect(cfg, transport.as_ref(), server, description)
    }
  }
}

/// Filter snapshot shared by every adapter; `approval_override` is the platform's call.
pub(crate) fn filter_context(cfg: &EffectiveConfig, approval_override: bool) -> FilterContext {
  FilterContext {
    since: cfg.window.since_instant(),
    only_actor: cfg.only_actor.clone(),
    labels: cfg.labels.clone(),
    approval_override,
  }
}

pub(crate) fn aggregator(cfg: &EffectiveConfig) -> Aggregator {
  Aggregator::new(cfg.group_by, cfg.max_points)
}

/// `https://host/a/b/c` => ["a", "b", "c"]; empty segments dropped.
pub(crate) fn url_segments(raw: &str) -> Vec<String> {
  match url::Url::parse(raw) {
    Ok(u) => u
      .path_segments()
      .map(|s| s.filter(|p| !p.is_empty()).map(str::to_string).collect())
      .unwrap_or_default(),
    Err(_) => Vec::new(),
  }
}

pub(crate) fn host_of(raw: &str) -> String {
  url::Url::parse(raw)
    .ok()
    .and_then(|u| u.host_str().map(str::to_string))
    .unwrap_or_else(|| raw.to_string())
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn url_helpers() {
    assert_eq!(
      url_segments("https://gitlab.example.com/acme/sub/webapp/-/merge_requests/5"),
      vec!["acme", "sub", "webapp", "-", "merge_requests", "5"]
    );
    assert!(url_segments("not a url").is_empty());
    assert_eq!(host_of("https://chat.googleapis.com/v1"), "chat.googleapis.com");
  }
}
