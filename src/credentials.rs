// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Read platform credentials from the environment
// role: config/credentials
// inputs: Process environment; `gh auth token` for GitHub
// outputs: Token strings
// invariants: Blank values count as missing
// errors: Configuration error naming the missing variable
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use crate::error::{Result, StatsError};

pub const GITLAB_TOKEN: &str = "GITLAB_API_TOKEN";
pub const TRELLO_KEY: &str = "TRELLO_API_KEY";
pub const TRELLO_TOKEN: &str = "TRELLO_API_TOKEN";
pub const SMARTSHEET_TOKEN: &str = "SMARTSHEETS_API_TOKEN";
pub const GOOGLE_CHAT_TOKEN: &str = "GOOGLE_CHAT_TOKEN";
pub const ROCKETCHAT_TOKEN: &str = "ROCKETCHAT_AUTH_TOKEN";
pub const ROCKETCHAT_USER: &str = "ROCKETCHAT_USER_ID";

pub fn env_value(name: &str) -> Option<String> {
  std::env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub fn require(name: &str) -> Result<String> {
  env_value(name).ok_or_else(|| StatsError::config(format!("missing required credential {name}")))
}

/// GITHUB_TOKEN, then GH_TOKEN, then whatever `gh auth token` prints.
pub fn get_github_token() -> Option<String> {
  if let Some(t) = env_value("GITHUB_TOKEN") {
    return Some(t);
  }

  if let Some(t) = env_value("GH_TOKEN") {
    return Some(t);
  }

  if let Ok(output) = std::process::Command::new("gh").args(["auth", "token"]).output() {
    if output.status.success() {
      let t = String::from_utf8_lossy(&output.stdout).trim().to_string();

      if !t.is_empty() {
        return Some(t);
      }
    }
  }

  None
}

pub fn require_github_token() -> Result<String> {
  get_github_token().ok_or_else(|| StatsError::config("missing required credential GITHUB_TOKEN (or GH_TOKEN)"))
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;

  #[test]
  #[serial]
  fn github_token_prefers_github_token_then_gh_token() {
    let _env = test_support::with_env(&[("GITHUB_TOKEN", "primary"), ("GH_TOKEN", "secondary")]);
    assert_eq!(get_github_token().as_deref(), Some("primary"));

    let _env = test_support::with_env(&[("GITHUB_TOKEN", "  ")]);
    assert_eq!(get_github_token().as_deref(), Some("secondary"));
  }

  #[test]
  #[serial]
  fn missing_credential_names_the_variable() {
    let _env = test_support::without_env(&[GITLAB_TOKEN]);
    let err = require(GITLAB_TOKEN).unwrap_err();
    assert_eq!(err.to_string(), "configuration error: missing required credential GITLAB_API_TOKEN");
  }
}
