// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Error taxonomy shared by fetcher, resolver and platform adapters
// role: errors/types
// outputs: StatsError enum and crate-wide Result alias
// invariants:
// - 4xx and unparsable bodies are Fetch; network failures and 5xx are TransientFetch
// - Every variant is fatal for the run; point annotation problems never reach this type
// errors: Rendered as a single line by main (exit code 1)
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatsError {
  #[error("configuration error: {0}")]
  Configuration(String),

  #[error("request to {url} failed{}: {message}", status_suffix(.status))]
  Fetch {
    url: String,
    status: Option<u16>,
    message: String,
  },

  #[error("transient failure fetching {url}: {message}")]
  TransientFetch { url: String, message: String },

  #[error("unable to locate group '{0}'")]
  GroupNotFound(String),

  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),
}

impl StatsError {
  pub fn config(msg: impl Into<String>) -> Self {
    StatsError::Configuration(msg.into())
  }

  /// True for HTTP 404 responses; adapters use it to turn a missing
  /// group/board into `GroupNotFound` or `None`.
  pub fn is_not_found(&self) -> bool {
    matches!(self, StatsError::Fetch { status: Some(404), .. })
  }

  /// Network errors and 5xx; a wrapper may retry these, the core never does.
  pub fn is_transient(&self) -> bool {
    matches!(self, StatsError::TransientFetch { .. })
  }
}

fn status_suffix(status: &Option<u16>) -> String {
  status.map(|s| format!(" with HTTP {s}")).unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, StatsError>;
