// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Render the final aggregates as point-ledger lines or a human-readable summary
// role: rendering/report
// inputs: Report (platform, subject, Aggregator, rosters), OutputMode, points grouping override
// outputs: String written by main only after the whole run succeeds
// invariants:
// - Ledger line grammar: GROUPING/<PREFIX><id>/<actor>/<points> [k=v, k=v]
// - Metadata keeps the adapter's trace order; separator is ", "
// - Dimensions in lane order; entries by display name then key; credits in fold order
// - Zero results never fail: an explanatory line is printed instead
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::HashSet;
use std::fmt::Write as _;

use chrono::NaiveDate;

use crate::aggregate::{AggregateEntry, Aggregator, Credit, Dimension, GroupBy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
  GitHub,
  GitLab,
  Trello,
  Smartsheet,
  GoogleChat,
  RocketChat,
}

impl Platform {
  pub fn prefix(self) -> &'static str {
    match self {
      Platform::GitHub => "GH",
      Platform::GitLab => "GL",
      Platform::Trello => "TR",
      Platform::Smartsheet => "SS",
      Platform::GoogleChat => "GC",
      Platform::RocketChat => "RC",
    }
  }

  /// Header wording, e.g. "GitLab Group".
  pub fn subject_kind(self) -> &'static str {
    match self {
      Platform::GitHub => "GitHub Organization",
      Platform::GitLab => "GitLab Group",
      Platform::Trello => "Trello Team",
      Platform::Smartsheet => "Smartsheet Report",
      Platform::GoogleChat => "Google Chat Workspace",
      Platform::RocketChat => "Rocket.Chat Server",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
  #[default]
  Ledger,
  Human,
}

/// Head count of a room/channel, shown in human mode only.
#[derive(Debug, Clone)]
pub struct Roster {
  pub name: String,
  pub noun: &'static str,
  pub count: usize,
  /// Listed under the room when non-empty.
  pub members: Vec<String>,
}

#[derive(Debug)]
pub struct Report {
  pub platform: Platform,
  pub subject: String,
  pub aggregator: Aggregator,
  pub rosters: Vec<Roster>,
}

#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
  pub mode: OutputMode,
  /// Replaces the dimension name as the ledger grouping label.
  pub points_grouping: Option<String>,
  pub since: Option<NaiveDate>,
}

impl Report {
  pub fn new(platform: Platform, subject: impl Into<String>, aggregator: Aggregator) -> Self {
    Self {
      platform,
      subject: subject.into(),
      aggregator,
      rosters: Vec::new(),
    }
  }

  pub fn render(&self, opts: &RenderOptions) -> String {
    match opts.mode {
      OutputMode::Ledger => self.render_ledger(opts),
      OutputMode::Human => self.render_human(),
    }
  }

  fn render_ledger(&self, opts: &RenderOptions) -> String {
    let mut out = String::new();

    for dim in self.aggregator.dimensions() {
      for entry in sorted_entries(dim) {
        let grouping = match (&opts.points_grouping, self.aggregator.group_by()) {
          (Some(g), _) => g.as_str(),
          (None, GroupBy::Label) => entry.display.as_str(),
          (None, GroupBy::Actor) => dim.name.as_str(),
        };
        for credit in &entry.credits {
          let _ = writeln!(out, "{}", self.ledger_line(grouping, credit));
        }
      }
    }

    if out.is_empty() {
      match opts.since {
        Some(d) => {
          let _ = writeln!(out, "# No qualifying items found since {}", d.format("%Y-%m-%d"));
        }
        None => out.push_str("# No qualifying items found\n"),
      }
    }

    out
  }

  pub fn ledger_line(&self, grouping: &str, credit: &Credit) -> String {
    let meta = credit
      .item
      .trace()
      .iter()
      .map(|(k, v)| format!("{k}={v}"))
      .collect::<Vec<_>>()
      .join(", ");

    format!(
      "{}/{}{}/{}/{} [{}]",
      grouping,
      self.platform.prefix(),
      credit.item.id(),
      credit.actor.login,
      credit.points,
      meta
    )
  }

  fn render_human(&self) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Statistics for {} '{}' ====", self.platform.subject_kind(), self.subject);

    if !self.rosters.is_empty() {
      let _ = writeln!(out, "\n== Rooms ==\n");
      for roster in &self.rosters {
        let _ = writeln!(out, "- {} - {} {}", roster.name, roster.count, roster.noun);
        for member in &roster.members {
          let _ = writeln!(out, "   {member}");
        }
      }
    }

    if self.aggregator.is_empty() {
      if self.rosters.is_empty() {
        let _ = writeln!(out, "\nNo qualifying items found");
      }
      return out;
    }

    for dim in self.aggregator.dimensions() {
      let _ = writeln!(out, "\n== {} ==\n", dim.name);
      for entry in sorted_entries(dim) {
        let _ = writeln!(out, "{} - {} ({} points)", entry.display, entry.count(), entry.points);
        let mut listed = HashSet::new();
        for credit in entry.credits.iter().filter(|c| listed.insert(c.item.id())) {
          let _ = writeln!(out, "   {} - {}", credit.item.project().name, credit.item.title());
        }
      }
    }

    out
  }
}

fn sorted_entries(dim: &Dimension) -> Vec<&AggregateEntry> {
  let mut entries: Vec<&AggregateEntry> = dim.entries.values().collect();
  entries.sort_by(|a, b| a.display.cmp(&b.display).then_with(|| a.key.cmp(&b.key)));
  entries
}
