use chrono::{DateTime, NaiveDate, Utc};
use clap::{ArgAction, Parser, Subcommand};

use crate::aggregate::GroupBy;
use crate::error::{Result, StatsError};
use crate::filter::LabelRules;
use crate::membership::ProjectMatcher;
use crate::points::DEFAULT_MAX_POINTS;
use crate::report::OutputMode;
use crate::window::{default_start_date, parse_now_override, parse_start_date, Window};

#[derive(Parser, Debug)]
#[command(
    name = "contrib-stats",
    version,
    about = "Aggregate contribution activity across collaboration platforms into point-ledger lines",
    long_about = None
)]
pub struct Cli {
  /// Start of the window (YYYY-MM-DD); defaults to the most recent March 1st
  #[arg(short = 's', long, global = true)]
  pub start_date: Option<String>,

  /// Only credit this user (login or id)
  #[arg(short = 'u', long, global = true)]
  pub username: Option<String>,

  /// Label allow/deny list, e.g. "bug,docs,wip-" (trailing '-' denies)
  #[arg(short = 'l', long, global = true)]
  pub labels: Option<String>,

  /// Print a grouped summary instead of ledger lines
  #[arg(short = 'r', long, global = true)]
  pub human_readable: bool,

  /// Grouping label used in ledger lines instead of the section name (ie. "Cards Closed")
  #[arg(short = 'g', long, global = true)]
  pub points_grouping: Option<String>,

  /// Cap for "(N)" point annotations in titles
  #[arg(long, global = true, default_value_t = DEFAULT_MAX_POINTS)]
  pub max_points: u32,

  /// Aggregate by label instead of by user
  #[arg(long, global = true)]
  pub group_by_label: bool,

  /// Regex a project/repository name must match (anchored at the start)
  #[arg(short = 'm', long, global = true, default_value = ".+")]
  pub repo_matcher: String,

  /// Regex excluding project/repository names
  #[arg(short = 'x', long, global = true)]
  pub repo_excluder: Option<String>,

  /// Increase log verbosity (-v info, -vv debug)
  #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
  pub verbose: u8,

  /// Emit a troff man page to stdout (internal; for packaging)
  #[arg(long, hide = true)]
  pub gen_man: bool,

  /// Override the "now" instant (hidden; tests only)
  #[arg(long = "now-override", hide = true, global = true)]
  pub now_override: Option<String>,

  #[command(subcommand)]
  pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
  /// Pull requests, reviews and closed issues of a GitHub organization
  Github {
    /// Organization login
    #[arg(short = 'o', long)]
    org: String,

    /// Label marking enhancement pull requests
    #[arg(long, default_value = "enhancement")]
    enhancement_label: String,

    #[arg(long, default_value = "https://api.github.com", hide = true)]
    api_url: String,
  },

  /// Merge requests and closed issues of a GitLab group
  Gitlab {
    /// Group name or full path
    #[arg(long)]
    group: String,

    /// GitLab server URL
    #[arg(long, env = "GITLAB_SERVER", default_value = "https://gitlab.com")]
    server: String,
  },

  /// Done cards of a Trello team
  Trello {
    /// Organization (team) name or id
    #[arg(long)]
    org: String,

    /// List holding finished cards
    #[arg(long, default_value = "Done")]
    list: String,

    /// Cards requested per search page
    #[arg(long, default_value_t = 1000)]
    page_size: usize,

    #[arg(long, default_value = "https://api.trello.com", hide = true)]
    api_url: String,
  },

  /// Approved point rows of a Smartsheet report
  Smartsheet {
    /// Report id
    #[arg(short = 'e', long)]
    sheet_id: String,

    /// Board id linking ledger lines back to the sheet
    #[arg(short = 'b', long)]
    board_id: String,

    /// Regex a row's program name must contain
    #[arg(short = 'c', long)]
    channel: Option<String>,

    #[arg(long, default_value = "https://api.smartsheet.com", hide = true)]
    api_url: String,
  },

  /// Rooms, members and messages of Google Chat
  Gchat {
    /// List members under each room (human-readable mode)
    #[arg(long)]
    show_members: bool,

    #[arg(long, default_value = "https://chat.googleapis.com", hide = true)]
    api_url: String,
  },

  /// Channel head counts of a Rocket.Chat server
  Rocketchat {
    /// Rocket.Chat server host or URL
    #[arg(long)]
    server: String,

    /// Text a channel description must contain
    #[arg(short = 'd', long)]
    description: String,
  },
}

#[derive(Debug, Clone)]
pub struct EffectiveConfig {
  pub command: Command,
  pub window: Window,
  pub only_actor: Option<String>,
  pub labels: LabelRules,
  pub mode: OutputMode,
  pub points_grouping: Option<String>,
  pub max_points: u32,
  pub group_by: GroupBy,
  pub matcher: ProjectMatcher,
}

pub fn normalize(cli: Cli) -> Result<EffectiveConfig> {
  let Some(command) = cli.command else {
    return Err(StatsError::config(
      "a platform subcommand is required (github, gitlab, trello, smartsheet, gchat, rocketchat)",
    ));
  };

  let now: DateTime<Utc> = match cli.now_override.as_deref() {
    Some(raw) => parse_now_override(Some(raw))
      .ok_or_else(|| StatsError::config(format!("invalid --now-override '{raw}'")))?,
    None => Utc::now(),
  };

  let since: NaiveDate = match cli.start_date.as_deref() {
    Some(raw) => parse_start_date(raw)?,
    None => default_start_date(now.date_naive()),
  };

  if cli.max_points == 0 {
    return Err(StatsError::config("--max-points must be at least 1"));
  }

  let matcher = ProjectMatcher::new(&cli.repo_matcher, cli.repo_excluder.as_deref())?;

  if let Command::Smartsheet { channel: Some(c), .. } = &command {
    regex::Regex::new(c).map_err(|e| StatsError::config(format!("invalid --channel pattern '{c}': {e}")))?;
  }

  Ok(EffectiveConfig {
    command,
    window: Window::new(since, now),
    only_actor: cli.username.filter(|u| !u.trim().is_empty()),
    labels: cli.labels.as_deref().map(LabelRules::parse).unwrap_or_default(),
    mode: if cli.human_readable { OutputMode::Human } else { OutputMode::Ledger },
    points_grouping: cli.points_grouping,
    max_points: cli.max_points,
    group_by: if cli.group_by_label { GroupBy::Label } else { GroupBy::Actor },
    matcher,
  })
}

/// Collapse a clap parse error into one line (usage and tips dropped).
pub fn one_line_parse_error(err: &clap::Error) -> String {
  let rendered = err.to_string();
  let head: Vec<&str> = rendered
    .lines()
    .take_while(|l| !l.trim().is_empty())
    .map(str::trim)
    .collect();

  head.join(" ").trim_start_matches("error:").trim().to_string()
}
