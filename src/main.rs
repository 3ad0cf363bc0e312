use std::process::ExitCode;

use anyhow::Result;
use clap::error::ErrorKind;
use clap::Parser;

mod aggregate;
mod cache;
mod cli;
mod credentials;
mod error;
mod ext;
mod filter;
mod http;
mod item;
mod membership;
mod pipeline;
mod platforms;
mod points;
mod report;
mod util;
mod window;

use crate::cli::{normalize, one_line_parse_error, Cli};
use crate::report::RenderOptions;

fn init_logging(verbosity: u8) {
  let level = match verbosity {
    0 => "warn",
    1 => "info",
    2 => "debug",
    _ => "trace",
  };
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() -> ExitCode {
  let cli = match Cli::try_parse() {
    Ok(cli) => cli,
    Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
    Err(e) => {
      eprintln!("error: {}", one_line_parse_error(&e));
      return ExitCode::FAILURE;
    }
  };

  init_logging(cli.verbose);

  // Output is buffered so a failed run prints nothing to stdout.
  match run(cli) {
    Ok(out) => {
      print!("{out}");
      ExitCode::SUCCESS
    }
    Err(e) => {
      eprintln!("error: {e}");
      ExitCode::FAILURE
    }
  }
}

fn run(cli: Cli) -> Result<String> {
  if cli.gen_man {
    return util::render_man_page::<Cli>();
  }

  // Phase 1: normalize CLI
  let cfg = normalize(cli)?;
  log::info!("window starts {} ({} days)", cfg.window.since, cfg.window.days());

  // Phase 2: collect and aggregate
  let report = platforms::collect(&cfg)?;

  // Phase 3: render
  Ok(report.render(&RenderOptions {
    mode: cfg.mode,
    points_grouping: cfg.points_grouping.clone(),
    since: Some(cfg.window.since),
  }))
}
