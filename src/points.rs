// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Point value of an item title: last "(N)" annotation, clamped to a maximum
// role: parsing/points
// inputs: Title text; max points
// outputs: u32 point value, never above max
// invariants:
// - No annotation => 1; unparsable annotation (overflow) => 1; never an error
// - Only the LAST parenthesized integer counts
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use once_cell::sync::Lazy;
use regex::Regex;

pub const DEFAULT_POINTS: u32 = 1;
pub const DEFAULT_MAX_POINTS: u32 = 5;

static RE_POINTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\((\d+)\)").unwrap());

/// Points encoded in `title`, e.g. `"Fix bug (3)"` => 3.
pub fn parse_points(title: &str, max: u32) -> u32 {
  let Some(caps) = RE_POINTS.captures_iter(title).last() else {
    return DEFAULT_POINTS;
  };

  match caps[1].parse::<u32>() {
    Ok(n) => n.min(max),
    Err(_) => {
      log::debug!("ignoring malformed point annotation in {title:?}");
      DEFAULT_POINTS
    }
  }
}
